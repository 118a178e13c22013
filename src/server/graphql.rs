//! GraphQL path of the operation dispatcher.
//!
//! # Endpoints
//!
//! - `POST /graphql` - Execute a GraphQL request body
//! - `GET /graphql` - Execute from the query string, or serve GraphiQL
//!
//! Both methods decode through [`GraphQLRequest`]; the response is shaped
//! here so every error goes through [`format_error`](crate::graphql::format_error)
//! and the status follows [`response_status`].

use async_graphql::http::GraphiQLSource;
use async_graphql::parser::{parse_query, types::DocumentOperations, types::OperationType};
use async_graphql::ParseRequestError;
use async_graphql_axum::{rejection::GraphQLRejection, GraphQLRequest};
use axum::{
    extract::State,
    http::{StatusCode, Uri},
    response::{Html, IntoResponse, Response},
    Json,
};
use tracing::debug;

use crate::error::PipelineError;
use crate::graphql::{propagate_root_failures, response_status, GraphqlBody};

use super::auth::AuthOutcome;
use super::handlers::AppState;

/// Path the GraphiQL page sends its operations to.
pub const GRAPHQL_ENDPOINT: &str = "/graphql";

/// Message for a GET request carrying a mutation.
pub const GET_MUTATION_MESSAGE: &str = "Can only perform a mutation operation from a POST request.";

/// Message for a GET request without a query when GraphiQL is disabled.
pub const MISSING_QUERY_MESSAGE: &str = "Must provide query string.";

/// Whether the operation that would run is a mutation.
///
/// Documents that fail to parse, or where the operation cannot be
/// selected, report `false`; execution produces the proper error for them.
pub fn selects_mutation(query: &str, operation_name: Option<&str>) -> bool {
    let Ok(document) = parse_query(query) else {
        return false;
    };

    let ty = match (&document.operations, operation_name) {
        (DocumentOperations::Single(op), _) => Some(op.node.ty),
        (DocumentOperations::Multiple(ops), Some(name)) => ops
            .iter()
            .find(|(op_name, _)| op_name.as_str() == name)
            .map(|(_, op)| op.node.ty),
        (DocumentOperations::Multiple(_), None) => None,
    };

    ty == Some(OperationType::Mutation)
}

/// Map a request that could not be decoded into a pipeline error.
pub fn malformed_request(rejection: GraphQLRejection) -> PipelineError {
    match rejection.0 {
        ParseRequestError::PayloadTooLarge => PipelineError::Body {
            status: StatusCode::PAYLOAD_TOO_LARGE,
            message: "GraphQL request is too large".to_string(),
        },
        err => PipelineError::BadRequest(format!("Malformed GraphQL request: {}", err)),
    }
}

/// Run one request against the executor with the caller's outcome attached.
async fn execute(state: &AppState, request: async_graphql::Request, auth: AuthOutcome) -> Response {
    let response = propagate_root_failures(state.executor.execute(request.data(auth)).await);
    let status = response_status(&response);

    if !response.errors.is_empty() {
        debug!(
            status = status.as_u16(),
            errors = response.errors.len(),
            "GraphQL operation completed with errors"
        );
    }

    (status, Json(GraphqlBody::from_response(response))).into_response()
}

/// Handle GraphQL requests sent as a body.
///
/// # Endpoint
///
/// `POST /graphql`
///
/// # Request
///
/// ```json
/// { "query": "{ hello }", "operationName": null, "variables": {} }
/// ```
///
/// # Response
///
/// `{"data": ..., "errors": [...]}` with the status chosen by
/// [`response_status`].
///
/// # Errors
///
/// - `400 Bad Request`: body is not a GraphQL request
pub async fn graphql_post_handler(
    State(state): State<AppState>,
    auth: AuthOutcome,
    request: Result<GraphQLRequest, GraphQLRejection>,
) -> Result<Response, PipelineError> {
    let request = request.map_err(malformed_request)?.into_inner();
    Ok(execute(&state, request, auth).await)
}

/// Handle GraphQL requests sent as query parameters.
///
/// # Endpoint
///
/// `GET /graphql?query=...&operationName=...&variables=...`
///
/// Without `query` the GraphiQL page is served when enabled.
///
/// # Errors
///
/// - `400 Bad Request`: no query (GraphiQL disabled) or invalid variables
/// - `405 Method Not Allowed`: the selected operation is a mutation
pub async fn graphql_get_handler(
    State(state): State<AppState>,
    auth: AuthOutcome,
    uri: Uri,
    request: Result<GraphQLRequest, GraphQLRejection>,
) -> Result<Response, PipelineError> {
    let request = match request {
        Ok(request) => request.into_inner(),
        // Bare `GET /graphql`
        Err(_) if uri.query().map_or(true, str::is_empty) => async_graphql::Request::new(""),
        Err(rejection) => return Err(malformed_request(rejection)),
    };

    if request.query.trim().is_empty() {
        if state.graphiql {
            let page = GraphiQLSource::build().endpoint(GRAPHQL_ENDPOINT).finish();
            return Ok(Html(page).into_response());
        }
        return Err(PipelineError::BadRequest(MISSING_QUERY_MESSAGE.to_string()));
    }

    if selects_mutation(&request.query, request.operation_name.as_deref()) {
        return Err(PipelineError::MethodNotAllowed(GET_MUTATION_MESSAGE.to_string()));
    }

    Ok(execute(&state, request, auth).await)
}

// =============================================================================
// Tests
// =============================================================================
