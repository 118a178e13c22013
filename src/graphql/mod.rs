//! GraphQL execution seam.
//!
//! The schema and its resolvers are an external collaborator: the pipeline
//! only hands a parsed request (plus the caller's [`AuthOutcome`]) to an
//! [`OperationExecutor`] and shapes whatever comes back.
//!
//! Resolvers that want their failures reported with an HTTP status and a
//! diagnostic payload raise a [`ResolverFault`]. [`format_error`] is the
//! adaptation applied to every error of a response:
//!
//! ```text
//! ServerError ── source is ResolverFault? ──no──▶ passed through unchanged
//!                         │
//!                        yes
//!                         ▼
//!        {message, status: code or 500, data}
//! ```
//!
//! [`AuthOutcome`]: crate::server::auth::AuthOutcome

mod schema;

use std::fmt;

use async_graphql::{
    ObjectType, PathSegment, Request, Response, Schema, ServerError, SubscriptionType,
};
use async_trait::async_trait;
use axum::http::StatusCode;
use serde::Serialize;
use serde_json::Value;

use crate::error::NormalizedError;

pub use schema::{build_schema, BundledSchema, MutationRoot, QueryRoot};

// =============================================================================
// Executor Trait
// =============================================================================

/// Trait for the unit that executes GraphQL operations.
///
/// Implemented for every `async_graphql::Schema`, so any schema built by the
/// resolver crate can be plugged into the router as is.
#[async_trait]
pub trait OperationExecutor: Send + Sync {
    /// Execute one operation.
    async fn execute(&self, request: Request) -> Response;
}

#[async_trait]
impl<Query, Mutation, Subscription> OperationExecutor for Schema<Query, Mutation, Subscription>
where
    Query: ObjectType + 'static,
    Mutation: ObjectType + 'static,
    Subscription: SubscriptionType + 'static,
{
    async fn execute(&self, request: Request) -> Response {
        Schema::execute(self, request).await
    }
}

// =============================================================================
// Resolver Fault
// =============================================================================

/// Domain failure raised by resolver logic.
///
/// This is the cause contract the error adaptation relies on: `code`
/// becomes the reported status and `data` the diagnostic payload.
///
/// ```
/// use feed_gateway::graphql::ResolverFault;
/// use serde_json::json;
///
/// let err = ResolverFault::new("Invalid input.")
///     .with_code(422)
///     .with_data(json!([{ "field": "title" }]))
///     .into_error();
/// assert_eq!(err.message, "Invalid input.");
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ResolverFault {
    /// Message shown to the client
    pub message: String,

    /// HTTP-style status code (500 when absent)
    pub code: Option<u16>,

    /// Diagnostic payload
    pub data: Option<Value>,
}

impl ResolverFault {
    /// Create a fault with only a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
            data: None,
        }
    }

    /// Set the status code.
    pub fn with_code(mut self, code: u16) -> Self {
        self.code = Some(code);
        self
    }

    /// Attach a diagnostic payload.
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Convert into a resolver error that keeps this fault as its source.
    pub fn into_error(self) -> async_graphql::Error {
        async_graphql::Error::new_with_source(self)
    }
}

impl fmt::Display for ResolverFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

// =============================================================================
// Error Adaptation
// =============================================================================

/// An entry of the `errors` array of a GraphQL response.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum FormattedError {
    /// Error without a resolver fault, in standard GraphQL shape
    Graphql(ServerError),

    /// Error adapted from a resolver fault
    Normalized(NormalizedError),
}

/// Adapt one execution error.
///
/// Errors without a [`ResolverFault`] source pass through unchanged; the
/// others become a [`NormalizedError`] built from the fault's `data`, the
/// error message (or the generic fallback) and the fault's `code` (or 500).
pub fn format_error(err: ServerError) -> FormattedError {
    match err.source::<ResolverFault>() {
        None => FormattedError::Graphql(err),
        Some(fault) => FormattedError::Normalized(NormalizedError::new(
            fault.code,
            Some(err.message.clone()),
            fault.data.clone(),
        )),
    }
}

/// JSON body of a GraphQL HTTP response.
#[derive(Debug, Serialize)]
pub struct GraphqlBody {
    pub data: async_graphql::Value,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<FormattedError>,
}

impl GraphqlBody {
    /// Build the body from an execution response, adapting every error.
    pub fn from_response(response: Response) -> Self {
        Self {
            data: response.data,
            errors: response.errors.into_iter().map(format_error).collect(),
        }
    }
}

/// Null out `data` when a root field failed without leaving a value.
///
/// A failed non-null root field has nowhere to propagate its null but the
/// whole result, so the response carries `data: null` and its errors. A
/// root field that failed but is present in `data` (a nullable field set
/// to `null`) leaves the partial data in place.
pub fn propagate_root_failures(mut response: Response) -> Response {
    let async_graphql::Value::Object(fields) = &response.data else {
        return response;
    };

    let root_missing = response.errors.iter().any(|err| match err.path.first() {
        Some(PathSegment::Field(name)) => !fields.keys().any(|key| key.as_str() == name),
        _ => false,
    });

    if root_missing {
        response.data = async_graphql::Value::Null;
    }

    response
}

/// HTTP status for an execution response.
///
/// A response with data is a 200 even when some fields failed. Without
/// data, errors that carry no path never reached execution (syntax or
/// validation failures) and yield 400; anything else is a 500.
pub fn response_status(response: &Response) -> StatusCode {
    if response.errors.is_empty() || response.data != async_graphql::Value::Null {
        StatusCode::OK
    } else if response.errors.iter().all(|e| e.path.is_empty()) {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

// =============================================================================
// Tests
// =============================================================================
