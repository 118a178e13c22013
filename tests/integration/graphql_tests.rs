//! GraphQL dispatch integration tests.
//!
//! Tests verify:
//! - POST execution with data, variables and the caller's outcome
//! - Resolver faults become normalized entries with their status and data
//! - Status selection for parse failures and failed executions
//! - GET execution, mutation refusal and the GraphiQL page

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use feed_gateway::create_router;
use feed_gateway::storage::LocalContentStore;

use super::test_utils::{
    bearer, body_bytes, body_json, graphql_request, test_router_config, CountingExecutor,
    TestApp,
};

fn get_request(query_string: &str) -> Request<Body> {
    Request::builder()
        .uri(format!("/graphql{}", query_string))
        .body(Body::empty())
        .unwrap()
}

// =============================================================================
// POST
// =============================================================================

#[tokio::test]
async fn test_post_query() {
    let app = TestApp::new().await;

    let response = app
        .send(graphql_request(json!({ "query": "{ hello }" }), None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({ "data": { "hello": "Hello from feed-gateway" } })
    );
}

#[tokio::test]
async fn test_post_mutation_with_variables() {
    let app = TestApp::new().await;

    let request = graphql_request(
        json!({
            "query": "mutation Echo($m: String!) { echo(message: $m) }",
            "operationName": "Echo",
            "variables": { "m": "hi" }
        }),
        Some(&bearer("user-3")),
    );
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["echo"], "user-3: hi");
}

#[tokio::test]
async fn test_resolver_fault_carries_status_and_data() {
    let app = TestApp::new().await;

    let request = graphql_request(
        json!({ "query": "mutation { echo(message: \"\") }" }),
        Some(&bearer("user-3")),
    );
    let response = app.send(request).await;

    // Execution failed without data
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await;
    assert_eq!(body["data"], serde_json::Value::Null);
    assert_eq!(
        body["errors"][0],
        json!({
            "status": 422,
            "message": "Invalid input.",
            "data": [{ "field": "message", "message": "Message is empty." }]
        })
    );
}

#[tokio::test]
async fn test_failed_non_null_field_nulls_data() {
    let app = TestApp::new().await;

    let response = app
        .send(graphql_request(json!({ "query": "{ hello whoami }" }), None))
        .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    let body = body_json(response).await;
    assert_eq!(body["data"], serde_json::Value::Null);
    assert_eq!(body["errors"][0]["status"], 401);
    assert_eq!(body["errors"][0]["message"], "Not authenticated!");
}

#[tokio::test]
async fn test_validation_error_passes_through() {
    let app = TestApp::new().await;

    let response = app
        .send(graphql_request(json!({ "query": "{ nope }" }), None))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    let error = &body["errors"][0];
    assert!(error["message"].as_str().unwrap().contains("nope"));
    // Standard shape, not normalized
    assert!(error.get("status").is_none());
    assert!(error["locations"].is_array());
}

#[tokio::test]
async fn test_syntax_error_is_bad_request() {
    let app = TestApp::new().await;

    let response = app
        .send(graphql_request(json!({ "query": "{ hello" }), None))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body_json(response).await["errors"].is_array());
}

#[tokio::test]
async fn test_malformed_body_is_normalized() {
    let app = TestApp::new().await;

    let request = Request::builder()
        .method("POST")
        .uri("/graphql")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["message"]
        .as_str()
        .unwrap()
        .starts_with("Malformed GraphQL request"));
}

// =============================================================================
// GET
// =============================================================================

#[tokio::test]
async fn test_get_query() {
    let app = TestApp::new().await;

    let response = app.send(get_request("?query=%7B%20hello%20%7D")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["data"]["hello"],
        "Hello from feed-gateway"
    );
}

#[tokio::test]
async fn test_get_invalid_variables() {
    let app = TestApp::new().await;

    let response = app
        .send(get_request("?query=%7B%20hello%20%7D&variables=%7Bbroken"))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_get_mutation_is_refused() {
    let executor = CountingExecutor::default();
    let dir = tempfile::tempdir().unwrap();
    let store = LocalContentStore::new(dir.path()).await.unwrap();
    let router = create_router(store, executor.clone(), test_router_config());

    let response = router
        .oneshot(get_request(
            "?query=mutation%20%7B%20echo(message%3A%20%22x%22)%20%7D",
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(
        body_json(response).await,
        json!({ "message": "Can only perform a mutation operation from a POST request." })
    );
    assert_eq!(executor.calls(), 0);
}

#[tokio::test]
async fn test_get_serves_graphiql() {
    let app = TestApp::new().await;

    let response = app.send(get_request("")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap();
    assert!(content_type.starts_with("text/html"));

    let page = body_bytes(response).await;
    let page = String::from_utf8_lossy(&page);
    assert!(page.contains("graphiql"));
}

#[tokio::test]
async fn test_get_without_query_when_graphiql_disabled() {
    let app = TestApp::with_config(test_router_config().with_graphiql(false)).await;

    let response = app.send(get_request("")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await,
        json!({ "message": "Must provide query string." })
    );
}
