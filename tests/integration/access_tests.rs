//! Access policy integration tests.
//!
//! Tests verify:
//! - Preflight requests are answered with an empty 200 on any path
//! - Access headers are present on successes, errors and panics

use axum::body::Body;
use axum::http::{header, Method, Request, Response, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use feed_gateway::storage::LocalContentStore;
use feed_gateway::create_router;

use super::test_utils::{
    body_bytes, body_json, graphql_request, test_router_config, upload_request, MultipartBody,
    PanickingExecutor, TestApp,
};

fn assert_access_headers(response: &Response<Body>) {
    let headers = response.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_METHODS],
        "GET, POST, PUT, PATCH, DELETE"
    );
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_HEADERS],
        "Content-Type, Authorization"
    );
}

// =============================================================================
// Preflight
// =============================================================================

#[tokio::test]
async fn test_preflight_on_any_path() {
    let app = TestApp::new().await;

    for path in ["/post-image", "/graphql", "/does/not/exist", "/images/x.png"] {
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri(path)
            .body(Body::empty())
            .unwrap();

        let response = app.send(request).await;
        assert_eq!(response.status(), StatusCode::OK, "path {}", path);
        assert_access_headers(&response);
        assert!(body_bytes(response).await.is_empty());
    }
}

#[tokio::test]
async fn test_preflight_skips_authentication() {
    let app = TestApp::new().await;

    // Would be unauthenticated as a PUT
    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/post-image")
        .header(header::AUTHORIZATION, "Bearer garbage")
        .body(Body::empty())
        .unwrap();

    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(app.stored_files().is_empty());
}

// =============================================================================
// Headers on Every Response
// =============================================================================

#[tokio::test]
async fn test_headers_on_success() {
    let app = TestApp::new().await;

    let response = app
        .send(graphql_request(json!({ "query": "{ hello }" }), None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_access_headers(&response);
}

#[tokio::test]
async fn test_headers_on_error() {
    let app = TestApp::new().await;

    let body = MultipartBody::new().file("image", "a.png", "image/png", b"png");
    let response = app.send(upload_request(body, None)).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_access_headers(&response);

    let request = Request::builder()
        .uri("/nowhere")
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_access_headers(&response);
}

#[tokio::test]
async fn test_headers_on_panic() {
    let dir = tempfile::tempdir().unwrap();
    let store = LocalContentStore::new(dir.path()).await.unwrap();
    let router = create_router(store, PanickingExecutor, test_router_config());

    let response = router
        .oneshot(graphql_request(json!({ "query": "{ hello }" }), None))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_access_headers(&response);
    assert_eq!(
        body_json(response).await,
        json!({ "message": "An error occurred." })
    );
}
