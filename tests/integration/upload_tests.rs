//! Upload intake integration tests.
//!
//! Tests verify:
//! - Authentication is checked before anything is stored
//! - Accepted images are stored under timestamped names and served back
//! - Unaccepted types and missing files yield "No file provided!"
//! - `oldPath` removal is best-effort
//! - Unexpected file fields, body limits and storage failures are normalized

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use feed_gateway::graphql::build_schema;
use feed_gateway::create_router;

use super::test_utils::{
    bearer, body_bytes, body_json, test_router_config, upload_request, FailingStore,
    MultipartBody, TestApp, PNG_BYTES,
};

fn png_upload() -> MultipartBody {
    MultipartBody::new().file("image", "cat.png", "image/png", PNG_BYTES)
}

fn file_path_of(body: &serde_json::Value) -> String {
    body["filePath"].as_str().unwrap().to_string()
}

// =============================================================================
// Authentication
// =============================================================================

#[tokio::test]
async fn test_unauthenticated_upload_is_rejected_and_not_stored() {
    let app = TestApp::new().await;

    let response = app.send(upload_request(png_upload(), None)).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await,
        json!({ "message": "Not authenticated!" })
    );
    assert!(app.stored_files().is_empty());
}

#[tokio::test]
async fn test_unauthenticated_without_file_is_still_rejected() {
    let app = TestApp::new().await;

    let response = app.send(upload_request(MultipartBody::new(), None)).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

// =============================================================================
// Stored Uploads
// =============================================================================

#[tokio::test]
async fn test_png_upload_is_stored() {
    let app = TestApp::new().await;

    let response = app
        .send(upload_request(png_upload(), Some(&bearer("u1"))))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = body_json(response).await;
    assert_eq!(body["message"], "File stored");

    let path = file_path_of(&body);
    let filename = path.strip_prefix("images/").unwrap();
    assert!(filename.ends_with("-cat.png"));
    // <YYYY-MM-DDTHH:MM:SS.mmmZ>-cat.png
    assert_eq!(filename.len(), "2024-01-01T00:00:00.000Z-cat.png".len());
    assert_eq!(&filename[23..25], "Z-");

    assert_eq!(app.stored_files(), vec![filename.to_string()]);
    let written = std::fs::read(app.dir.path().join(filename)).unwrap();
    assert_eq!(written, PNG_BYTES);
}

#[tokio::test]
async fn test_jpeg_variants_are_accepted() {
    let app = TestApp::new().await;

    for mime in ["image/jpeg", "image/jpg", "IMAGE/JPEG"] {
        let body = MultipartBody::new().file("image", "photo.jpg", mime, b"jpeg");
        let response = app.send(upload_request(body, Some(&bearer("u1")))).await;
        assert_eq!(response.status(), StatusCode::CREATED, "mime {}", mime);
    }

    assert_eq!(app.stored_files().len(), 3);
}

#[tokio::test]
async fn test_consecutive_uploads_get_distinct_paths() {
    let app = TestApp::new().await;
    let auth = bearer("u1");

    let first = body_json(app.send(upload_request(png_upload(), Some(&auth))).await).await;
    let second = body_json(app.send(upload_request(png_upload(), Some(&auth))).await).await;

    assert_ne!(file_path_of(&first), file_path_of(&second));
    assert_eq!(app.stored_files().len(), 2);
}

#[tokio::test]
async fn test_client_path_components_are_dropped() {
    let app = TestApp::new().await;

    let body = MultipartBody::new().file("image", "../../etc/evil.png", "image/png", PNG_BYTES);
    let response = app.send(upload_request(body, Some(&bearer("u1")))).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let path = file_path_of(&body_json(response).await);
    assert!(path.ends_with("-evil.png"));
    assert!(!path.contains(".."));
    assert_eq!(app.stored_files().len(), 1);
}

#[tokio::test]
async fn test_stored_file_is_served() {
    let app = TestApp::new().await;

    let response = app
        .send(upload_request(png_upload(), Some(&bearer("u1"))))
        .await;
    let path = file_path_of(&body_json(response).await);

    let request = Request::builder()
        .uri(format!("/{}", path))
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "image/png");
    assert_eq!(&body_bytes(response).await[..], PNG_BYTES);
}

#[tokio::test]
async fn test_missing_image_is_normalized_404() {
    let app = TestApp::new().await;

    let request = Request::builder()
        .uri("/images/nothing-here.png")
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_json(response).await,
        json!({ "message": "Not found: /images/nothing-here.png" })
    );
}

// =============================================================================
// No File
// =============================================================================

#[tokio::test]
async fn test_unaccepted_type_is_dropped() {
    let app = TestApp::new().await;

    let body = MultipartBody::new().file("image", "anim.gif", "image/gif", b"GIF89a");
    let response = app.send(upload_request(body, Some(&bearer("u1")))).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({ "message": "No file provided!" })
    );
    assert!(app.stored_files().is_empty());
}

#[tokio::test]
async fn test_empty_form_means_no_file() {
    let app = TestApp::new().await;

    let body = MultipartBody::new().text("caption", "hello");
    let response = app.send(upload_request(body, Some(&bearer("u1")))).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["message"], "No file provided!");
}

#[tokio::test]
async fn test_non_multipart_body_means_no_file() {
    let app = TestApp::new().await;

    let request = Request::builder()
        .method("PUT")
        .uri("/post-image")
        .header(header::AUTHORIZATION, bearer("u1"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{}"))
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["message"], "No file provided!");
}

// =============================================================================
// Replacing a Previous File
// =============================================================================

#[tokio::test]
async fn test_old_path_is_removed() {
    let app = TestApp::new().await;
    let auth = bearer("u1");

    let first = body_json(app.send(upload_request(png_upload(), Some(&auth))).await).await;
    let old_path = file_path_of(&first);

    let body = png_upload().text("oldPath", &old_path);
    let response = app.send(upload_request(body, Some(&auth))).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let new_path = file_path_of(&body_json(response).await);
    let files = app.stored_files();
    assert_eq!(files.len(), 1);
    assert_eq!(format!("images/{}", files[0]), new_path);
}

#[tokio::test]
async fn test_missing_old_path_does_not_fail_upload() {
    let app = TestApp::new().await;

    let body = png_upload().text("oldPath", "images/never-existed.png");
    let response = app.send(upload_request(body, Some(&bearer("u1")))).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(app.stored_files().len(), 1);
}

#[tokio::test]
async fn test_traversal_old_path_is_ignored() {
    let app = TestApp::new().await;

    let body = png_upload().text("oldPath", "../Cargo.toml");
    let response = app.send(upload_request(body, Some(&bearer("u1")))).await;

    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_old_path_without_file_keeps_previous() {
    let app = TestApp::new().await;
    let auth = bearer("u1");

    let first = body_json(app.send(upload_request(png_upload(), Some(&auth))).await).await;
    let old_path = file_path_of(&first);

    let body = MultipartBody::new().text("oldPath", &old_path);
    let response = app.send(upload_request(body, Some(&auth))).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(app.stored_files().len(), 1);
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_unexpected_file_field() {
    let app = TestApp::new().await;

    let body = MultipartBody::new().file("avatar", "a.png", "image/png", PNG_BYTES);
    let response = app.send(upload_request(body, Some(&bearer("u1")))).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert_eq!(body["message"], "Unexpected field");
    assert_eq!(body["data"]["field"], "avatar");
    assert!(app.stored_files().is_empty());
}

#[tokio::test]
async fn test_second_file_is_unexpected() {
    let app = TestApp::new().await;

    let body = png_upload().file("image", "dog.png", "image/png", PNG_BYTES);
    let response = app.send(upload_request(body, Some(&bearer("u1")))).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(app.stored_files().is_empty());
}

#[tokio::test]
async fn test_body_over_limit() {
    let app = TestApp::with_config(test_router_config().with_max_upload_bytes(64)).await;

    let body = MultipartBody::new().file("image", "big.png", "image/png", &[0u8; 4096]);
    let response = app.send(upload_request(body, Some(&bearer("u1")))).await;

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(body_json(response).await["message"].is_string());
    assert!(app.stored_files().is_empty());
}

#[tokio::test]
async fn test_storage_failure_is_normalized() {
    let router = create_router(FailingStore, build_schema(), test_router_config());

    let response = router
        .oneshot(upload_request(png_upload(), Some(&bearer("u1"))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await,
        json!({ "message": "Failed to store file" })
    );
}

#[tokio::test]
async fn test_wrong_method_is_normalized() {
    let app = TestApp::new().await;

    let request = Request::builder()
        .method("POST")
        .uri("/post-image")
        .body(Body::empty())
        .unwrap();
    let response = app.send(request).await;

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert!(body_json(response).await["message"].is_string());
}
