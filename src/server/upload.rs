//! Upload intake for `PUT /post-image`.
//!
//! The handler reads a multipart body with a single file field (`image`)
//! and an optional text field (`oldPath`). Steps, in order:
//!
//! 1. Anonymous caller → `Unauthenticated`, before the body is looked at.
//! 2. No accepted file → `200 {"message": "No file provided!"}`.
//! 3. `oldPath` given → best-effort removal of the previous asset.
//! 4. Store the file, answer `201 {"message": "File stored", "filePath": ...}`.
//!
//! Files whose declared type is not PNG or JPEG are dropped silently and
//! the request continues as if no file had been sent.

use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::PipelineError;
use crate::storage::ContentStore;

use super::auth::AuthOutcome;
use super::handlers::AppState;

/// Multipart field carrying the file.
pub const UPLOAD_FIELD: &str = "image";

/// Text field naming an asset to remove once the new one is accepted.
pub const OLD_PATH_FIELD: &str = "oldPath";

/// Declared content types accepted for upload.
pub const ACCEPTED_IMAGE_TYPES: &[&str] = &["image/png", "image/jpg", "image/jpeg"];

/// Message for a request without an accepted file.
pub const NO_FILE_MESSAGE: &str = "No file provided!";

/// Message for a stored upload.
pub const STORED_MESSAGE: &str = "File stored";

// =============================================================================
// Types
// =============================================================================

/// A file field that passed the content-type filter, not yet persisted.
#[derive(Debug, Clone)]
pub struct IncomingFile {
    /// File name as sent by the client
    pub original_name: String,

    /// Declared MIME type (lowercase, parameters stripped)
    pub mime_type: String,

    /// File contents
    pub data: Bytes,
}

/// A persisted upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    /// Generated file name
    pub filename: String,

    /// Client-facing storage path
    pub path: String,

    /// Declared MIME type
    pub mime_type: String,

    /// File name as sent by the client
    pub original_name: String,
}

/// Fields read from an upload request.
#[derive(Debug, Default)]
pub struct UploadForm {
    /// The accepted file, if any
    pub file: Option<IncomingFile>,

    /// Asset to remove after accepting the new file
    pub old_path: Option<String>,
}

/// JSON body of a successful upload response.
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub message: String,

    #[serde(rename = "filePath", skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
}

// =============================================================================
// Intake
// =============================================================================

/// Strip parameters and normalize case: `Image/JPEG; q=1` → `image/jpeg`.
fn normalize_mime(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Whether a declared content type is accepted for upload.
pub fn is_accepted_image(content_type: &str) -> bool {
    ACCEPTED_IMAGE_TYPES.contains(&normalize_mime(content_type).as_str())
}

fn body_error(err: MultipartError) -> PipelineError {
    PipelineError::Body {
        status: err.status(),
        message: err.body_text(),
    }
}

/// Read the upload field and `oldPath` from a multipart body.
///
/// A file under any other field name, or a second file, is an
/// `UnexpectedField` error. Other text fields are ignored.
pub async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, PipelineError> {
    let mut form = UploadForm::default();
    let mut seen_file = false;

    while let Some(field) = multipart.next_field().await.map_err(body_error)? {
        let name = field.name().unwrap_or_default().to_string();

        if let Some(file_name) = field.file_name() {
            if name != UPLOAD_FIELD || seen_file {
                return Err(PipelineError::UnexpectedField { field: name });
            }
            seen_file = true;

            let original_name = file_name.to_string();
            let mime_type = field.content_type().map(normalize_mime).unwrap_or_default();

            if !is_accepted_image(&mime_type) {
                debug!(
                    mime_type = %mime_type,
                    original_name = %original_name,
                    "Dropping file with unaccepted content type"
                );
                continue;
            }

            let data = field.bytes().await.map_err(body_error)?;
            form.file = Some(IncomingFile {
                original_name,
                mime_type,
                data,
            });
        } else if name == OLD_PATH_FIELD {
            let value = field.text().await.map_err(body_error)?;
            let value = value.trim();
            if !value.is_empty() {
                form.old_path = Some(value.to_string());
            }
        }
    }

    Ok(form)
}

/// Remove a previous asset, logging instead of failing.
pub async fn clear_previous(store: &dyn ContentStore, path: &str) {
    if let Err(e) = store.remove(path).await {
        warn!(path = %path, error = %e, "Failed to remove previous file");
    }
}

/// Persist an accepted file.
pub async fn persist(
    store: &dyn ContentStore,
    file: IncomingFile,
) -> Result<UploadedFile, PipelineError> {
    let asset = store.store(&file.original_name, file.data).await?;

    Ok(UploadedFile {
        filename: asset.filename,
        path: asset.path,
        mime_type: file.mime_type,
        original_name: file.original_name,
    })
}

// =============================================================================
// Handler
// =============================================================================

/// Handle image uploads.
///
/// # Endpoint
///
/// `PUT /post-image`
///
/// # Form Fields
///
/// - `image`: the file (PNG or JPEG)
/// - `oldPath`: optional path of a previously stored file to remove
///
/// # Response
///
/// - `201 Created`: `{"message": "File stored", "filePath": "images/..."}`
/// - `200 OK`: `{"message": "No file provided!"}`
///
/// # Errors
///
/// - `500 Internal Server Error` (or the configured status): caller not authenticated
/// - `413 Payload Too Large`: body exceeds the upload limit
/// - `500 Internal Server Error`: unexpected file field or storage failure
pub async fn upload_handler(
    State(state): State<AppState>,
    auth: AuthOutcome,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, PipelineError> {
    if !auth.is_authenticated() {
        return Err(PipelineError::Unauthenticated {
            status: state.unauthenticated_status,
        });
    }

    // A body that is not multipart carries no file
    let form = match multipart {
        Ok(multipart) => read_upload_form(multipart).await?,
        Err(rejection) => {
            debug!(reason = %rejection.body_text(), "Upload request without multipart body");
            UploadForm::default()
        }
    };

    let Some(file) = form.file else {
        let body = UploadResponse {
            message: NO_FILE_MESSAGE.to_string(),
            file_path: None,
        };
        return Ok((StatusCode::OK, Json(body)).into_response());
    };

    if let Some(old_path) = form.old_path {
        clear_previous(state.store.as_ref(), &old_path).await;
    }

    let uploaded = persist(state.store.as_ref(), file).await?;

    let body = UploadResponse {
        message: STORED_MESSAGE.to_string(),
        file_path: Some(uploaded.path),
    };
    Ok((StatusCode::CREATED, Json(body)).into_response())
}

// =============================================================================
// Tests
// =============================================================================
