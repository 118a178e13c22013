//! Error taxonomy and the single normalization boundary.
//!
//! Every failure produced anywhere in the request pipeline is a
//! [`PipelineError`]. Converting it into a response goes through
//! [`NormalizedError`], which is the only shape an error body ever takes:
//!
//! ```text
//! HTTP <status>
//! {"message": "...", "data": ...}
//! ```

use std::any::Any;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, error, warn};

/// Message used when a failure carries no message of its own.
pub const DEFAULT_ERROR_MESSAGE: &str = "An error occurred.";

/// Message reported when an operation requires an authenticated caller.
pub const UNAUTHENTICATED_MESSAGE: &str = "Not authenticated!";

// =============================================================================
// Storage Errors
// =============================================================================

/// Errors raised by a content store.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// The referenced asset does not exist
    #[error("Asset not found: {0}")]
    NotFound(String),

    /// The asset path is malformed or escapes the store root
    #[error("Invalid asset path: {0}")]
    InvalidPath(String),

    /// Underlying filesystem failure
    #[error("Storage I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        StorageError::Io(err.to_string())
    }
}

// =============================================================================
// Pipeline Errors
// =============================================================================

/// Errors surfaced by any stage of the request pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The operation requires an authenticated caller and there is none
    #[error("Not authenticated!")]
    Unauthenticated {
        /// Status reported for this deployment (500 unless configured)
        status: StatusCode,
    },

    /// The request could not be interpreted
    #[error("{0}")]
    BadRequest(String),

    /// The request method is not usable for this operation
    #[error("{0}")]
    MethodNotAllowed(String),

    /// A file arrived under a field name other than the upload field
    #[error("Unexpected field")]
    UnexpectedField { field: String },

    /// The request body could not be read
    #[error("{message}")]
    Body { status: StatusCode, message: String },

    /// The content store failed
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// No route matched
    #[error("Not found: {0}")]
    NotFound(String),
}

impl PipelineError {
    /// Unauthenticated error with the default 500 status.
    pub fn unauthenticated() -> Self {
        PipelineError::Unauthenticated {
            status: StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short identifier used in log records.
    pub fn error_type(&self) -> &'static str {
        match self {
            PipelineError::Unauthenticated { .. } => "unauthenticated",
            PipelineError::BadRequest(_) => "bad_request",
            PipelineError::MethodNotAllowed(_) => "method_not_allowed",
            PipelineError::UnexpectedField { .. } => "unexpected_field",
            PipelineError::Body { .. } => "body_error",
            PipelineError::Storage(_) => "storage_error",
            PipelineError::NotFound(_) => "not_found",
        }
    }
}

// =============================================================================
// Normalized Error
// =============================================================================

/// The uniform `{status, message, data}` shape every failure becomes.
///
/// When written as an HTTP error body only `message` and `data` are
/// serialized; `status` travels as the response status. Inside a GraphQL
/// `errors` array all three fields are serialized.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedError {
    /// HTTP status code
    pub status: u16,

    /// Human-readable message
    pub message: String,

    /// Optional diagnostic payload
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// Body written for an error response.
#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    message: &'a str,

    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<&'a Value>,
}

impl NormalizedError {
    /// Build a normalized error, applying the defaults for absent parts.
    ///
    /// A missing status becomes 500 and a missing or empty message becomes
    /// [`DEFAULT_ERROR_MESSAGE`].
    pub fn new(status: Option<u16>, message: Option<String>, data: Option<Value>) -> Self {
        let message = message
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| DEFAULT_ERROR_MESSAGE.to_string());

        Self {
            status: status.unwrap_or(500),
            message,
            data,
        }
    }

    /// The status as an HTTP status code, falling back to 500 when out of range.
    pub fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl From<&PipelineError> for NormalizedError {
    fn from(err: &PipelineError) -> Self {
        let (status, message, data) = match err {
            PipelineError::Unauthenticated { status } => {
                (*status, UNAUTHENTICATED_MESSAGE.to_string(), None)
            }
            PipelineError::BadRequest(message) => (StatusCode::BAD_REQUEST, message.clone(), None),
            PipelineError::MethodNotAllowed(message) => {
                (StatusCode::METHOD_NOT_ALLOWED, message.clone(), None)
            }
            PipelineError::UnexpectedField { field } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                err.to_string(),
                Some(json!({ "field": field })),
            ),
            PipelineError::Body { status, message } => (*status, message.clone(), None),
            PipelineError::Storage(storage_err) => match storage_err {
                StorageError::NotFound(_) => (StatusCode::NOT_FOUND, storage_err.to_string(), None),
                StorageError::InvalidPath(_) => {
                    (StatusCode::BAD_REQUEST, storage_err.to_string(), None)
                }
                // Filesystem details stay in the logs
                StorageError::Io(_) => (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to store file".to_string(),
                    None,
                ),
            },
            PipelineError::NotFound(_) => (StatusCode::NOT_FOUND, err.to_string(), None),
        };

        NormalizedError::new(Some(status.as_u16()), Some(message), data)
    }
}

impl IntoResponse for NormalizedError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            message: &self.message,
            data: self.data.as_ref(),
        };
        (self.status_code(), Json(body)).into_response()
    }
}

/// Convert PipelineError to HTTP response.
///
/// 5xx errors are logged at ERROR level, authentication failures at DEBUG
/// (they are routine), other client errors at WARN.
impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let normalized = NormalizedError::from(&self);
        let status = normalized.status_code();
        let error_type = self.error_type();

        if matches!(self, PipelineError::Unauthenticated { .. }) {
            debug!(
                error_type = error_type,
                status = status.as_u16(),
                "Rejected unauthenticated request"
            );
        } else if status.is_server_error() {
            error!(
                error_type = error_type,
                status = status.as_u16(),
                "Server error: {}",
                self
            );
        } else {
            warn!(
                error_type = error_type,
                status = status.as_u16(),
                "Client error: {}",
                self
            );
        }

        normalized.into_response()
    }
}

/// Translate a panic caught by the pipeline into a normalized 500.
///
/// The panic payload is logged but never returned to the caller.
pub fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    };

    error!(error_type = "unhandled", status = 500, "Handler panicked: {}", detail);

    NormalizedError::new(None, None, None).into_response()
}

// =============================================================================
// Tests
// =============================================================================
