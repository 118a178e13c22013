//! Shared state and auxiliary handlers.
//!
//! # Endpoints
//!
//! - `GET /health` - Health check endpoint
//! - anything unmatched - normalized 404

use std::sync::Arc;

use axum::{
    extract::OriginalUri,
    http::{Method, StatusCode},
    Json,
};
use serde::Serialize;

use crate::error::PipelineError;
use crate::graphql::OperationExecutor;
use crate::storage::ContentStore;

// =============================================================================
// Application State
// =============================================================================

/// Shared application state.
///
/// This is passed to all handlers via Axum's State extractor.
#[derive(Clone)]
pub struct AppState {
    /// Where uploads are persisted
    pub store: Arc<dyn ContentStore>,

    /// Runs GraphQL operations
    pub executor: Arc<dyn OperationExecutor>,

    /// Status reported when an operation needs an authenticated caller
    pub unauthenticated_status: StatusCode,

    /// Whether `GET /graphql` without a query serves GraphiQL
    pub graphiql: bool,
}

impl AppState {
    /// Create state with a 500 for unauthenticated callers and GraphiQL on.
    pub fn new(store: Arc<dyn ContentStore>, executor: Arc<dyn OperationExecutor>) -> Self {
        Self {
            store,
            executor,
            unauthenticated_status: StatusCode::INTERNAL_SERVER_ERROR,
            graphiql: true,
        }
    }

    /// Set the status reported for unauthenticated callers.
    pub fn with_unauthenticated_status(mut self, status: StatusCode) -> Self {
        self.unauthenticated_status = status;
        self
    }

    /// Enable or disable GraphiQL.
    pub fn with_graphiql(mut self, enabled: bool) -> Self {
        self.graphiql = enabled;
        self
    }
}

// =============================================================================
// Response Types
// =============================================================================

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: String,

    /// Service version
    pub version: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// Handle health check requests.
///
/// # Endpoint
///
/// `GET /health`
///
/// # Response
///
/// `200 OK` with JSON body:
/// ```json
/// {
///   "status": "healthy",
///   "version": "0.1.0"
/// }
/// ```
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Fallback for unmatched routes and missing static files.
pub async fn not_found_handler(OriginalUri(uri): OriginalUri) -> PipelineError {
    PipelineError::NotFound(uri.path().to_string())
}

/// Fallback for known routes hit with an unsupported method.
pub async fn method_not_allowed_handler(method: Method) -> PipelineError {
    PipelineError::MethodNotAllowed(format!("Method {} is not allowed here", method))
}

// =============================================================================
// Tests
// =============================================================================
