//! Router configuration for the feed gateway.
//!
//! This module composes the request pipeline. Layers run outermost first:
//!
//! ```text
//! TraceLayer (optional)
//!   └─ access headers on every response
//!        └─ panic recovery → normalized 500
//!             └─ preflight (OPTIONS → 200, empty)
//!                  └─ authentication gate (never rejects)
//!                       └─ routes
//! ```
//!
//! # Route Structure
//!
//! ```text
//! PUT  /post-image     - Upload intake (authenticated)
//! POST /graphql        - GraphQL execution
//! GET  /graphql        - GraphQL over query string, or GraphiQL
//! GET  /images/{file}  - Stored uploads
//! GET  /health         - Health check
//! ```
//!
//! # Example
//!
//! ```ignore
//! use feed_gateway::graphql::build_schema;
//! use feed_gateway::server::{create_router, RouterConfig};
//! use feed_gateway::storage::LocalContentStore;
//!
//! let store = LocalContentStore::new("images").await?;
//! let config = RouterConfig::new("my-secret-key").with_max_upload_bytes(5 * 1024 * 1024);
//!
//! let router = create_router(store, build_schema(), config);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, router).await?;
//! ```

use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    handler::HandlerWithoutStateExt,
    http::StatusCode,
    middleware,
    routing::{get, put},
    Router,
};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use super::access::{expose_headers, preflight};
use super::auth::{auth_gate, HmacTokenAuth, SharedVerifier};
use super::graphql::{graphql_get_handler, graphql_post_handler};
use super::handlers::{
    health_handler, method_not_allowed_handler, not_found_handler, AppState,
};
use super::upload::upload_handler;
use crate::error::panic_response;
use crate::graphql::OperationExecutor;
use crate::storage::ContentStore;

/// Default upload body limit (10 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

// =============================================================================
// Router Configuration
// =============================================================================

/// Configuration for the HTTP router.
#[derive(Clone)]
pub struct RouterConfig {
    /// Secret key for bearer token verification
    pub auth_secret: String,

    /// Verifier used instead of the HMAC one built from `auth_secret`
    pub verifier: Option<SharedVerifier>,

    /// Status reported when an operation needs an authenticated caller
    pub unauthenticated_status: StatusCode,

    /// Body limit for uploads, in bytes
    pub max_upload_bytes: usize,

    /// Whether `GET /graphql` without a query serves GraphiQL
    pub graphiql: bool,

    /// Whether to enable request tracing
    pub enable_tracing: bool,
}

impl RouterConfig {
    /// Create a new router configuration with the given auth secret.
    ///
    /// By default:
    /// - Unauthenticated callers get a 500
    /// - Uploads are limited to 10 MiB
    /// - GraphiQL is served
    /// - Tracing is enabled
    pub fn new(auth_secret: impl Into<String>) -> Self {
        Self {
            auth_secret: auth_secret.into(),
            verifier: None,
            unauthenticated_status: StatusCode::INTERNAL_SERVER_ERROR,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            graphiql: true,
            enable_tracing: true,
        }
    }

    /// Use a custom token verifier.
    pub fn with_verifier(mut self, verifier: SharedVerifier) -> Self {
        self.verifier = Some(verifier);
        self
    }

    /// Set the status reported for unauthenticated callers.
    pub fn with_unauthenticated_status(mut self, status: StatusCode) -> Self {
        self.unauthenticated_status = status;
        self
    }

    /// Set the upload body limit in bytes.
    pub fn with_max_upload_bytes(mut self, bytes: usize) -> Self {
        self.max_upload_bytes = bytes;
        self
    }

    /// Enable or disable GraphiQL.
    pub fn with_graphiql(mut self, enabled: bool) -> Self {
        self.graphiql = enabled;
        self
    }

    /// Enable or disable request tracing.
    pub fn with_tracing(mut self, enabled: bool) -> Self {
        self.enable_tracing = enabled;
        self
    }

    fn build_verifier(&self) -> SharedVerifier {
        match &self.verifier {
            Some(verifier) => Arc::clone(verifier),
            None => Arc::new(HmacTokenAuth::new(&self.auth_secret)),
        }
    }
}

// =============================================================================
// Router Builder
// =============================================================================

/// Create the main application router.
///
/// # Arguments
///
/// * `store` - Where uploads are persisted; a store with a local root also
///   has its files served under `/images`
/// * `executor` - Runs GraphQL operations
/// * `config` - Router configuration
///
/// # Returns
///
/// A configured Axum router ready to be served.
pub fn create_router<C, E>(store: C, executor: E, config: RouterConfig) -> Router
where
    C: ContentStore + 'static,
    E: OperationExecutor + 'static,
{
    let images_root = store.local_root().map(Path::to_path_buf);

    let app_state = AppState::new(Arc::new(store), Arc::new(executor))
        .with_unauthenticated_status(config.unauthenticated_status)
        .with_graphiql(config.graphiql);

    let verifier = config.build_verifier();

    let mut router = Router::new()
        .route(
            "/post-image",
            put(upload_handler)
                .layer(DefaultBodyLimit::max(config.max_upload_bytes))
                .fallback(method_not_allowed_handler),
        )
        .route(
            "/graphql",
            get(graphql_get_handler)
                .post(graphql_post_handler)
                .fallback(method_not_allowed_handler),
        )
        .route("/health", get(health_handler));

    if let Some(root) = images_root {
        let images = ServeDir::new(root)
            .call_fallback_on_method_not_allowed(true)
            .not_found_service(not_found_handler.into_service());
        router = router.nest_service("/images", images);
    }

    let router = router
        .fallback(not_found_handler)
        .with_state(app_state)
        .layer(middleware::from_fn_with_state(verifier, auth_gate))
        .layer(middleware::from_fn(preflight))
        .layer(CatchPanicLayer::custom(panic_response));

    let router = expose_headers(router);

    // Add tracing if enabled
    if config.enable_tracing {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    }
}

// =============================================================================
// Tests
// =============================================================================
