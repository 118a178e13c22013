//! # Feed Gateway
//!
//! The HTTP front of a social-feed backend: image uploads and a GraphQL
//! endpoint behind one request pipeline.
//!
//! Every request passes through the same stages:
//!
//! ```text
//! access policy ─▶ authentication gate ─▶ dispatcher ─┬─▶ PUT /post-image (upload intake)
//!                                                     └─▶ POST|GET /graphql
//!                         any failure ─▶ error normalizer ─▶ {message, data} + status
//! ```
//!
//! ## Features
//!
//! - **Permissive CORS**: fixed access headers on every response, preflights answered directly
//! - **Non-blocking authentication**: bearer tokens resolve to an outcome, never a rejection
//! - **Image uploads**: PNG/JPEG only, timestamped collision-free names, optional replacement
//! - **GraphQL**: pluggable executor, resolver faults mapped to status codes
//! - **Uniform errors**: one JSON shape for every failure, panics included
//!
//! ## Architecture
//!
//! - [`server`] - Axum pipeline, handlers and routes
//! - [`graphql`] - Executor seam, error adaptation and a bundled schema
//! - [`storage`] - Content store seam and the local-directory store
//! - [`error`] - Error taxonomy and normalization
//! - [`config`] - CLI and configuration types
//!
//! ## Example
//!
//! ```rust,no_run
//! use feed_gateway::{build_schema, create_router, LocalContentStore, RouterConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = LocalContentStore::new("images").await.unwrap();
//!     let router = create_router(store, build_schema(), RouterConfig::new("secret"));
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await.unwrap();
//!     axum::serve(listener, router).await.unwrap();
//! }
//! ```

pub mod config;
pub mod error;
pub mod graphql;
pub mod server;
pub mod storage;

// Re-export commonly used types
pub use config::{CheckConfig, Cli, Command, ServeConfig, SignConfig, SignOutputFormat};
pub use error::{
    panic_response, NormalizedError, PipelineError, StorageError, DEFAULT_ERROR_MESSAGE,
    UNAUTHENTICATED_MESSAGE,
};
pub use graphql::{
    build_schema, format_error, propagate_root_failures, response_status, BundledSchema,
    FormattedError, GraphqlBody, OperationExecutor, ResolverFault,
};
pub use server::{
    auth_gate, create_router, AppState, AuthError, AuthOutcome, HmacTokenAuth, Identity,
    RouterConfig, SharedVerifier, TokenVerifier, UploadResponse, UploadedFile,
};
pub use storage::{ContentStore, LocalContentStore, StoredAsset};
