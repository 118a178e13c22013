//! HTTP server layer for the feed gateway.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                            HTTP Layer                             │
//! │            PUT /post-image     POST|GET /graphql                  │
//! │                                                                   │
//! │  ┌──────────┐  ┌──────────┐  ┌──────────┐  ┌─────────┐  ┌───────┐  │
//! │  │  access  │  │   auth   │  │  upload  │  │ graphql │  │routes │  │
//! │  │  (CORS)  │  │ (bearer) │  │(multipart│  │(dispatch│  │(layers│  │
//! │  └──────────┘  └──────────┘  └──────────┘  └─────────┘  └───────┘  │
//! └───────────────────────────────────────────────────────────────────┘
//! ```

pub mod access;
pub mod auth;
pub mod graphql;
pub mod handlers;
pub mod routes;
pub mod upload;

pub use access::{expose_headers, preflight, ALLOW_HEADERS, ALLOW_METHODS, ALLOW_ORIGIN};
pub use auth::{
    auth_gate, bearer_token, resolve_outcome, AuthError, AuthOutcome, HmacTokenAuth, Identity,
    SharedVerifier, TokenVerifier,
};
pub use graphql::{graphql_get_handler, graphql_post_handler, malformed_request, selects_mutation};
pub use handlers::{health_handler, not_found_handler, AppState, HealthResponse};
pub use routes::{create_router, RouterConfig, DEFAULT_MAX_UPLOAD_BYTES};
pub use upload::{
    upload_handler, UploadForm, UploadResponse, UploadedFile, ACCEPTED_IMAGE_TYPES,
    NO_FILE_MESSAGE, STORED_MESSAGE,
};
