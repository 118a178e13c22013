//! Cross-origin access policy.
//!
//! Every response, error responses included, carries the same three
//! headers:
//!
//! ```text
//! Access-Control-Allow-Origin:  *
//! Access-Control-Allow-Methods: GET, POST, PUT, PATCH, DELETE
//! Access-Control-Allow-Headers: Content-Type, Authorization
//! ```
//!
//! `OPTIONS` requests are preflight probes: they are answered with an empty
//! 200 on any path and never reach authentication or a handler.

use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Response},
    Router,
};
use http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN,
};
use http::{HeaderValue, Method, StatusCode};
use tower_http::set_header::SetResponseHeaderLayer;

/// Origins allowed to call the API.
pub const ALLOW_ORIGIN: &str = "*";

/// Methods advertised to browsers.
pub const ALLOW_METHODS: &str = "GET, POST, PUT, PATCH, DELETE";

/// Request headers advertised to browsers.
pub const ALLOW_HEADERS: &str = "Content-Type, Authorization";

/// Middleware answering preflight probes.
pub async fn preflight(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }

    next.run(request).await
}

/// Wrap `router` so every response carries the access headers.
///
/// Must be applied outside every layer that can produce a response on its
/// own (preflight, panic recovery) so those responses are covered too.
pub fn expose_headers(router: Router) -> Router {
    router
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOW_HEADERS),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOW_METHODS),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static(ALLOW_ORIGIN),
        ))
}

// =============================================================================
// Tests
// =============================================================================
