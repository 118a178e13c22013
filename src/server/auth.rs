//! Authentication gate and bearer-token verification.
//!
//! The gate resolves the caller of every request into an [`AuthOutcome`]
//! and stores it in the request extensions. It never rejects a request:
//! whether an operation needs an authenticated caller is decided further
//! down (the upload handler, GraphQL resolvers).
//!
//! # Token Scheme
//!
//! How tokens are verified is behind the [`TokenVerifier`] trait. The
//! shipped [`HmacTokenAuth`] issues and checks tokens of the form
//!
//! ```text
//! token     = "{user_id}.{expiry}.{signature}"
//! signature = hex(HMAC-SHA256(secret_key, "{user_id}.{expiry}"))
//! ```
//!
//! sent as `Authorization: Bearer {token}`.
//!
//! # Example
//!
//! ```rust
//! use feed_gateway::server::auth::{HmacTokenAuth, TokenVerifier};
//! use std::time::Duration;
//!
//! let auth = HmacTokenAuth::new("my-secret-key");
//! let (token, _expiry) = auth.sign("user-42", Duration::from_secs(3600));
//!
//! let identity = auth.verify(&token).unwrap();
//! assert_eq!(identity.user_id, "user-42");
//! ```

use std::convert::Infallible;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

// =============================================================================
// Types
// =============================================================================

/// HMAC-SHA256 type alias
type HmacSha256 = Hmac<Sha256>;

/// Verified caller identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// User identifier carried by the token
    pub user_id: String,
}

/// Outcome of the authentication gate for one request.
///
/// Handlers take it as an extractor; a request that never passed the gate
/// is treated as anonymous.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthOutcome {
    /// No credential, or a credential that failed verification
    #[default]
    Anonymous,

    /// Credential verified
    Authenticated(Identity),
}

impl AuthOutcome {
    /// Whether the caller presented a valid credential.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthOutcome::Authenticated(_))
    }

    /// The verified identity, if any.
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            AuthOutcome::Authenticated(identity) => Some(identity),
            AuthOutcome::Anonymous => None,
        }
    }
}

impl<S> FromRequestParts<S> for AuthOutcome
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<AuthOutcome>()
            .cloned()
            .unwrap_or_default())
    }
}

/// Token verification error types.
#[derive(Debug, Clone)]
pub enum AuthError {
    /// Token does not have the `{user_id}.{expiry}.{signature}` shape
    MalformedToken,

    /// Token has expired
    Expired {
        /// When the token expired
        expired_at: u64,
        /// Current time
        current_time: u64,
    },

    /// Signature does not match
    InvalidSignature,

    /// Signature is not valid hex
    InvalidSignatureFormat,

    /// Expiry is not a valid integer
    InvalidExpiryFormat,
}

impl std::fmt::Display for AuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthError::MalformedToken => write!(f, "Malformed token"),
            AuthError::Expired {
                expired_at,
                current_time,
            } => write!(
                f,
                "Token expired at {} (current time: {})",
                expired_at, current_time
            ),
            AuthError::InvalidSignature => write!(f, "Invalid signature"),
            AuthError::InvalidSignatureFormat => write!(f, "Invalid signature format"),
            AuthError::InvalidExpiryFormat => write!(f, "Invalid expiry format"),
        }
    }
}

impl std::error::Error for AuthError {}

// =============================================================================
// Token Verification
// =============================================================================

/// Trait for turning a bearer credential into an identity.
pub trait TokenVerifier: Send + Sync {
    /// Verify `token` and return the identity it carries.
    fn verify(&self, token: &str) -> Result<Identity, AuthError>;
}

/// Shared verifier handle used as middleware state.
pub type SharedVerifier = Arc<dyn TokenVerifier>;

/// Bearer-token issuer and verifier using HMAC-SHA256.
#[derive(Clone)]
pub struct HmacTokenAuth {
    /// Secret key for HMAC computation
    secret_key: Vec<u8>,
}

impl HmacTokenAuth {
    /// Create a new authenticator with the given secret key.
    ///
    /// The key should be at least 32 bytes.
    pub fn new(secret_key: impl AsRef<[u8]>) -> Self {
        Self {
            secret_key: secret_key.as_ref().to_vec(),
        }
    }

    /// Issue a token for `user_id` valid for `ttl`.
    ///
    /// Returns the token and its expiry timestamp (Unix epoch seconds).
    /// Lifetimes past the end of the `u64` range are clamped to it.
    pub fn sign(&self, user_id: &str, ttl: Duration) -> (String, u64) {
        let expiry = unix_now().saturating_add(ttl.as_secs());
        (self.sign_with_expiry(user_id, expiry), expiry)
    }

    /// Issue a token for `user_id` expiring at a specific timestamp.
    pub fn sign_with_expiry(&self, user_id: &str, expiry: u64) -> String {
        let signature = self.compute_signature(user_id, expiry);
        format!("{}.{}.{}", user_id, expiry, signature)
    }

    /// Compute the hex-encoded HMAC-SHA256 over `{user_id}.{expiry}`.
    fn compute_signature(&self, user_id: &str, expiry: u64) -> String {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret_key).expect("HMAC can take key of any size");
        mac.update(format!("{}.{}", user_id, expiry).as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }
}

impl TokenVerifier for HmacTokenAuth {
    fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        // The user id may itself contain dots
        let mut parts = token.rsplitn(3, '.');
        let (signature, expiry, user_id) = match (parts.next(), parts.next(), parts.next()) {
            (Some(sig), Some(exp), Some(user)) if !user.is_empty() && !sig.is_empty() => {
                (sig, exp, user)
            }
            _ => return Err(AuthError::MalformedToken),
        };

        let expiry = expiry
            .parse::<u64>()
            .map_err(|_| AuthError::InvalidExpiryFormat)?;

        let current_time = unix_now();
        if current_time > expiry {
            return Err(AuthError::Expired {
                expired_at: expiry,
                current_time,
            });
        }

        let provided_sig = hex::decode(signature).map_err(|_| AuthError::InvalidSignatureFormat)?;
        let expected_sig = hex::decode(self.compute_signature(user_id, expiry))
            .map_err(|_| AuthError::InvalidSignatureFormat)?;

        // Constant-time comparison
        if provided_sig.ct_eq(&expected_sig).into() {
            Ok(Identity {
                user_id: user_id.to_string(),
            })
        } else {
            Err(AuthError::InvalidSignature)
        }
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Extract the token from an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();

    if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() {
        Some(token)
    } else {
        None
    }
}

/// Resolve the caller of a request without ever failing.
pub fn resolve_outcome(verifier: &dyn TokenVerifier, headers: &HeaderMap) -> AuthOutcome {
    let Some(token) = bearer_token(headers) else {
        return AuthOutcome::Anonymous;
    };

    match verifier.verify(token) {
        Ok(identity) => {
            debug!(user_id = %identity.user_id, "Request authenticated");
            AuthOutcome::Authenticated(identity)
        }
        Err(AuthError::InvalidSignature) => {
            // Could indicate a forged token
            warn!(error_type = "invalid_signature", "Token verification failed");
            AuthOutcome::Anonymous
        }
        Err(e) => {
            debug!(error = %e, "Token verification failed");
            AuthOutcome::Anonymous
        }
    }
}

// =============================================================================
// Axum Middleware
// =============================================================================

/// Axum middleware attaching an [`AuthOutcome`] to every request.
///
/// # Example
///
/// ```ignore
/// use axum::{Router, middleware};
/// use feed_gateway::server::auth::{auth_gate, HmacTokenAuth, SharedVerifier};
///
/// let verifier: SharedVerifier = Arc::new(HmacTokenAuth::new("secret-key"));
/// let app = Router::new()
///     .route("/graphql", post(graphql_handler))
///     .layer(middleware::from_fn_with_state(verifier, auth_gate));
/// ```
pub async fn auth_gate(
    State(verifier): State<SharedVerifier>,
    mut request: Request,
    next: Next,
) -> Response {
    let outcome = resolve_outcome(verifier.as_ref(), request.headers());
    request.extensions_mut().insert(outcome);
    next.run(request).await
}

// =============================================================================
// Tests
// =============================================================================
