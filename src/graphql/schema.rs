//! Minimal schema bundled with the binary.
//!
//! Real deployments plug their own schema into the router; this one exists
//! so the service runs standalone and shows how resolvers read the caller's
//! authentication outcome and raise [`ResolverFault`]s.

use async_graphql::{Context, EmptySubscription, Object, Result, Schema};
use serde_json::json;

use crate::error::UNAUTHENTICATED_MESSAGE;
use crate::server::auth::{AuthOutcome, Identity};

use super::ResolverFault;

/// Schema type served by the binary.
pub type BundledSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

/// Build the bundled schema.
pub fn build_schema() -> BundledSchema {
    Schema::build(QueryRoot, MutationRoot, EmptySubscription).finish()
}

/// Resolve the caller or fail with a 401 fault.
fn require_identity<'a>(ctx: &Context<'a>) -> Result<&'a Identity> {
    ctx.data_opt::<AuthOutcome>()
        .and_then(AuthOutcome::identity)
        .ok_or_else(|| {
            ResolverFault::new(UNAUTHENTICATED_MESSAGE)
                .with_code(401)
                .into_error()
        })
}

pub struct QueryRoot;

#[Object]
impl QueryRoot {
    /// Public greeting, no authentication needed.
    async fn hello(&self) -> String {
        "Hello from feed-gateway".to_string()
    }

    /// User id of the authenticated caller.
    async fn whoami(&self, ctx: &Context<'_>) -> Result<String> {
        let identity = require_identity(ctx)?;
        Ok(identity.user_id.clone())
    }
}

pub struct MutationRoot;

#[Object]
impl MutationRoot {
    /// Echo a non-empty message back to an authenticated caller.
    async fn echo(&self, ctx: &Context<'_>, message: String) -> Result<String> {
        let identity = require_identity(ctx)?;

        if message.trim().is_empty() {
            return Err(ResolverFault::new("Invalid input.")
                .with_code(422)
                .with_data(json!([{ "field": "message", "message": "Message is empty." }]))
                .into_error());
        }

        Ok(format!("{}: {}", identity.user_id, message))
    }
}

// =============================================================================
// Tests
// =============================================================================
