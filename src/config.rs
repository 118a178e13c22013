//! Configuration management for the feed gateway.
//!
//! This module provides a flexible configuration system that supports:
//! - Command-line arguments via clap
//! - Environment variables with `FEED_` prefix
//! - Sensible defaults for all optional settings
//!
//! # Example
//!
//! ```ignore
//! use feed_gateway::config::{Cli, Command};
//!
//! let cli = Cli::parse();
//! if let Command::Serve(config) = cli.into_command() {
//!     println!("Listening on {}", config.bind_address());
//! }
//! ```
//!
//! # Environment Variables
//!
//! - `FEED_HOST` - Server bind address (default: 0.0.0.0)
//! - `FEED_PORT` - Server port (default: 8080)
//! - `FEED_IMAGES_DIR` - Directory uploads are stored in (default: images)
//! - `FEED_AUTH_SECRET` - HMAC secret for bearer tokens (required)
//! - `FEED_MAX_UPLOAD_BYTES` - Upload body limit (default: 10 MiB)
//! - `FEED_UNAUTHENTICATED_STATUS` - Status for unauthenticated callers (default: 500)
//! - `FEED_GRAPHIQL` - Serve GraphiQL on `GET /graphql` (default: true)

use std::path::PathBuf;

use axum::http::StatusCode;
use clap::{Args, Parser, Subcommand, ValueEnum};

use crate::server::DEFAULT_MAX_UPLOAD_BYTES;

// =============================================================================
// Default Values
// =============================================================================

/// Default server host.
pub const DEFAULT_HOST: &str = "0.0.0.0";

/// Default server port.
pub const DEFAULT_PORT: u16 = 8080;

/// Default directory for stored uploads.
pub const DEFAULT_IMAGES_DIR: &str = "images";

/// Default status for operations attempted without authentication.
pub const DEFAULT_UNAUTHENTICATED_STATUS: u16 = 500;

/// Default token lifetime in seconds (1 hour).
pub const DEFAULT_TOKEN_TTL: u64 = 3600;

// =============================================================================
// CLI Arguments
// =============================================================================

/// Feed gateway - image uploads and GraphQL behind one pipeline.
#[derive(Parser, Debug, Clone)]
#[command(name = "feed-gateway")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Consume the parsed arguments and return the selected command.
    pub fn into_command(self) -> Command {
        self.command
    }
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Run the HTTP server
    Serve(ServeConfig),

    /// Issue a bearer token
    Sign(SignConfig),

    /// Check the configuration and the images directory
    Check(CheckConfig),
}

// =============================================================================
// Serve
// =============================================================================

/// Arguments of `serve`.
#[derive(Args, Debug, Clone)]
pub struct ServeConfig {
    // =========================================================================
    // Server Configuration
    // =========================================================================
    /// Host address to bind the server to.
    #[arg(long, default_value = DEFAULT_HOST, env = "FEED_HOST")]
    pub host: String,

    /// Port to listen on.
    #[arg(short, long, default_value_t = DEFAULT_PORT, env = "FEED_PORT")]
    pub port: u16,

    // =========================================================================
    // Storage Configuration
    // =========================================================================
    /// Directory uploads are written to and served from.
    #[arg(long, default_value = DEFAULT_IMAGES_DIR, env = "FEED_IMAGES_DIR")]
    pub images_dir: PathBuf,

    /// Maximum size of an upload request body in bytes.
    #[arg(long, default_value_t = DEFAULT_MAX_UPLOAD_BYTES, env = "FEED_MAX_UPLOAD_BYTES")]
    pub max_upload_bytes: usize,

    // =========================================================================
    // Authentication Configuration
    // =========================================================================
    /// Secret key for HMAC-SHA256 bearer tokens.
    #[arg(long, env = "FEED_AUTH_SECRET")]
    pub auth_secret: String,

    /// HTTP status reported when an operation needs authentication.
    #[arg(
        long,
        default_value_t = DEFAULT_UNAUTHENTICATED_STATUS,
        env = "FEED_UNAUTHENTICATED_STATUS"
    )]
    pub unauthenticated_status: u16,

    // =========================================================================
    // GraphQL Configuration
    // =========================================================================
    /// Serve the GraphiQL page on `GET /graphql`.
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set, env = "FEED_GRAPHIQL")]
    pub graphiql: bool,

    // =========================================================================
    // Logging Configuration
    // =========================================================================
    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,

    /// Disable request tracing.
    #[arg(long, default_value_t = false)]
    pub no_tracing: bool,
}

impl ServeConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.auth_secret.trim().is_empty() {
            return Err(
                "No authentication secret provided. Set --auth-secret or FEED_AUTH_SECRET"
                    .to_string(),
            );
        }

        if self.max_upload_bytes == 0 {
            return Err("max_upload_bytes must be greater than 0".to_string());
        }

        self.unauthenticated_status_code()?;

        if self.images_dir.as_os_str().is_empty() {
            return Err("images_dir must not be empty".to_string());
        }

        Ok(())
    }

    /// Get the server bind address as "host:port".
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The unauthenticated status as an HTTP status code (4xx or 5xx only).
    pub fn unauthenticated_status_code(&self) -> Result<StatusCode, String> {
        match StatusCode::from_u16(self.unauthenticated_status) {
            Ok(status) if status.is_client_error() || status.is_server_error() => Ok(status),
            _ => Err(format!(
                "unauthenticated_status must be a 4xx or 5xx code, got {}",
                self.unauthenticated_status
            )),
        }
    }
}

// =============================================================================
// Sign
// =============================================================================

/// Output format of `sign`.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignOutputFormat {
    /// Bare token
    #[default]
    Token,

    /// JSON object with token, expiry and a ready-made header
    Json,
}

/// Arguments of `sign`.
#[derive(Args, Debug, Clone)]
pub struct SignConfig {
    /// Secret key the server verifies tokens with.
    #[arg(long, env = "FEED_AUTH_SECRET")]
    pub secret: String,

    /// User id the token is issued for.
    #[arg(long)]
    pub user_id: String,

    /// Token lifetime in seconds.
    #[arg(long, default_value_t = DEFAULT_TOKEN_TTL)]
    pub ttl: u64,

    /// Output format.
    #[arg(long, value_enum, default_value_t = SignOutputFormat::Token)]
    pub format: SignOutputFormat,
}

impl SignConfig {
    /// Validate the configuration and return an error message if invalid.
    pub fn validate(&self) -> Result<(), String> {
        if self.secret.trim().is_empty() {
            return Err("Secret must not be empty. Set --secret or FEED_AUTH_SECRET".to_string());
        }

        if self.user_id.trim().is_empty() {
            return Err("user_id must not be empty".to_string());
        }

        if self.user_id.chars().any(char::is_whitespace) {
            return Err("user_id must not contain whitespace".to_string());
        }

        if self.ttl == 0 {
            return Err("ttl must be greater than 0".to_string());
        }

        Ok(())
    }
}

// =============================================================================
// Check
// =============================================================================

/// Arguments of `check`.
#[derive(Args, Debug, Clone)]
pub struct CheckConfig {
    /// Directory uploads are written to.
    #[arg(long, default_value = DEFAULT_IMAGES_DIR, env = "FEED_IMAGES_DIR")]
    pub images_dir: PathBuf,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

// =============================================================================
// Tests
// =============================================================================
