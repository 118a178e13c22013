//! Feed gateway - image uploads and GraphQL behind one pipeline.
//!
//! This binary starts the HTTP server and configures all components.

use clap::Parser;
use std::process::ExitCode;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use feed_gateway::{
    config::{CheckConfig, Cli, Command, ServeConfig, SignConfig, SignOutputFormat},
    graphql::build_schema,
    server::{auth::HmacTokenAuth, create_router, RouterConfig},
    storage::{ContentStore, LocalContentStore},
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Serve(config) => run_serve(config).await,
        Command::Sign(config) => run_sign(config),
        Command::Check(config) => run_check(config).await,
    }
}

// =============================================================================
// Serve Command
// =============================================================================

async fn run_serve(config: ServeConfig) -> ExitCode {
    // Initialize logging
    init_logging(config.verbose);

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Configuration error: {}", e);
        return ExitCode::FAILURE;
    }

    let router_config = match build_router_config(&config) {
        Ok(router_config) => router_config,
        Err(e) => {
            error!("Configuration error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    info!("Configuration:");
    info!("  Images directory: {}", config.images_dir.display());
    info!("  Upload limit: {} bytes", config.max_upload_bytes);
    info!(
        "  Unauthenticated status: {}",
        router_config.unauthenticated_status.as_u16()
    );
    if config.graphiql {
        info!("  GraphiQL: enabled");
    } else {
        info!("  GraphiQL: disabled");
    }

    let store = match LocalContentStore::new(&config.images_dir).await {
        Ok(store) => store,
        Err(e) => {
            error!(
                "Failed to prepare images directory {}: {}",
                config.images_dir.display(),
                e
            );
            return ExitCode::FAILURE;
        }
    };

    let router = create_router(store, build_schema(), router_config);

    // Bind and serve
    let addr = config.bind_address();

    info!("");
    info!("────────────────────────────────────────────────────────────────");
    info!("  Server listening on: http://{}", addr);
    info!("");
    info!("  Try these endpoints:");
    info!("    curl http://{}/health", addr);
    info!("    curl -X POST -H 'Content-Type: application/json' \\");
    info!("         -d '{{\"query\":\"{{ hello }}\"}}' http://{}/graphql", addr);
    if config.graphiql {
        info!("");
        info!("  Explore the schema in your browser:");
        info!("    open http://{}/graphql", addr);
    }
    info!("────────────────────────────────────────────────────────────────");
    info!("");

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to {}: {}", addr, e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = axum::serve(listener, router).await {
        error!("Server error: {}", e);
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose {
        "feed_gateway=debug,tower_http=debug"
    } else {
        "feed_gateway=info,tower_http=info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Build RouterConfig from the application ServeConfig.
fn build_router_config(config: &ServeConfig) -> Result<RouterConfig, String> {
    let router_config = RouterConfig::new(config.auth_secret.clone())
        .with_unauthenticated_status(config.unauthenticated_status_code()?)
        .with_max_upload_bytes(config.max_upload_bytes)
        .with_graphiql(config.graphiql)
        .with_tracing(!config.no_tracing);

    Ok(router_config)
}

// =============================================================================
// Sign Command
// =============================================================================

fn run_sign(config: SignConfig) -> ExitCode {
    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let auth = HmacTokenAuth::new(&config.secret);
    let (token, expiry) = auth.sign(&config.user_id, Duration::from_secs(config.ttl));

    // Output based on format
    match config.format {
        SignOutputFormat::Token => {
            println!("{}", token);
        }
        SignOutputFormat::Json => {
            let json = serde_json::json!({
                "token": token,
                "expiry": expiry,
                "user_id": config.user_id,
                "ttl": config.ttl,
                "header": format!("Authorization: Bearer {}", token),
            });
            match serde_json::to_string_pretty(&json) {
                Ok(text) => println!("{}", text),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    return ExitCode::FAILURE;
                }
            }
        }
    }

    ExitCode::SUCCESS
}

// =============================================================================
// Check Command
// =============================================================================

async fn run_check(config: CheckConfig) -> ExitCode {
    // Initialize minimal logging for check command
    if config.verbose {
        init_logging(true);
    }

    println!("Feed Gateway Configuration Check");
    println!("════════════════════════════════");
    println!();

    let store = match LocalContentStore::new(&config.images_dir).await {
        Ok(store) => {
            println!("✓ Images directory: {}", store.root().display());
            store
        }
        Err(e) => {
            println!("✗ Images directory: {}", e);
            return ExitCode::FAILURE;
        }
    };

    print!("Testing write access... ");

    let probe = match store.store("check.png", bytes::Bytes::new()).await {
        Ok(asset) => asset,
        Err(e) => {
            println!("✗ failed");
            println!();
            println!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = store.remove(&probe.path).await {
        println!("✗ failed");
        println!();
        println!("Error: could not remove {}: {}", probe.path, e);
        return ExitCode::FAILURE;
    }

    println!("✓ success");
    println!();
    println!("Configuration OK");

    ExitCode::SUCCESS
}
