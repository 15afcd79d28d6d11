//! asset-portal - A wallet-authenticated asset registry with image storage
//!
//! This is the main entry point for the asset-portal application.

use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing::{info, warn, Level};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use asset_portal::auth::{AuthGate, HttpSignatureVerifier, RequestAuthenticator, TokenIssuer};
use asset_portal::config::Config;
use asset_portal::database::SqliteDatabase;
use asset_portal::server::{AppState, Server};
use asset_portal::storage::S3Store;

/// asset-portal - A wallet-authenticated asset registry with image storage
#[derive(Parser, Debug)]
#[command(name = "asset-portal")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long, env = "ASSET_PORTAL_CONFIG")]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let args = Args::parse();

    // Load configuration
    let config = load_config(&args)?;
    config.validate()?;

    // Initialize tracing/logging
    init_tracing(&config.logging.level)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting asset-portal");

    // Initialize database
    let database = SqliteDatabase::new(&config.database.path).await?;
    let database = Arc::new(database);
    info!(path = %config.database.path, "Database initialized");

    // Nonce issuance shares the token store with the authentication gate
    let issuer = Arc::new(TokenIssuer::new(
        Arc::clone(&database),
        config.auth.token_lifetime(),
    ));

    // The authentication mode is fixed at startup
    let authenticator = if config.auth.enabled {
        let verifier = HttpSignatureVerifier::new(
            config.auth.verifier_url.clone(),
            config.auth.verify_timeout(),
        )?;
        info!(verifier_url = %config.auth.verifier_url, "Authentication enforced");
        RequestAuthenticator::Enforced(AuthGate::new(Arc::clone(&database), Arc::new(verifier)))
    } else {
        warn!("Authentication is DISABLED; mutating requests accept any claimed address");
        RequestAuthenticator::Disabled
    };

    // Initialize object storage for uploads
    let storage = S3Store::new(&config.storage)?;
    info!(
        bucket = %config.storage.bucket,
        region = %config.storage.region,
        "Object storage initialized"
    );

    // Create application state
    let state = AppState {
        authenticator: Arc::new(authenticator),
        issuer,
        database,
        storage: Arc::new(storage),
    };

    // Create and start the HTTP server
    let server = Server::new(config.server.clone(), state);
    let shutdown_signal = shutdown_signal();

    info!(
        host = %config.server.host,
        port = %config.server.port,
        "Starting HTTP server"
    );

    // Run the server
    let result = server.run(shutdown_signal).await;

    info!("asset-portal shutdown complete");

    result.map_err(Into::into)
}

/// Load configuration from file or environment
fn load_config(args: &Args) -> anyhow::Result<Config> {
    match &args.config {
        Some(path) => {
            // Use eprintln! since tracing is not yet initialized
            eprintln!("Loading configuration from file: {}", path);
            Config::from_file(path).map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
        }
        None => {
            // Use eprintln! since tracing is not yet initialized
            eprintln!("Loading configuration from environment variables");
            Config::from_env().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
        }
    }
}

/// Initialize the tracing subscriber with JSON log output
fn init_tracing(log_level: &str) -> anyhow::Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = tracing_subscriber::filter::LevelFilter::from_level(level);

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().json())
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {}", e))?;

    Ok(())
}

/// Create a future that resolves when a shutdown signal is received
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
