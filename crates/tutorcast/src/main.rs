//! Tutorcast - storage backend for recorded programming tutorials

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

mod config;
mod migrate;

use config::{Config, EnvOverrides, LoggingConfig};
use tutorcast_api::{AppState, create_router};
use tutorcast_auth::JwtManager;
use tutorcast_storage::StorageSet;

/// Tutorcast - storage backend for recorded programming tutorials
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, default_value = "config/default.toml", global = true)]
    config: String,

    /// Bind address
    #[arg(long, env = "TUTORCAST_BIND", global = true)]
    bind: Option<String>,

    /// Port
    #[arg(short, long, env = "TUTORCAST_PORT", global = true)]
    port: Option<u16>,

    #[command(flatten)]
    overrides: EnvOverrides,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Copy every object between the local and remote backends
    Migrate(migrate::MigrateArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(&cli.config)?;
    config.apply_overrides(&cli.overrides);

    init_logging(&config.logging);

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config, cli.bind, cli.port).await,
        Command::Migrate(args) => migrate::run(&config, args).await,
    }
}

async fn serve(config: Config, bind: Option<String>, port: Option<u16>) -> Result<()> {
    info!("Starting Tutorcast v{}", env!("CARGO_PKG_VERSION"));

    // Initialize storage backends
    let storage_config = Arc::new(config.storage_config()?);
    let storage = StorageSet::from_config(&storage_config)
        .await
        .context("Failed to initialize storage")?;

    // Initialize JWT manager
    if config.auth.enabled && config.auth.jwt_secret == "change-me-in-production" {
        warn!("Using the default JWT secret, set APP_SECRET_KEY in production");
    }
    let jwt = Arc::new(JwtManager::new(
        &config.auth.jwt_secret,
        config.auth.token_expiry_hours,
    ));

    // Initialize metrics
    let metrics_handle = PrometheusBuilder::new()
        .install_recorder()
        .context("Failed to install Prometheus recorder")?;

    // Create application state
    let state = AppState::new(
        storage,
        storage_config.clone(),
        config.upload_limits(),
        jwt,
        config.auth.enabled,
    );

    // Create router
    let app = create_router(state, Some(Arc::new(metrics_handle)))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    // Determine bind address
    let bind_addr = bind.unwrap_or(config.server.bind_address);
    let port = port.unwrap_or(config.server.port);
    let addr: SocketAddr = format!("{}:{}", bind_addr, port).parse()?;

    info!("Listening on {}", addr);
    info!("Storage mode: {}", storage_config.mode);

    // Start server
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Initialize logging
fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&logging.level));

    if logging.format == "json" {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C handler");
    info!("Shutdown signal received");
}
