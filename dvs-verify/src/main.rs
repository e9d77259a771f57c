//! dvs-verify - Doctor Verification Service
//!
//! Verifies a medical provider's claimed identity (name, specialty, address,
//! phone, license, insurance networks, services) against public provider
//! registries and directories, and keeps a report of every verification.

use std::net::IpAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use dvs_common::config::{default_config_path, ConfigOverrides, ServiceConfig, TomlConfig};
use dvs_verify::services::build_sources;
use dvs_verify::{build_router, AppState};

/// Command-line arguments for dvs-verify
#[derive(Parser, Debug)]
#[command(name = "dvs-verify")]
#[command(about = "Doctor identity verification service")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "DVS_CONFIG")]
    config: Option<PathBuf>,

    /// Port to listen on
    #[arg(short, long, env = "DVS_PORT")]
    port: Option<u16>,

    /// Address to bind
    #[arg(short, long, env = "DVS_BIND")]
    bind: Option<IpAddr>,

    /// Folder holding the report store
    #[arg(long, env = "DVS_DATA_FOLDER")]
    data_folder: Option<PathBuf>,

    /// Report store file (overrides the data folder default)
    #[arg(long, env = "DVS_DATABASE")]
    database: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args.config.clone().unwrap_or_else(default_config_path);
    let config_found = config_path.exists();
    let toml_config = TomlConfig::load(&config_path)
        .with_context(|| format!("Failed to load config {}", config_path.display()))?;

    // RUST_LOG wins over the configured level
    let level = toml_config.logging.level.clone();
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            format!("dvs_verify={0},dvs_common={0},tower_http={0}", level).into()
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting dvs-verify (Doctor Verification Service)");
    info!(
        "Version: {} (git {}, built {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    if config_found {
        info!("Config: {}", config_path.display());
    } else {
        info!("Config: {} (not found, compiled defaults)", config_path.display());
    }

    let config = ServiceConfig::resolve(
        toml_config,
        ConfigOverrides {
            bind: args.bind,
            port: args.port,
            data_folder: args.data_folder,
            database_path: args.database,
        },
    )
    .context("Invalid configuration")?;

    info!("Database: {}", config.database_path.display());
    let db_pool = dvs_common::db::init_database(&config.database_path, &config.database)
        .await
        .context("Failed to initialize report store")?;
    info!("Database connection established");

    let sources = build_sources(&config.sources).context("Failed to configure evidence sources")?;

    let state = AppState::new(db_pool, sources.gatherer, config.matching.clone())
        .with_registry(sources.registry, sources.places_enabled)
        .with_max_upload_bytes(config.max_upload_bytes);

    let app = build_router(state, &config.cors);

    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.listen_addr))?;
    info!("Listening on http://{}", config.listen_addr);
    info!("Health check: http://{}/health", config.listen_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
