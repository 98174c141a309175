//! Clue hunt server - main entry point
//!
//! Resolves configuration (CLI / environment / TOML / defaults), loads the
//! game configuration, makes sure every photo clue has a reference image and
//! serves the HTTP + SSE API until Ctrl+C or SIGTERM.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use cluehunt_common::config::{
    load_toml_config, locate_config_file, ConfigSource, HuntConfig, Overrides,
};
use cluehunt_common::EventBus;
use cluehunt_server::clues::ConfigStore;
use cluehunt_server::engine::{EngineSettings, ValidationEngine};
use cluehunt_server::notify::NotificationChannel;
use cluehunt_server::{build_router, AppState};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for cluehunt-server
#[derive(Parser, Debug)]
#[command(name = "cluehunt-server")]
#[command(about = "GPS clue hunt progress validation server")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, env = "CLUEHUNT_PORT")]
    port: Option<u16>,

    /// Folder holding gameConfig.json and reference images
    #[arg(short, long, env = "CLUEHUNT_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Token required in the x-admin-token header ("dev" disables the check)
    #[arg(long, env = "CLUEHUNT_ADMIN_TOKEN")]
    admin_token: Option<String>,

    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = locate_config_file(args.config.as_deref());
    let (toml_config, source) =
        load_toml_config(config_path.as_deref()).context("Failed to load TOML config")?;
    let config = HuntConfig::resolve(
        Overrides {
            port: args.port,
            data_dir: args.data_dir,
            admin_token: args.admin_token,
        },
        toml_config,
    )
    .context("Invalid configuration")?;

    // Initialize tracing
    let default_filter = format!(
        "cluehunt_server={level},cluehunt_common={level},tower_http={level}",
        level = config.log_level
    );
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting cluehunt-server v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    match &source {
        ConfigSource::File(path) => info!("Config file: {}", path.display()),
        ConfigSource::Missing(path) => {
            warn!("Config file {} not found, using defaults", path.display())
        }
        ConfigSource::Defaults => info!("No config file, using defaults"),
    }
    info!("Data folder: {}", config.data_dir.display());
    if !config.admin_auth_enabled() {
        warn!("Admin routes are unauthenticated");
    }

    let store = Arc::new(
        ConfigStore::open(config.data_dir.clone())
            .await
            .context("Failed to load game configuration")?,
    );
    let generated = store
        .ensure_reference_images()
        .await
        .context("Failed to prepare reference images")?;
    if generated > 0 {
        info!("Generated {} placeholder reference image(s)", generated);
    }

    let event_bus = EventBus::new(config.event_capacity);
    let notifier: Arc<dyn NotificationChannel> = Arc::new(event_bus.clone());
    let engine = Arc::new(ValidationEngine::new(
        store,
        notifier,
        EngineSettings {
            thresholds: config.validation,
            chat_history_limit: config.chat_history_limit,
        },
    ));

    let admin_token = config
        .admin_auth_enabled()
        .then(|| config.admin_token.clone())
        .flatten();
    let app = build_router(AppState::new(engine, event_bus, admin_token));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Starting HTTP server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

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
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
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
