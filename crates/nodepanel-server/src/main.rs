//! `NodePanel` Server
//!
//! Admin panel for a proxy fleet: manages users, groups, nodes and inbounds,
//! and pushes each node its full configuration whenever something changes.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use nodepanel_core::SettingsValidators;
use nodepanel_core::config::load_config;
use nodepanel_core::tracing_init::init_tracing;

use nodepanel_server::auth::JwtManager;
use nodepanel_server::panel::{Panel, TimezoneCell};
use nodepanel_server::server::{AppState, build_router};
use nodepanel_server::storage::PanelDatabase;
use nodepanel_server::sync::SyncEngine;

#[derive(Parser, Debug)]
#[command(name = "nodepanel-server")]
#[command(version, about = "NodePanel server - proxy fleet admin panel and node sync engine")]
struct Args {
    /// Path to a JSON config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to listen on (overrides config).
    #[arg(long)]
    addr: Option<SocketAddr>,

    /// Path to SQLite database file (overrides config).
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// JWT secret key (overrides config).
    #[arg(long, env = "NODEPANEL_JWT_SECRET")]
    jwt_secret: Option<String>,

    /// Output logs as JSON (for structured log aggregation).
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = load_config(args.config.as_deref())?;
    if let Some(addr) = args.addr {
        config.server.addr = addr;
    }
    if let Some(path) = args.db_path {
        config.server.database_path = Some(path);
    }
    if let Some(secret) = args.jwt_secret {
        config.auth.jwt_secret = secret;
    }
    if args.log_json {
        config.log.json = true;
    }

    init_tracing(&config.log);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %config.server.addr,
        "Starting nodepanel-server"
    );

    let db_path = match config.server.database_path.clone() {
        Some(path) => path,
        None => default_db_path()?,
    };
    info!(path = %db_path.display(), "Opening panel database");
    let db = PanelDatabase::open(&db_path).await?;

    if config.auth.jwt_secret == nodepanel_core::config::AuthConfig::default().jwt_secret {
        warn!("Using the built-in JWT secret; set NODEPANEL_JWT_SECRET in production");
    }
    let jwt = JwtManager::new(config.auth.jwt_secret.as_bytes(), config.auth.token_ttl_secs);

    let shutdown = CancellationToken::new();
    let validators = Arc::new(SettingsValidators::with_builtins());
    let engine = SyncEngine::new(db.clone(), config.sync.clone(), shutdown.clone());
    let timezone = TimezoneCell::load(&db).await?;
    info!(timezone = %timezone.get(), "Display timezone loaded");

    let panel = Panel::new(db, engine, validators, jwt, timezone);
    let app = build_router(AppState { panel });

    let listener = tokio::net::TcpListener::bind(config.server.addr).await?;
    info!(addr = %config.server.addr, "Panel listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    info!("Panel stopped");
    Ok(())
}

/// Wait for Ctrl-C, then cancel in-flight node syncs.
async fn shutdown_signal(shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
    shutdown.cancel();
}

fn default_db_path() -> anyhow::Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(home.join(".nodepanel").join("panel.db"))
}
