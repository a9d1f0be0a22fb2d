use std::net::SocketAddr;
use std::sync::Arc;

use cadence_core::config::CadenceConfig;
use cadence_scheduler::{
    AlertSender, EngineBuilder, HttpOutboundClient, NoopAlertSender, SlackAlertSender,
};
use cadence_store::SqliteTaskStore;
use clap::Parser;
use tracing::{info, warn};

mod app;
mod http;
mod signal;

#[derive(Parser)]
#[command(name = "cadence-gateway", version, about = "HTTP task scheduler")]
struct Cli {
    /// Config file path (overrides CADENCE_CONFIG)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // config: --config flag > CADENCE_CONFIG env > ~/.cadence/cadence.toml
    let config_path = cli.config.or_else(|| std::env::var("CADENCE_CONFIG").ok());
    let config_result = CadenceConfig::load(config_path.as_deref());
    let config = config_result.as_ref().cloned().unwrap_or_default();

    let level = &config.logger.level;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("cadence_gateway={level},cadence_scheduler={level},cadence_store={level},tower_http=info").into()
            }),
        )
        .init();

    if let Err(e) = config_result {
        warn!("Config load failed ({}), using defaults", e);
    }

    let db_path = &config.database.path;
    ensure_parent_dir(db_path);
    info!(path = %db_path, "opening SQLite database");
    let db = rusqlite::Connection::open(db_path)?;
    db.execute_batch("PRAGMA journal_mode=WAL;")?;
    let store = Arc::new(SqliteTaskStore::new(db)?);

    let client = Arc::new(HttpOutboundClient::new()?);
    let alerts: Arc<dyn AlertSender> = if config.alerts_enabled() {
        info!(prod = config.is_prod_mode, "slack alerts enabled");
        Arc::new(SlackAlertSender::from_config(&config)?)
    } else {
        info!("slack alerts disabled");
        Arc::new(NoopAlertSender)
    };

    let engine = EngineBuilder::new(store, client, alerts).build();
    let scheduled = engine.start()?;
    info!(scheduled, "scheduler engine started");

    let addr: SocketAddr = format!("{}:{}", config.gateway.bind, config.gateway.port).parse()?;
    let application = config.application.clone();
    let state = Arc::new(app::AppState::new(config, engine.clone()));
    let router = app::build_router(state);

    info!(%application, "Cadence gateway listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            if let Err(e) = signal::wait_for_shutdown_signal().await {
                warn!("signal handler failed: {e}");
            }
            info!("shutdown signal received");
        })
        .await?;

    engine.timers().clear();
    info!("Cadence gateway stopped");
    Ok(())
}

/// Ensure the parent directory for a file path exists.
fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}
