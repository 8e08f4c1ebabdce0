//! Backend entry-point: loads settings, prepares storage and serves the API.

mod server;

use std::ffi::OsString;
use std::sync::Arc;

use actix_web::web;
use ortho_config::OrthoConfig;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use boardsync::domain::BackupScheduler;
use boardsync::inbound::http::health::HealthState;
use boardsync::inbound::http::session_config::{BuildMode, key_fingerprint, session_settings};
use boardsync::outbound::memory::InMemoryBoardStore;
use boardsync::outbound::persistence::{DbPool, PoolConfig, run_pending_migrations};
use boardsync::settings::AppSettings;
#[cfg(not(feature = "metrics"))]
use boardsync::domain::ports::NoOpStateWriteMetrics;

use server::{ServerConfig, Storage, build_board_services, build_state_cache, create_server};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let args: Vec<OsString> = std::env::args_os().collect();
    let settings = AppSettings::load_from_iter(args)
        .map_err(|e| std::io::Error::other(format!("failed to load settings: {e}")))?;
    let session = session_settings(&settings, BuildMode::from_debug_assertions())
        .map_err(std::io::Error::other)?;
    info!(
        fingerprint = %key_fingerprint(&session.key),
        "session key loaded"
    );
    let bind_addr = settings.bind_addr().map_err(std::io::Error::other)?;

    let storage = connect_storage(&settings).await?;
    let cache = build_state_cache(&settings).map_err(std::io::Error::other)?;

    #[cfg(feature = "metrics")]
    let metrics = server::build_metrics();
    #[cfg(feature = "metrics")]
    let state_writes = Arc::clone(&metrics.state_writes);
    #[cfg(not(feature = "metrics"))]
    let state_writes = Arc::new(NoOpStateWriteMetrics);

    let services = build_board_services(storage, cache, state_writes);
    match services.backup_command.ensure_initial_backup().await {
        Ok(Some(backup)) => info!(backup_id = %backup.id, "startup backup created"),
        Ok(None) => {}
        Err(error) => warn!(%error, "startup backup failed"),
    }
    let scheduler =
        BackupScheduler::new(Arc::clone(&services.backup_command), settings.backup_cadence())
            .spawn();

    let config = ServerConfig::new(session, bind_addr, services.http_state);
    #[cfg(feature = "metrics")]
    let config = config.with_metrics(metrics.prometheus);

    let health_state = web::Data::new(HealthState::new());
    info!(%bind_addr, "starting HTTP server");
    let result = create_server(health_state.clone(), config)?.await;
    health_state.mark_unhealthy();
    scheduler.shutdown();
    result
}

async fn connect_storage(settings: &AppSettings) -> std::io::Result<Storage> {
    let Some(url) = settings.database_url() else {
        return Ok(Storage::Memory(Arc::new(InMemoryBoardStore::default())));
    };
    run_pending_migrations(url)
        .await
        .map_err(std::io::Error::other)?;
    let pool = DbPool::new(PoolConfig::new(url))
        .await
        .map_err(std::io::Error::other)?;
    info!("connected to PostgreSQL");
    Ok(Storage::Postgres(pool))
}
