//! Builders wiring storage adapters, the document cache and metrics into the
//! board and backup services.

use std::sync::Arc;

use tracing::{info, warn};

use boardsync::domain::ports::{
    BackupCommand, BackupRepository, BoardStateRepository, EventLedger, StateCache,
    StateCacheError, StateWriteMetrics,
};
use boardsync::domain::{BackupService, BoardStateService};
use boardsync::inbound::http::state::HttpState;
use boardsync::outbound::cache::{InMemoryStateCache, RedisCacheConfig, RedisStateCache};
use boardsync::outbound::memory::InMemoryBoardStore;
use boardsync::outbound::persistence::{
    DbPool, DieselBackupRepository, DieselBoardStateRepository, DieselEventLedger,
};
use boardsync::settings::AppSettings;

/// Where the document, ledger and backups live.
pub(crate) enum Storage {
    Postgres(DbPool),
    Memory(Arc<InMemoryBoardStore>),
}

/// Handler state plus the backup command driven by the scheduler.
pub(crate) struct BoardServices {
    pub(crate) http_state: HttpState,
    pub(crate) backup_command: Arc<dyn BackupCommand>,
}

/// Pick the document cache: Redis when configured, in-process otherwise.
pub(crate) fn build_state_cache(
    settings: &AppSettings,
) -> Result<Arc<dyn StateCache>, StateCacheError> {
    let ttl = settings.cache_ttl();
    match settings.redis_url() {
        Some(url) => {
            let cache = RedisStateCache::connect(RedisCacheConfig::new(url).with_ttl(ttl))?;
            info!(ttl_secs = ttl.as_secs(), "using Redis document cache");
            Ok(Arc::new(cache))
        }
        None => {
            info!(ttl_secs = ttl.as_secs(), "using in-process document cache");
            Ok(Arc::new(InMemoryStateCache::new(ttl)))
        }
    }
}

/// Build the board and backup services over the chosen storage.
pub(crate) fn build_board_services(
    storage: Storage,
    cache: Arc<dyn StateCache>,
    metrics: Arc<dyn StateWriteMetrics>,
) -> BoardServices {
    match storage {
        Storage::Postgres(pool) => wire_services(
            Arc::new(DieselBoardStateRepository::new(pool.clone())),
            Arc::new(DieselEventLedger::new(pool.clone())),
            Arc::new(DieselBackupRepository::new(pool)),
            cache,
            metrics,
        ),
        Storage::Memory(store) => {
            warn!("no database configured; board state will not survive a restart");
            wire_services(Arc::clone(&store), Arc::clone(&store), store, cache, metrics)
        }
    }
}

fn wire_services<R, L, B>(
    repository: Arc<R>,
    ledger: Arc<L>,
    backups: Arc<B>,
    cache: Arc<dyn StateCache>,
    metrics: Arc<dyn StateWriteMetrics>,
) -> BoardServices
where
    R: BoardStateRepository + 'static,
    L: EventLedger + 'static,
    B: BackupRepository + 'static,
{
    let board = Arc::new(BoardStateService::new(
        Arc::clone(&repository),
        ledger,
        Arc::clone(&cache),
        Arc::clone(&metrics),
    ));
    let backup = Arc::new(BackupService::new(backups, repository, cache, metrics));
    let backup_command: Arc<dyn BackupCommand> = backup.clone();

    BoardServices {
        http_state: HttpState::new(board.clone(), board, backup.clone(), backup),
        backup_command,
    }
}

#[cfg(test)]
mod tests {
    use boardsync::domain::ports::NoOpStateWriteMetrics;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[tokio::test]
    async fn memory_storage_serves_an_absent_document() {
        let settings = AppSettings::default();
        let cache = build_state_cache(&settings).expect("in-process cache");
        let services = build_board_services(
            Storage::Memory(Arc::new(InMemoryBoardStore::default())),
            cache,
            Arc::new(NoOpStateWriteMetrics),
        );

        let current = services
            .http_state
            .state_query
            .fetch()
            .await
            .expect("read");
        assert!(current.is_none());
        assert!(
            services
                .backup_command
                .ensure_initial_backup()
                .await
                .expect("startup backup")
                .is_some()
        );
    }

    #[rstest]
    fn malformed_redis_urls_fail_cache_construction() {
        let settings = AppSettings {
            redis_url: Some("not a url".to_owned()),
            ..AppSettings::default()
        };
        assert!(build_state_cache(&settings).is_err());
    }
}
