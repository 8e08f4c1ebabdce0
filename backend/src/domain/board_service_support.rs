//! Shared helpers for the board state and backup services.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::json;
use tracing::{info, warn};

use crate::domain::ports::{
    BoardStateRepository, CommitOutcome, SaveStateResponse, StateCache, StateWriteMetrics,
    VersionedWrite, WriteOutcome,
};
use crate::domain::{BoardDocument, Error, ErrorCode, StateVersion, VersionedDocument};

/// Attempts a server-initiated restore makes before reporting the conflict.
pub(crate) const RESTORE_ATTEMPTS: u32 = 3;

/// Conflict error returned when the expected version is stale.
pub fn version_conflict(expected: StateVersion, current: StateVersion) -> Error {
    Error::conflict("version conflict").with_details(json!({
        "code": "version_conflict",
        "expectedVersion": expected.get(),
        "currentVersion": current.get(),
    }))
}

/// The single versioned-write path shared by saves and restores.
///
/// Commits through the repository, invalidates the cache before returning
/// an accepted write, and records the outcome.
///
/// The writer also remembers the highest version it committed. Readers
/// compare cached and freshly loaded documents against it so a stale copy
/// is never served or cached once a newer commit returned, even when the
/// cache invalidation itself failed.
#[derive(Clone)]
pub(crate) struct StateWriter<R> {
    repository: Arc<R>,
    cache: Arc<dyn StateCache>,
    metrics: Arc<dyn StateWriteMetrics>,
    committed: Arc<AtomicU64>,
}

impl<R> StateWriter<R>
where
    R: BoardStateRepository,
{
    pub(crate) fn new(
        repository: Arc<R>,
        cache: Arc<dyn StateCache>,
        metrics: Arc<dyn StateWriteMetrics>,
    ) -> Self {
        Self {
            repository,
            cache,
            metrics,
            committed: Arc::new(AtomicU64::new(StateVersion::INITIAL.get())),
        }
    }

    pub(crate) fn repository(&self) -> &R {
        &self.repository
    }

    pub(crate) fn cache(&self) -> &dyn StateCache {
        self.cache.as_ref()
    }

    /// Highest version committed through this writer.
    pub(crate) fn committed_floor(&self) -> StateVersion {
        StateVersion::new(self.committed.load(Ordering::Acquire))
    }

    /// The stored document, or the empty board at version 0.
    pub(crate) async fn load_or_empty(&self) -> Result<VersionedDocument, Error> {
        let loaded = self.repository.load().await.map_err(Error::from)?;
        Ok(loaded.unwrap_or_else(|| {
            VersionedDocument::new(BoardDocument::empty(), StateVersion::INITIAL)
        }))
    }

    async fn record(&self, outcome: WriteOutcome) {
        if let Err(error) = self.metrics.record(outcome).await {
            warn!(%error, outcome = outcome.as_label(), "failed to record write outcome");
        }
    }

    async fn invalidate_cache(&self, committed: StateVersion) {
        self.committed.fetch_max(committed.get(), Ordering::AcqRel);
        if let Err(error) = self.cache.invalidate(committed).await {
            warn!(%error, %committed, "failed to invalidate board state cache");
        }
    }

    /// Write a server-built document against whatever version is current.
    ///
    /// `prepare` receives the current document and returns the write to
    /// attempt. A conflict means another writer got in between the read and
    /// the commit, so the read and `prepare` are repeated up to
    /// [`RESTORE_ATTEMPTS`] times.
    pub(crate) async fn commit_against_current<F>(
        &self,
        mut prepare: F,
    ) -> Result<VersionedDocument, Error>
    where
        F: FnMut(VersionedDocument) -> Result<VersionedWrite, Error> + Send,
    {
        let mut attempt = 1;
        loop {
            let current = self.load_or_empty().await?;
            let write = prepare(current)?;
            let document = write.document.clone();
            match self.commit(write).await {
                Ok(response) => return Ok(VersionedDocument::new(document, response.version)),
                Err(error) if error.code() == ErrorCode::Conflict && attempt < RESTORE_ATTEMPTS => {
                    warn!(attempt, "restore overtaken by a concurrent write; retrying");
                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }

    pub(crate) async fn commit(&self, write: VersionedWrite) -> Result<SaveStateResponse, Error> {
        let expected = write.expected_version;
        let token = write.client_request_id.clone();
        let origin = write.origin.kind();
        let outcome = self
            .repository
            .commit(write)
            .await
            .map_err(Error::from)?;

        match outcome {
            CommitOutcome::Committed {
                version,
                ledger_entry_id,
            } => {
                self.invalidate_cache(version).await;
                self.record(WriteOutcome::Accepted).await;
                info!(
                    %version,
                    %ledger_entry_id,
                    client_request_id = %token,
                    origin,
                    "board state write accepted"
                );
                Ok(SaveStateResponse {
                    version,
                    replayed: false,
                })
            }
            CommitOutcome::Replayed {
                version,
                payload_matches,
            } => {
                self.record(WriteOutcome::Replayed).await;
                if payload_matches {
                    info!(%version, client_request_id = %token, "board state write replayed");
                } else {
                    warn!(
                        %version,
                        client_request_id = %token,
                        "client_request_id reused with a different document; answering with the recorded result"
                    );
                }
                Ok(SaveStateResponse {
                    version,
                    replayed: true,
                })
            }
            CommitOutcome::Conflict { current_version } => {
                self.record(WriteOutcome::Conflict).await;
                info!(
                    expected = %expected,
                    current = %current_version,
                    client_request_id = %token,
                    "board state write rejected: stale version"
                );
                Err(version_conflict(expected, current_version))
            }
        }
    }
}
