//! Process-local document cache.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use mockable::{Clock, DefaultClock};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::domain::{StateVersion, VersionedDocument};
use crate::domain::ports::{StateCache, StateCacheError};

use super::decode_entry;

struct CachedEntry {
    value: Value,
    expires_at: DateTime<Utc>,
}

#[derive(Default)]
struct CacheSlot {
    entry: Option<CachedEntry>,
    floor: StateVersion,
}

/// Single-entry cache held in process memory.
pub struct InMemoryStateCache {
    slot: RwLock<CacheSlot>,
    ttl: TimeDelta,
    clock: Arc<dyn Clock>,
}

impl InMemoryStateCache {
    /// Create a cache whose entries live for `ttl`.
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(DefaultClock))
    }

    /// Create a cache that reads time from `clock`.
    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            slot: RwLock::new(CacheSlot::default()),
            ttl: TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX),
            clock,
        }
    }
}

#[async_trait]
impl StateCache for InMemoryStateCache {
    async fn get(&self) -> Result<Option<VersionedDocument>, StateCacheError> {
        let now = self.clock.utc();
        let guard = self.slot.read().await;
        let Some(entry) = guard.entry.as_ref() else {
            return Ok(None);
        };
        if entry.expires_at <= now {
            return Ok(None);
        }
        Ok(decode_entry(entry.value.clone()))
    }

    async fn set(&self, document: &VersionedDocument) -> Result<(), StateCacheError> {
        let expires_at = self
            .clock
            .utc()
            .checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        let mut slot = self.slot.write().await;
        if document.version < slot.floor {
            return Ok(());
        }
        slot.entry = Some(CachedEntry {
            value: document.to_value(),
            expires_at,
        });
        Ok(())
    }

    async fn invalidate(&self, committed: StateVersion) -> Result<(), StateCacheError> {
        let mut slot = self.slot.write().await;
        slot.entry = None;
        slot.floor = slot.floor.max(committed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::{Local, TimeZone};
    use rstest::{fixture, rstest};
    use serde_json::json;

    use super::*;
    use crate::domain::BoardDocument;

    struct SteppingClock(Mutex<DateTime<Utc>>);

    impl SteppingClock {
        fn advance(&self, delta: TimeDelta) {
            let mut now = match self.0.lock() {
                Ok(now) => now,
                Err(_) => panic!("clock mutex"),
            };
            *now += delta;
        }
    }

    impl Clock for SteppingClock {
        fn local(&self) -> DateTime<Local> {
            self.utc().with_timezone(&Local)
        }

        fn utc(&self) -> DateTime<Utc> {
            match self.0.lock() {
                Ok(now) => *now,
                Err(_) => panic!("clock mutex"),
            }
        }
    }

    #[fixture]
    fn clock() -> Arc<SteppingClock> {
        let start = Utc
            .with_ymd_and_hms(2026, 1, 5, 9, 0, 0)
            .single()
            .expect("valid timestamp");
        Arc::new(SteppingClock(Mutex::new(start)))
    }

    fn document(version: u64) -> VersionedDocument {
        let doc = BoardDocument::from_value(json!({ "projects": [{ "id": "p1" }] }))
            .expect("valid document");
        VersionedDocument::new(doc, StateVersion::new(version))
    }

    #[rstest]
    #[tokio::test]
    async fn entries_are_served_until_they_expire(clock: Arc<SteppingClock>) {
        let cache = InMemoryStateCache::with_clock(Duration::from_secs(5), clock.clone());
        cache.set(&document(3)).await.expect("set");

        clock.advance(TimeDelta::seconds(4));
        assert_eq!(cache.get().await.expect("get"), Some(document(3)));

        clock.advance(TimeDelta::seconds(1));
        assert_eq!(cache.get().await.expect("get"), None);
    }

    #[rstest]
    #[tokio::test]
    async fn invalidation_drops_the_entry(clock: Arc<SteppingClock>) {
        let cache = InMemoryStateCache::with_clock(Duration::from_secs(60), clock);
        cache.set(&document(1)).await.expect("set");
        cache
            .invalidate(StateVersion::new(2))
            .await
            .expect("invalidate");

        assert_eq!(cache.get().await.expect("get"), None);
    }

    #[rstest]
    #[tokio::test]
    async fn documents_loaded_before_a_commit_are_not_cached_after_it(
        clock: Arc<SteppingClock>,
    ) {
        let cache = InMemoryStateCache::with_clock(Duration::from_secs(60), clock);
        cache
            .invalidate(StateVersion::new(2))
            .await
            .expect("invalidate");

        cache.set(&document(1)).await.expect("late fill");
        assert_eq!(cache.get().await.expect("get"), None);

        cache.set(&document(2)).await.expect("fresh fill");
        assert_eq!(cache.get().await.expect("get"), Some(document(2)));
    }

    #[rstest]
    #[tokio::test]
    async fn the_floor_never_moves_backwards(clock: Arc<SteppingClock>) {
        let cache = InMemoryStateCache::with_clock(Duration::from_secs(60), clock);
        cache.invalidate(StateVersion::new(5)).await.expect("invalidate");
        cache.invalidate(StateVersion::new(3)).await.expect("invalidate");

        cache.set(&document(4)).await.expect("set");
        assert_eq!(cache.get().await.expect("get"), None);
    }

    #[rstest]
    #[tokio::test]
    async fn a_newer_set_replaces_the_entry(clock: Arc<SteppingClock>) {
        let cache = InMemoryStateCache::with_clock(Duration::from_secs(60), clock);
        cache.set(&document(1)).await.expect("set");
        cache.set(&document(2)).await.expect("set");

        let cached = cache.get().await.expect("get").expect("entry");
        assert_eq!(cached.version, StateVersion::new(2));
    }
}
