//! Redis-backed document cache shared between replicas.
//!
//! The entry is written with `SET .. PX` so it expires on its own, and the
//! expiry carries up to a fifth of the TTL in random jitter so replicas that
//! filled the cache together do not all miss together.
//!
//! The version floor lives under `<key>:floor`. Fills and invalidations run
//! as Lua scripts so the floor check and the write happen atomically on the
//! server, whichever replica issues them.

use std::time::Duration;

use async_trait::async_trait;
use bb8_redis::RedisConnectionManager;
use bb8_redis::bb8::{Pool, PooledConnection};
use bb8_redis::redis;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use serde_json::Value;
use tracing::debug;

use crate::domain::{StateVersion, VersionedDocument};
use crate::domain::ports::{StateCache, StateCacheError};

use super::{DEFAULT_CACHE_TTL, decode_entry};

const DEFAULT_KEY: &str = "boardsync:state:v1";
const DEFAULT_POOL_SIZE: u32 = 8;
const CONNECTION_TIMEOUT: Duration = Duration::from_secs(2);

const FILL_SCRIPT: &str = r"
local floor = tonumber(redis.call('GET', KEYS[2]) or '0')
if tonumber(ARGV[1]) < floor then
  return 0
end
redis.call('SET', KEYS[1], ARGV[2], 'PX', ARGV[3])
return 1
";

const INVALIDATE_SCRIPT: &str = r"
local floor = tonumber(redis.call('GET', KEYS[2]) or '0')
if tonumber(ARGV[1]) > floor then
  redis.call('SET', KEYS[2], ARGV[1])
end
redis.call('DEL', KEYS[1])
return 1
";

fn floor_key(key: &str) -> String {
    format!("{key}:floor")
}

/// Connection and expiry settings for [`RedisStateCache`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedisCacheConfig {
    url: String,
    key: String,
    ttl: Duration,
    max_size: u32,
}

impl RedisCacheConfig {
    /// Settings for `url` with the default key, TTL and pool size.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            key: DEFAULT_KEY.to_owned(),
            ttl: DEFAULT_CACHE_TTL,
            max_size: DEFAULT_POOL_SIZE,
        }
    }

    /// Override the key the document is stored under.
    #[must_use]
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    /// Override the base entry lifetime.
    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Override the maximum number of pooled connections.
    #[must_use]
    pub fn with_max_size(mut self, max_size: u32) -> Self {
        self.max_size = max_size;
        self
    }
}

/// Expiry in milliseconds for one write: the base TTL plus jitter.
fn jittered_ttl_millis(ttl: Duration, rng: &mut impl Rng) -> u64 {
    let base = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
    let spread = base / 5;
    base.saturating_add(rng.gen_range(0..=spread))
}

fn backend_error(error: impl std::fmt::Display) -> StateCacheError {
    StateCacheError::backend(error.to_string())
}

/// Shared cache entry stored in Redis.
#[derive(Clone)]
pub struct RedisStateCache {
    pool: Pool<RedisConnectionManager>,
    key: String,
    ttl: Duration,
}

impl RedisStateCache {
    /// Build the connection pool.
    ///
    /// Connections are opened lazily, so an unreachable server surfaces as
    /// cache errors on use rather than failing startup.
    pub fn connect(config: RedisCacheConfig) -> Result<Self, StateCacheError> {
        let manager = RedisConnectionManager::new(config.url.as_str()).map_err(backend_error)?;
        let pool = Pool::builder()
            .max_size(config.max_size)
            .connection_timeout(CONNECTION_TIMEOUT)
            .build_unchecked(manager);
        Ok(Self {
            pool,
            key: config.key,
            ttl: config.ttl,
        })
    }

    async fn connection(
        &self,
    ) -> Result<PooledConnection<'_, RedisConnectionManager>, StateCacheError> {
        self.pool.get().await.map_err(backend_error)
    }
}

#[async_trait]
impl StateCache for RedisStateCache {
    async fn get(&self) -> Result<Option<VersionedDocument>, StateCacheError> {
        let mut conn = self.connection().await?;
        let raw: Option<String> = redis::cmd("GET")
            .arg(&self.key)
            .query_async(&mut *conn)
            .await
            .map_err(backend_error)?;
        let Some(raw) = raw else {
            return Ok(None);
        };
        let value: Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(error) => {
                debug!(%error, "cached board document is not JSON");
                return Ok(None);
            }
        };
        Ok(decode_entry(value))
    }

    async fn set(&self, document: &VersionedDocument) -> Result<(), StateCacheError> {
        let payload = serde_json::to_string(&document.to_value()).map_err(backend_error)?;
        let ttl_millis = jittered_ttl_millis(self.ttl, &mut SmallRng::from_entropy());
        let mut conn = self.connection().await?;
        let stored: i64 = redis::cmd("EVAL")
            .arg(FILL_SCRIPT)
            .arg(2)
            .arg(&self.key)
            .arg(floor_key(&self.key))
            .arg(document.version.get())
            .arg(payload)
            .arg(ttl_millis)
            .query_async(&mut *conn)
            .await
            .map_err(backend_error)?;
        if stored == 0 {
            debug!(version = %document.version, "skipped caching a superseded board document");
        }
        Ok(())
    }

    async fn invalidate(&self, committed: StateVersion) -> Result<(), StateCacheError> {
        let mut conn = self.connection().await?;
        let _: i64 = redis::cmd("EVAL")
            .arg(INVALIDATE_SCRIPT)
            .arg(2)
            .arg(&self.key)
            .arg(floor_key(&self.key))
            .arg(committed.get())
            .query_async(&mut *conn)
            .await
            .map_err(backend_error)?;
        Ok(())
    }
}
