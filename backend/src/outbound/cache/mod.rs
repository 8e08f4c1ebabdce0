//! Read-through cache adapters for the served board document.
//!
//! Both adapters store the served JSON form (document fields plus
//! `version`) and re-validate it on every read. An entry that fails
//! validation is reported as a miss so a corrupt or foreign value can never
//! reach a client.
//!
//! - [`InMemoryStateCache`]: process-local entry with a clock-driven TTL.
//! - [`RedisStateCache`]: shared entry in Redis with a jittered TTL.

mod memory;
mod redis;

use std::time::Duration;

use serde_json::Value;
use tracing::warn;

use crate::domain::VersionedDocument;

pub use memory::InMemoryStateCache;
pub use redis::{RedisCacheConfig, RedisStateCache};

/// Default lifetime of a cached document.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5);

/// Decode a cached value, treating anything untrustworthy as absent.
fn decode_entry(value: Value) -> Option<VersionedDocument> {
    match VersionedDocument::from_value(value) {
        Ok(document) => Some(document),
        Err(error) => {
            warn!(%error, "discarding invalid cached board document");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use rstest::rstest;
    use serde_json::json;

    use super::*;
    use crate::domain::StateVersion;

    #[rstest]
    #[case::bare_array(json!([{ "id": "p1" }]))]
    #[case::missing_version(json!({ "projects": [] }))]
    #[case::projects_not_array(json!({ "projects": {}, "version": 2 }))]
    #[case::scalar(json!("stale"))]
    fn untrustworthy_entries_decode_as_misses(#[case] value: Value) {
        assert_eq!(decode_entry(value), None);
    }

    #[rstest]
    fn served_documents_decode() {
        let decoded = decode_entry(json!({ "projects": [{ "id": "p1" }], "version": 4 }))
            .expect("valid entry");
        assert_eq!(decoded.version, StateVersion::new(4));
        assert_eq!(decoded.document.projects().len(), 1);
    }
}
