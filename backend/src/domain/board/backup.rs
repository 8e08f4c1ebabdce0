//! Backup records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{BackupId, VersionedDocument};

/// What triggered a backup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackupKind {
    /// Created at startup because none existed.
    Startup,
    /// Hourly cadence tick.
    Hourly,
    /// Daily cadence tick.
    Daily,
    /// Requested explicitly.
    Manual,
}

impl BackupKind {
    /// Storage representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::Hourly => "hourly",
            Self::Daily => "daily",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Display for BackupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a stored backup kind is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown backup kind: {0}")]
pub struct UnknownBackupKind(pub String);

impl FromStr for BackupKind {
    type Err = UnknownBackupKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "startup" => Ok(Self::Startup),
            "hourly" => Ok(Self::Hourly),
            "daily" => Ok(Self::Daily),
            // Older deployments labelled explicit snapshots "on-demand".
            "manual" | "on-demand" => Ok(Self::Manual),
            other => Err(UnknownBackupKind(other.to_owned())),
        }
    }
}

/// A backup about to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct NewBackup {
    /// Document and version at capture time.
    pub snapshot: VersionedDocument,
    /// Trigger.
    pub kind: BackupKind,
    /// Free-form description of who or what asked for it.
    pub source: String,
}

/// A stored backup.
///
/// The snapshot is kept as raw JSON: rows written by older deployments may
/// predate normalization and are only interpreted on restore.
#[derive(Debug, Clone, PartialEq)]
pub struct Backup {
    /// Sequence identifier.
    pub id: BackupId,
    /// Served form of the document, `version` included.
    pub snapshot: Value,
    /// Trigger.
    pub kind: BackupKind,
    /// Who or what asked for it.
    pub source: String,
    /// Capture timestamp.
    pub created_at: DateTime<Utc>,
}

impl Backup {
    /// Version recorded in the snapshot, if present.
    pub fn captured_version(&self) -> Option<u64> {
        self.snapshot.get(super::VERSION_KEY).and_then(Value::as_u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("startup", BackupKind::Startup)]
    #[case("hourly", BackupKind::Hourly)]
    #[case("daily", BackupKind::Daily)]
    #[case("manual", BackupKind::Manual)]
    #[case("on-demand", BackupKind::Manual)]
    fn parses_stored_kinds(#[case] raw: &str, #[case] expected: BackupKind) {
        assert_eq!(raw.parse::<BackupKind>(), Ok(expected));
    }

    #[rstest]
    fn rejects_unknown_kind() {
        assert!("weekly".parse::<BackupKind>().is_err());
    }
}
