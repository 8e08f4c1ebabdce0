//! Service configuration loaded via OrthoConfig.
//!
//! Values come from `BOARDSYNC_*` environment variables, CLI flags and
//! configuration files. Unset values fall back to the defaults exposed by the
//! accessor methods.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use ortho_config::OrthoConfig;
use serde::Deserialize;

use crate::domain::BackupCadence;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_HOURLY_BACKUP_MINUTES: u64 = 60;
const DEFAULT_DAILY_BACKUP_HOURS: u64 = 24;
const DEFAULT_CACHE_TTL_SECONDS: u64 = 5;
const DEFAULT_SESSION_KEY_FILE: &str = "/var/run/secrets/session_key";

/// Errors raised while interpreting loaded settings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SettingsError {
    /// The bind address is not a socket address.
    #[error("invalid bind address '{value}': {message}")]
    InvalidBindAddr { value: String, message: String },
}

/// Runtime configuration for the board-sync service.
#[derive(Debug, Clone, Default, Deserialize, OrthoConfig)]
#[ortho_config(prefix = "BOARDSYNC")]
pub struct AppSettings {
    /// Socket address the HTTP server binds to.
    pub bind_addr: Option<String>,
    /// PostgreSQL connection string. Without it the in-memory store is used.
    pub database_url: Option<String>,
    /// Redis connection string for the shared document cache.
    pub redis_url: Option<String>,
    /// Minutes between hourly-cadence backups.
    pub hourly_backup_minutes: Option<u64>,
    /// Hours between daily-cadence backups.
    pub daily_backup_hours: Option<u64>,
    /// Lifetime of cached documents.
    pub cache_ttl_seconds: Option<u64>,
    /// File holding the session signing key.
    pub session_key_file: Option<PathBuf>,
    /// Mark session cookies `Secure`.
    pub cookie_secure: Option<bool>,
    /// `SameSite` policy for session cookies: `Strict`, `Lax` or `None`.
    pub same_site: Option<String>,
    /// Allow a generated session key when the key file is missing.
    #[ortho_config(default = false)]
    pub allow_ephemeral_session: bool,
}

impl AppSettings {
    /// Parse the configured bind address, falling back to `0.0.0.0:8080`.
    pub fn bind_addr(&self) -> Result<SocketAddr, SettingsError> {
        let value = self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR);
        value
            .parse()
            .map_err(|err: std::net::AddrParseError| SettingsError::InvalidBindAddr {
                value: value.to_owned(),
                message: err.to_string(),
            })
    }

    /// Periodic backup cadence. A zero interval disables that kind.
    pub fn backup_cadence(&self) -> BackupCadence {
        BackupCadence::from_intervals(
            self.hourly_backup_minutes
                .unwrap_or(DEFAULT_HOURLY_BACKUP_MINUTES),
            self.daily_backup_hours.unwrap_or(DEFAULT_DAILY_BACKUP_HOURS),
        )
    }

    /// Lifetime of cached documents.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds.unwrap_or(DEFAULT_CACHE_TTL_SECONDS))
    }

    /// Session key path, falling back to the mounted secret location.
    pub fn session_key_file(&self) -> PathBuf {
        self.session_key_file
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SESSION_KEY_FILE))
    }

    /// Database URL with blank values treated as unset.
    pub fn database_url(&self) -> Option<&str> {
        non_blank(self.database_url.as_deref())
    }

    /// Redis URL with blank values treated as unset.
    pub fn redis_url(&self) -> Option<&str> {
        non_blank(self.redis_url.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}
