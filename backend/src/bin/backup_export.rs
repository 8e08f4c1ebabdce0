//! Write a stored backup snapshot to a file or stdout for offline archival.
#![cfg_attr(not(any(test, doctest)), deny(clippy::unwrap_used))]
#![cfg_attr(not(any(test, doctest)), deny(clippy::expect_used))]

use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

use boardsync::domain::ports::BackupRepository;
use boardsync::domain::{Backup, BackupId};
use boardsync::outbound::persistence::{DbPool, DieselBackupRepository, PoolConfig};
use clap::Parser;
use color_eyre::eyre::{Context, Result, eyre};
use serde_json::json;
use tokio::runtime::Builder;

/// `backup-export` command arguments.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "backup-export",
    about = "Export a board backup snapshot as JSON",
    version
)]
struct CliArgs {
    /// Backup to export. Defaults to the most recent backup.
    #[arg(long, value_name = "id")]
    id: Option<i64>,
    /// Destination file. Writes to stdout when omitted.
    #[arg(long, short, value_name = "path")]
    output: Option<PathBuf>,
    /// Database connection URL. Falls back to `BOARDSYNC_DATABASE_URL`.
    #[arg(long = "database-url", value_name = "url", env = "BOARDSYNC_DATABASE_URL")]
    database_url: String,
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let args = CliArgs::parse();
    let runtime = Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to create Tokio runtime")?;
    runtime.block_on(run(args))
}

async fn run(args: CliArgs) -> Result<()> {
    let pool = DbPool::new(PoolConfig::new(&args.database_url).with_max_size(1))
        .await
        .context("failed to create database pool")?;
    let repository = DieselBackupRepository::new(pool);

    let backup = match args.id {
        Some(id) => repository
            .find(BackupId::new(id))
            .await
            .context("failed to load backup")?
            .ok_or_else(|| eyre!("backup {id} not found"))?,
        None => repository
            .latest()
            .await
            .context("failed to load latest backup")?
            .ok_or_else(|| eyre!("no backups have been taken yet"))?,
    };

    let rendered = render(&backup).context("failed to serialize backup")?;
    match args.output {
        Some(path) => fs::write(&path, rendered)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => io::stdout()
            .lock()
            .write_all(rendered.as_bytes())
            .context("failed to write to stdout")?,
    }
    Ok(())
}

fn render(backup: &Backup) -> serde_json::Result<String> {
    let mut rendered = serde_json::to_string_pretty(&json!({
        "id": backup.id.get(),
        "kind": backup.kind.as_str(),
        "source": backup.source,
        "createdAt": backup.created_at.to_rfc3339(),
        "snapshot": backup.snapshot,
    }))?;
    rendered.push('\n');
    Ok(rendered)
}
