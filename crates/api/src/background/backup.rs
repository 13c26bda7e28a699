//! Database file snapshots with count-based rotation.
//!
//! Snapshots are plain copies of the SQLite file named
//! `<stem>-<timestamp>[-manual].<ext>`, where the timestamp is ISO-8601 UTC
//! with `:` and `.` replaced by `-`. After each run only the newest
//! `retention` snapshots (by modification time) are kept; manual snapshots
//! count towards the limit like any other.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use kehila_core::types::Timestamp;
use kehila_db::DbPool;

use crate::config::ServerConfig;

#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    #[error("Database file {0} does not exist")]
    SourceMissing(PathBuf),

    #[error("Backup '{0}' not found")]
    NotFound(String),

    #[error("Invalid backup name '{0}'")]
    InvalidName(String),

    #[error("Checkpoint failed: {0}")]
    Checkpoint(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnapshotKind {
    Scheduled,
    /// Requested by an administrator or taken before a restore.
    Manual,
}

/// A snapshot on disk.
#[derive(Debug, Clone, Serialize)]
pub struct BackupInfo {
    pub name: String,
    pub size_bytes: u64,
    pub modified_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct BackupService {
    db_path: PathBuf,
    backup_dir: PathBuf,
    retention: usize,
    prefix: String,
    ext: String,
}

impl BackupService {
    /// `prefix` and `ext` are taken from the database file name
    /// (`community.db` gives `community-...db`).
    pub fn new(db_path: impl Into<PathBuf>, backup_dir: impl Into<PathBuf>, retention: usize) -> Self {
        let db_path = db_path.into();
        let prefix = db_path
            .file_stem()
            .and_then(|s| s.to_str())
            .filter(|s| !s.is_empty())
            .unwrap_or("backup")
            .to_string();
        let ext = db_path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or("db")
            .to_string();
        Self {
            db_path,
            backup_dir: backup_dir.into(),
            retention: retention.max(1),
            prefix,
            ext,
        }
    }

    /// `None` when the database is in memory.
    pub fn from_config(config: &ServerConfig) -> Option<Self> {
        let db_path = config.database_path()?;
        Some(Self::new(
            db_path,
            config.backup_dir.clone(),
            config.backup_retention,
        ))
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    /// File name for a snapshot taken at `at`.
    pub fn snapshot_name(&self, at: Timestamp, kind: SnapshotKind) -> String {
        let stamp = at
            .to_rfc3339_opts(SecondsFormat::Millis, true)
            .replace([':', '.'], "-");
        let suffix = match kind {
            SnapshotKind::Scheduled => "",
            SnapshotKind::Manual => "-manual",
        };
        format!("{}-{stamp}{suffix}.{}", self.prefix, self.ext)
    }

    fn is_snapshot_name(&self, name: &str) -> bool {
        name.starts_with(&format!("{}-", self.prefix)) && name.ends_with(&format!(".{}", self.ext))
    }

    /// Copy the database file into the backup directory.
    pub async fn create_snapshot(&self, kind: SnapshotKind) -> Result<PathBuf, BackupError> {
        if !tokio::fs::try_exists(&self.db_path).await? {
            return Err(BackupError::SourceMissing(self.db_path.clone()));
        }
        tokio::fs::create_dir_all(&self.backup_dir).await?;

        let target = self.backup_dir.join(self.snapshot_name(Utc::now(), kind));
        let bytes = tokio::fs::copy(&self.db_path, &target).await?;
        tracing::info!(path = %target.display(), bytes, "Backup snapshot written");
        Ok(target)
    }

    /// Delete every snapshot beyond the newest `retention`. Returns the
    /// deleted paths.
    pub async fn prune(&self) -> Result<Vec<PathBuf>, BackupError> {
        let snapshots = self.scan().await?;
        let mut deleted = Vec::new();
        for (path, _, _) in snapshots.into_iter().skip(self.retention) {
            tokio::fs::remove_file(&path).await?;
            tracing::info!(path = %path.display(), "Old backup removed");
            deleted.push(path);
        }
        Ok(deleted)
    }

    /// Snapshots, newest first.
    pub async fn list(&self) -> Result<Vec<BackupInfo>, BackupError> {
        Ok(self
            .scan()
            .await?
            .into_iter()
            .filter_map(|(path, size_bytes, modified)| {
                let name = path.file_name()?.to_str()?.to_string();
                Some(BackupInfo {
                    name,
                    size_bytes,
                    modified_at: modified.into(),
                })
            })
            .collect())
    }

    /// Replace the database file with snapshot `name`.
    ///
    /// The live file is first saved as a manual snapshot (returned), and any
    /// leftover WAL files are removed so SQLite does not replay them over the
    /// restored data. Only call this while the server is stopped.
    pub async fn restore(&self, name: &str) -> Result<Option<PathBuf>, BackupError> {
        if name.contains(['/', '\\']) || !self.is_snapshot_name(name) {
            return Err(BackupError::InvalidName(name.to_string()));
        }
        let source = self.backup_dir.join(name);
        if !tokio::fs::try_exists(&source).await? {
            return Err(BackupError::NotFound(name.to_string()));
        }

        let pre_restore = if tokio::fs::try_exists(&self.db_path).await? {
            Some(self.create_snapshot(SnapshotKind::Manual).await?)
        } else {
            None
        };

        tokio::fs::copy(&source, &self.db_path).await?;
        for suffix in ["-wal", "-shm"] {
            let mut side = self.db_path.clone().into_os_string();
            side.push(suffix);
            match tokio::fs::remove_file(&side).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }

        tracing::info!(
            snapshot = name,
            db_path = %self.db_path.display(),
            "Database restored from backup",
        );
        Ok(pre_restore)
    }

    /// Checkpoint the WAL, take a snapshot and rotate.
    pub async fn run_once(
        &self,
        pool: &DbPool,
        kind: SnapshotKind,
    ) -> Result<(PathBuf, Vec<PathBuf>), BackupError> {
        kehila_db::checkpoint(pool).await?;
        let created = self.create_snapshot(kind).await?;
        let pruned = self.prune().await?;
        Ok((created, pruned))
    }

    /// `(path, size, modified)` for every snapshot, newest first. Ties on
    /// modification time fall back to the name, which embeds the timestamp.
    async fn scan(&self) -> Result<Vec<(PathBuf, u64, SystemTime)>, BackupError> {
        let mut entries = match tokio::fs::read_dir(&self.backup_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut snapshots = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if !self.is_snapshot_name(&name) {
                continue;
            }
            let metadata = entry.metadata().await?;
            if !metadata.is_file() {
                continue;
            }
            snapshots.push((entry.path(), metadata.len(), metadata.modified()?));
        }

        snapshots.sort_by(|a, b| b.2.cmp(&a.2).then_with(|| b.0.cmp(&a.0)));
        Ok(snapshots)
    }
}

/// Run the backup loop: once at startup, then every `interval`, until
/// `cancel` fires. Failures are logged and the loop carries on.
pub async fn run(service: BackupService, pool: DbPool, interval: Duration, cancel: CancellationToken) {
    tracing::info!(
        backup_dir = %service.backup_dir.display(),
        retention = service.retention,
        interval_secs = interval.as_secs(),
        "Backup scheduler started"
    );

    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Backup scheduler stopping");
                break;
            }
            _ = ticker.tick() => {
                match service.run_once(&pool, SnapshotKind::Scheduled).await {
                    Ok((created, pruned)) => {
                        tracing::info!(
                            path = %created.display(),
                            pruned = pruned.len(),
                            "Scheduled backup complete"
                        );
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Scheduled backup failed");
                    }
                }
            }
        }
    }
}
