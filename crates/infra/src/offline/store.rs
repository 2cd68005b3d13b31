//! SQLite implementation of [`LocalRecordStore`]
//!
//! The pool is opened lazily on first use and kept for the life of the
//! store. A failed open leaves the store closed so the next call tries again.
//! All SQLite work runs on the blocking thread pool.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use amfe_common::{
    ClassifiedRetry, RetryExecutor, RetryOptions, SqliteConnection, SqlitePool, SqlitePoolConfig,
    StorageError, StorageResult,
};
use amfe_core::LocalRecordStore;
use amfe_domain::constants::LOCAL_DB_FILE;
use amfe_domain::{AmfeError, FailureMode, OfflineConfig, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::params;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};

use super::schema::{ensure_schema, LAST_SYNC_KEY};
use crate::errors::InfraError;

/// Failure-mode records persisted in a single SQLite file
#[derive(Debug)]
pub struct SqliteFailureModeStore {
    path: PathBuf,
    supported: bool,
    pool_config: SqlitePoolConfig,
    pool: OnceCell<SqlitePool>,
}

impl SqliteFailureModeStore {
    /// Store backed by the database file at `path`
    ///
    /// The store reports itself unsupported when the file's directory cannot
    /// be created.
    pub fn new(path: impl Into<PathBuf>, pool_config: SqlitePoolConfig) -> Self {
        let path = path.into();
        let supported = directory_usable(&path);
        if !supported {
            warn!(path = %path.display(), "Offline storage directory is not usable");
        }
        Self { path, supported, pool_config, pool: OnceCell::new() }
    }

    /// Store configured from the `[offline]` section
    pub fn from_config(config: &OfflineConfig) -> Self {
        let path = config.db_path.clone().unwrap_or_else(default_db_path);
        let pool_config = SqlitePoolConfig { max_size: config.pool_size, ..SqlitePoolConfig::default() };
        let mut store = Self::new(path, pool_config);
        store.supported &= config.enabled;
        store
    }

    /// Database file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn pool(&self) -> Result<&SqlitePool> {
        if !self.supported {
            return Err(AmfeError::StorageUnavailable("offline storage is not supported".into()));
        }

        self.pool
            .get_or_try_init(|| async {
                let path = self.path.clone();
                let config = self.pool_config.clone();
                tokio::task::spawn_blocking(move || -> StorageResult<SqlitePool> {
                    let pool = SqlitePool::open(&path, config)?;
                    ensure_schema(&pool.get_connection()?)?;
                    Ok(pool)
                })
                .await
                .map_err(StorageError::from)
                .and_then(|opened| opened)
                .map_err(|err| {
                    warn!(error = %err, path = %self.path.display(), "Failed to open offline storage");
                    AmfeError::StorageUnavailable(err.to_string())
                })
            })
            .await
    }

    /// Run `op` on a pooled connection off the async executor
    ///
    /// Busy and locked databases are retried with the short storage profile;
    /// every other failure is returned on the first attempt.
    async fn blocking<T, F>(&self, on_error: fn(StorageError) -> AmfeError, op: F) -> Result<T>
    where
        F: Fn(&mut SqliteConnection) -> StorageResult<T> + Send + Sync + 'static,
        T: Send + 'static,
    {
        let pool = self.pool().await?.clone();
        let op = Arc::new(op);
        RetryExecutor::with_policy(RetryOptions::storage(), ClassifiedRetry)
            .execute(|| {
                let pool = pool.clone();
                let op = Arc::clone(&op);
                async move {
                    tokio::task::spawn_blocking(move || {
                        let mut conn = pool.get_connection()?;
                        op(&mut conn)
                    })
                    .await
                    .map_err(StorageError::from)
                    .and_then(|result| result)
                }
            })
            .await
            .map_err(on_error)
    }
}

#[async_trait]
impl LocalRecordStore for SqliteFailureModeStore {
    fn is_supported(&self) -> bool {
        self.supported
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    async fn init(&self) -> Result<()> {
        self.pool().await.map(|_| ())
    }

    #[instrument(skip(self, records), fields(count = records.len()))]
    async fn store_failure_modes(&self, records: &[FailureMode]) -> Result<()> {
        let records = records.to_vec();
        self.blocking(write_error, move |conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM failure_mode_tags", [])?;
            tx.execute("DELETE FROM failure_modes", [])?;
            {
                let mut clear_tags_stmt =
                    tx.prepare("DELETE FROM failure_mode_tags WHERE failure_mode_id = ?1")?;
                let mut tag_stmt = tx.prepare(
                    "INSERT OR IGNORE INTO failure_mode_tags (failure_mode_id, tag) VALUES (?1, ?2)",
                )?;
                let mut stmt = tx.prepare(
                    "INSERT OR REPLACE INTO failure_modes
                        (id, category, mode, common_causes, severity_default, tags, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                )?;
                for record in &records {
                    stmt.execute(params![
                        record.id,
                        record.category,
                        record.mode,
                        serde_json::to_string(&record.common_causes)?,
                        record.severity_default,
                        serde_json::to_string(&record.tags)?,
                        record.created_at.to_rfc3339(),
                        record.updated_at.to_rfc3339(),
                    ])?;
                    // A repeated id replaces the earlier row, so its tags go too
                    clear_tags_stmt.execute([&record.id])?;
                    for tag in &record.tags {
                        tag_stmt.execute(params![record.id, tag])?;
                    }
                }
            }
            tx.execute(
                "INSERT OR REPLACE INTO sync_meta (key, value) VALUES (?1, ?2)",
                params![LAST_SYNC_KEY, Utc::now().to_rfc3339()],
            )?;
            tx.commit()?;
            Ok(())
        })
        .await?;

        info!("Stored failure modes offline");
        Ok(())
    }

    async fn get_failure_modes(&self) -> Result<Vec<FailureMode>> {
        let records: Vec<FailureMode> = self
            .blocking(read_error, |conn| {
                let rows = conn.query_map(
                    "SELECT id, category, mode, common_causes, severity_default, tags, created_at, updated_at
                     FROM failure_modes ORDER BY id",
                    &[],
                    |row| {
                        Ok(StoredRow {
                            id: row.get(0)?,
                            category: row.get(1)?,
                            mode: row.get(2)?,
                            common_causes: row.get(3)?,
                            severity_default: row.get(4)?,
                            tags: row.get(5)?,
                            created_at: row.get(6)?,
                            updated_at: row.get(7)?,
                        })
                    },
                )?;
                rows.into_iter().map(StoredRow::into_failure_mode).collect()
            })
            .await?;

        debug!(count = records.len(), "Loaded failure modes from offline storage");
        Ok(records)
    }

    #[instrument(skip(self))]
    async fn clear_cache(&self) -> Result<()> {
        self.blocking(write_error, |conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM failure_mode_tags", [])?;
            tx.execute("DELETE FROM failure_modes", [])?;
            tx.execute("DELETE FROM sync_meta WHERE key = ?1", [LAST_SYNC_KEY])?;
            tx.commit()?;
            Ok(())
        })
        .await?;

        info!("Cleared offline failure modes");
        Ok(())
    }

    async fn count(&self) -> Result<usize> {
        self.blocking(read_error, |conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM failure_modes", &[], |row| row.get(0))?;
            Ok(usize::try_from(count).unwrap_or_default())
        })
        .await
    }

    async fn last_sync(&self) -> Result<Option<DateTime<Utc>>> {
        self.blocking(read_error, |conn| {
            match conn.query_row(
                "SELECT value FROM sync_meta WHERE key = ?1",
                &[&LAST_SYNC_KEY],
                |row| row.get::<_, String>(0),
            ) {
                Ok(value) => parse_timestamp(&value).map(Some),
                Err(StorageError::Rusqlite(rusqlite::Error::QueryReturnedNoRows)) => Ok(None),
                Err(err) => Err(err),
            }
        })
        .await
    }
}

/// Row as stored, before JSON and timestamp decoding
struct StoredRow {
    id: String,
    category: String,
    mode: String,
    common_causes: String,
    severity_default: i32,
    tags: String,
    created_at: String,
    updated_at: String,
}

impl StoredRow {
    fn into_failure_mode(self) -> StorageResult<FailureMode> {
        Ok(FailureMode {
            common_causes: serde_json::from_str(&self.common_causes)?,
            tags: serde_json::from_str(&self.tags)?,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
            id: self.id,
            category: self.category,
            mode: self.mode,
            severity_default: self.severity_default,
        })
    }
}

fn parse_timestamp(value: &str) -> StorageResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|err| StorageError::Query(format!("invalid timestamp '{value}': {err}")))
}

fn read_error(err: StorageError) -> AmfeError {
    InfraError::from(err).into()
}

fn write_error(err: StorageError) -> AmfeError {
    match AmfeError::from(InfraError::from(err)) {
        AmfeError::StorageUnavailable(message) | AmfeError::NotFound(message) => {
            AmfeError::StorageWrite(message)
        }
        other => other,
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("data").join(LOCAL_DB_FILE)
}

fn directory_usable(path: &Path) -> bool {
    match path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        Some(parent) => std::fs::create_dir_all(parent).is_ok(),
        None => true,
    }
}
