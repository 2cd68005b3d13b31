//! Local store schema
//!
//! Tags and causes are kept as JSON arrays so record order and duplicates
//! survive a round trip. `failure_mode_tags` is a lookup index over the same
//! tags. `sync_meta` holds the last full refresh time.

use amfe_common::{SqliteConnection, StorageError, StorageResult};
use amfe_domain::constants::LOCAL_DB_VERSION;
use tracing::info;

pub const LAST_SYNC_KEY: &str = "last_sync";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS failure_modes (
    id TEXT PRIMARY KEY,
    category TEXT NOT NULL,
    mode TEXT NOT NULL,
    common_causes TEXT NOT NULL,
    severity_default INTEGER NOT NULL,
    tags TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_failure_modes_category ON failure_modes(category);
CREATE INDEX IF NOT EXISTS idx_failure_modes_mode ON failure_modes(mode);

CREATE TABLE IF NOT EXISTS failure_mode_tags (
    failure_mode_id TEXT NOT NULL,
    tag TEXT NOT NULL,
    PRIMARY KEY (failure_mode_id, tag)
);

CREATE INDEX IF NOT EXISTS idx_failure_mode_tags_tag ON failure_mode_tags(tag);

CREATE TABLE IF NOT EXISTS sync_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
";

/// Create tables if missing and check the schema version
///
/// A database written by a different schema version is rejected rather than
/// migrated.
pub fn ensure_schema(conn: &SqliteConnection) -> StorageResult<()> {
    conn.execute_batch(SCHEMA)?;

    let found: Option<i32> =
        match conn.query_row("SELECT version FROM schema_version LIMIT 1", &[], |row| row.get(0)) {
            Ok(version) => Some(version),
            Err(StorageError::Rusqlite(rusqlite::Error::QueryReturnedNoRows)) => None,
            Err(err) => return Err(err),
        };

    match found {
        Some(version) if version == LOCAL_DB_VERSION => Ok(()),
        Some(version) => Err(StorageError::SchemaVersionMismatch {
            expected: LOCAL_DB_VERSION,
            found: version,
        }),
        None => {
            conn.execute("INSERT INTO schema_version (version) VALUES (?1)", &[&LOCAL_DB_VERSION])?;
            info!(version = LOCAL_DB_VERSION, "Created local failure-mode schema");
            Ok(())
        }
    }
}
