//! Integration tests for the SQLite storage primitives

#![cfg(feature = "platform")]

use amfe_common::storage::{SqlitePool, SqlitePoolConfig, StorageError};
use tempfile::TempDir;

/// Validates that an uncommitted transaction leaves earlier data intact.
#[test]
fn test_transaction_rolls_back_on_drop() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let pool = SqlitePool::open(&temp_dir.path().join("tx.db"), SqlitePoolConfig::default())?;

    let mut conn = pool.get_connection()?;
    conn.execute("CREATE TABLE items (id TEXT PRIMARY KEY)", &[])?;
    conn.execute("INSERT INTO items (id) VALUES ('kept')", &[])?;

    {
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM items", [])?;
        tx.execute("INSERT INTO items (id) VALUES ('discarded')", [])?;
        // dropped without commit
    }

    let ids: Vec<String> = conn.query_map("SELECT id FROM items", &[], |row| row.get(0))?;
    assert_eq!(ids, vec!["kept".to_string()]);
    Ok(())
}

/// Validates that data survives reopening the same file.
#[test]
fn test_reopen_preserves_data() -> anyhow::Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("persist.db");

    {
        let pool = SqlitePool::open(&path, SqlitePoolConfig::default())?;
        let mut conn = pool.get_connection()?;
        conn.execute("CREATE TABLE kv (k TEXT PRIMARY KEY, v TEXT NOT NULL)", &[])?;
        let tx = conn.transaction()?;
        tx.execute("INSERT INTO kv (k, v) VALUES ('a', '1')", [])?;
        tx.commit()?;
    }

    let pool = SqlitePool::open(&path, SqlitePoolConfig::default())?;
    let conn = pool.get_connection()?;
    let value: String = conn.query_row("SELECT v FROM kv WHERE k = 'a'", &[], |row| row.get(0))?;
    assert_eq!(value, "1");
    Ok(())
}

/// Validates that invalid pool configuration is rejected before opening.
#[test]
fn test_invalid_config_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let config = SqlitePoolConfig { max_size: 0, ..SqlitePoolConfig::default() };

    let result = SqlitePool::open(&temp_dir.path().join("x.db"), config);
    assert!(matches!(result, Err(StorageError::InvalidConfig(_))));
    assert!(!temp_dir.path().join("x.db").exists());
}
