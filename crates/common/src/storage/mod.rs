//! Embedded storage primitives
//!
//! Generic SQLite infrastructure: an r2d2 connection pool with per-connection
//! pragmas, a pooled connection wrapper, and the storage error type. Schemas
//! and queries live with the code that owns the data.

pub mod error;
pub mod sqlite;

pub use error::{StorageError, StorageResult};
pub use sqlite::{apply_connection_pragmas, SqliteConnection, SqlitePool, SqlitePoolConfig};
