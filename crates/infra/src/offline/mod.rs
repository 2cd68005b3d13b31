//! Persistent local copy of the failure-mode library

pub mod schema;
pub mod store;

pub use store::SqliteFailureModeStore;
