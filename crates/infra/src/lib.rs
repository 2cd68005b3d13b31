//! # AMFE Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - PostgREST clients for the remote `failure_modes` table and the AMFE
//!   record tables
//! - The SQLite-backed persistent local store
//! - A connectivity monitor feeding the shared online detector
//! - Configuration loading and tracing setup
//!
//! ## Architecture
//! - Implements traits defined in `amfe-core`
//! - Contains all "impure" code (HTTP, SQLite, environment, files)

pub mod bootstrap;
pub mod config;
pub mod connectivity;
pub mod errors;
pub mod http;
pub mod observability;
pub mod offline;
pub mod postgrest;

// Re-export commonly used items
pub use bootstrap::{build_amfe_service, build_failure_mode_service, start_connectivity_monitor};
pub use connectivity::ConnectivityMonitor;
pub use errors::InfraError;
pub use http::{HttpClient, HttpClientBuilder};
pub use observability::init_tracing;
pub use offline::SqliteFailureModeStore;
pub use postgrest::{PostgrestFailureModeTable, PostgrestRecordTable};
