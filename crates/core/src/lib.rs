//! # AMFE Core
//!
//! Failure-mode library and AMFE record logic with no I/O of its own.
//!
//! This crate contains:
//! - Port interfaces for the remote table and the persistent local store
//! - Connectivity state shared by everything that needs to know whether the
//!   backend is reachable
//! - The local search algorithm
//! - [`FailureModeService`], which composes rate limiting, retry, caching and
//!   offline fallback around the ports
//! - [`AmfeService`], CRUD over analyses, items, corrective actions and
//!   evidence
//!
//! ## Architecture Principles
//! - Only depends on `amfe-common` and `amfe-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits

pub mod amfe;
pub mod connectivity;
pub mod failure_modes;

pub use amfe::{AmfeService, AmfeTables, RecordTable};
pub use connectivity::{OnlineDetector, OnlineSubscription};
pub use failure_modes::ports::{FailureModeTable, LocalRecordStore, RemoteResult};
pub use failure_modes::query::{FailureModeOrder, FailureModeQuery};
pub use failure_modes::retry::{retry_options, RemoteFailurePolicy};
pub use failure_modes::search::apply_search_params;
pub use failure_modes::{FailureModeService, FailureModeServiceConfig};
