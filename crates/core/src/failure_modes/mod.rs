//! Failure-mode library access
//!
//! [`FailureModeService`] is the single entry point. It is built once from
//! its dependencies and shared; there is no global instance.

pub mod ports;
pub mod query;
pub mod retry;
pub mod search;
pub mod service;

pub use service::{FailureModeService, FailureModeServiceConfig};
