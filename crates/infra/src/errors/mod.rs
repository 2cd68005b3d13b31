//! Error conversions at the infrastructure boundary

pub mod conversions;

pub use conversions::{remote_failure_from_http, InfraError};
