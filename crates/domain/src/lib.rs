//! # AMFE Domain
//!
//! Failure-mode library and AMFE record types for the AMFE client.
//!
//! This crate contains:
//! - Failure-mode records, search parameters and aggregate DTOs
//! - AMFE analyses, items, corrective actions and evidence
//! - The closed error taxonomy and remote error classification
//! - Configuration structures
//! - Domain constants
//!
//! ## Architecture
//! - No dependencies on other AMFE crates
//! - Only external dependencies allowed
//! - Pure domain models and data structures

pub mod config;
pub mod constants;
pub mod errors;
pub mod macros;
pub mod types;

// Re-export commonly used items
pub use config::*;
pub use errors::*;
pub use types::*;
