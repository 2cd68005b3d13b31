//! In-memory caching primitives
//!
//! - [`TtlCell`]: one value with a time-to-live and explicit invalidation.
//!   Expiry is measured through the injected [`crate::resilience::Clock`] so
//!   tests control time.

pub mod ttl;

pub use ttl::TtlCell;
