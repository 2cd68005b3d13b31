//! Connectivity state
//!
//! [`OnlineDetector`] holds the current reachability flag. Platform signals
//! (or the infra connectivity monitor) push transitions in through
//! [`OnlineDetector::set_online`]; consumers read it, wait on it, or subscribe
//! to transitions.

pub mod detector;

pub use detector::{OnlineDetector, OnlineSubscription};
