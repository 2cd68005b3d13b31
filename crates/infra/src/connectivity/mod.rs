//! Connectivity signals from the network

pub mod monitor;

pub use monitor::ConnectivityMonitor;
