//! AMFE analyses and their record tree
//!
//! [`AmfeService`] wraps four [`RecordTable`](ports::RecordTable) ports, one
//! per table, and assembles whole analyses from them.

pub mod ports;
pub mod service;

pub use ports::RecordTable;
pub use service::{AmfeService, AmfeTables};
