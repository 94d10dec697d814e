//! Run reporting.

pub mod log;

pub use log::{create_shared_log, RunLog, RunStats, SharedRunLog};
