//! Utility modules for dvs-verify

pub mod pool_monitor;

pub use pool_monitor::{begin_monitored, MonitoredTransaction};
