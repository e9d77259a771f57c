//! Report store access for dvs-verify
//!
//! Schema creation lives in `dvs_common::db`; this module owns the queries.

pub mod reports;

pub use reports::{get_report, insert_report, list_reports};
