//! # DVS Common Library
//!
//! Shared code for the doctor verification service including:
//! - Error and result types
//! - Configuration loading (CLI → ENV → TOML → compiled defaults)
//! - Report store initialization and schema
//! - Timestamp helpers

pub mod config;
pub mod db;
pub mod error;
pub mod time;

pub use error::{Error, Result};
