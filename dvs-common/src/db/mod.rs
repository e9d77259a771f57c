//! Report store initialization

pub mod init;

pub use init::{connect_pool, create_tables, init_database};
