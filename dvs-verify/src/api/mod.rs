//! HTTP API handlers for dvs-verify

pub mod catalog;
pub mod extract;
pub mod health;
pub mod index;
pub mod json;
pub mod reports;
pub mod search;
pub mod verify;

pub use catalog::catalog_routes;
pub use extract::extract_routes;
pub use health::health_routes;
pub use index::index_routes;
pub use json::ApiJson;
pub use reports::report_routes;
pub use search::search_routes;
pub use verify::verify_routes;
