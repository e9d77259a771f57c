//! Service banner

use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct Endpoint {
    pub method: &'static str,
    pub path: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Serialize)]
pub struct IndexResponse {
    pub service: &'static str,
    pub version: &'static str,
    pub build_timestamp: &'static str,
    pub build_profile: &'static str,
    pub endpoints: Vec<Endpoint>,
}

const ENDPOINTS: &[(&str, &str, &str)] = &[
    ("GET", "/health", "Service liveness"),
    ("POST", "/api/doctor/verify", "Verify a provider's claimed identity"),
    ("POST", "/api/doctor/search", "Search provider sources without verifying"),
    ("GET", "/api/doctor/specialties", "Known medical specialties"),
    ("GET", "/api/doctor/insurance-networks", "Known insurance networks"),
    ("POST", "/api/doctor/extract-pdf", "Extract claimed fields from a document"),
    ("GET", "/api/doctor/health", "Evidence source readiness"),
    ("GET", "/api/doctor/reports", "List stored verification reports"),
    ("GET", "/api/doctor/reports/:verification_id", "Fetch one stored report"),
];

/// GET /
pub async fn index() -> Json<IndexResponse> {
    Json(IndexResponse {
        service: "Doctor Verification Service",
        version: env!("CARGO_PKG_VERSION"),
        build_timestamp: env!("BUILD_TIMESTAMP"),
        build_profile: env!("BUILD_PROFILE"),
        endpoints: ENDPOINTS
            .iter()
            .map(|&(method, path, description)| Endpoint {
                method,
                path,
                description,
            })
            .collect(),
    })
}

pub fn index_routes() -> Router<AppState> {
    Router::new().route("/", get(index))
}
