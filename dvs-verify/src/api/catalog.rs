//! Reference catalog endpoints

use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::services::catalog::{INSURANCE_NETWORKS, SPECIALTIES};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct SpecialtiesResponse {
    pub specialties: &'static [&'static str],
}

#[derive(Debug, Serialize)]
pub struct NetworksResponse {
    pub networks: &'static [&'static str],
}

/// GET /api/doctor/specialties
pub async fn get_specialties() -> Json<SpecialtiesResponse> {
    Json(SpecialtiesResponse {
        specialties: SPECIALTIES,
    })
}

/// GET /api/doctor/insurance-networks
pub async fn get_insurance_networks() -> Json<NetworksResponse> {
    Json(NetworksResponse {
        networks: INSURANCE_NETWORKS,
    })
}

/// Build catalog routes
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/api/doctor/specialties", get(get_specialties))
        .route("/api/doctor/insurance-networks", get(get_insurance_networks))
}
