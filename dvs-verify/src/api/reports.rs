//! Stored report browsing

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use tracing::debug;

use crate::db::{get_report, list_reports};
use crate::error::{ApiError, ApiResult};
use crate::models::{ReportPage, ReportQuery, StoredReport};
use crate::AppState;

/// GET /api/doctor/reports
///
/// Query: `name`, `specialty`, `sort_by`, `sort_order`, `skip`, `limit`.
pub async fn list_doctor_reports(
    State(state): State<AppState>,
    Query(query): Query<ReportQuery>,
) -> ApiResult<Json<ReportPage>> {
    debug!(?query, "Listing reports");
    let page = list_reports(&state.db, &query).await?;
    Ok(Json(page))
}

/// GET /api/doctor/reports/:verification_id
pub async fn get_doctor_report(
    State(state): State<AppState>,
    Path(verification_id): Path<String>,
) -> ApiResult<Json<StoredReport>> {
    get_report(&state.db, &verification_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Report {} not found", verification_id)))
}

/// Build report routes
pub fn report_routes() -> Router<AppState> {
    Router::new()
        .route("/api/doctor/reports", get(list_doctor_reports))
        .route("/api/doctor/reports/:verification_id", get(get_doctor_report))
}
