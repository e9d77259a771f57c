//! Verification endpoint
//!
//! Validate the claimed identity, gather evidence, reconcile, store.

use axum::{extract::State, routing::post, Json, Router};
use tracing::{error, info, warn};

use crate::db::insert_report;
use crate::error::{ApiError, ApiResult};
use crate::models::{ClaimedIdentity, VerificationReport, VerificationRequest};
use crate::reconcile::reconcile;
use crate::AppState;

use super::ApiJson;

/// POST /api/doctor/verify
pub async fn verify_doctor(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<VerificationRequest>,
) -> ApiResult<Json<VerificationReport>> {
    let claimed = ClaimedIdentity::try_from(request).map_err(|e| {
        warn!(field = e.field, constraint = %e.constraint, "Rejected verification request");
        ApiError::from(e)
    })?;

    info!(full_name = %claimed.full_name, specialty = %claimed.specialty, "Starting verification");

    let evidence = state
        .gatherer
        .gather(&claimed.full_name, &claimed.specialty)
        .await;
    let report = reconcile(&claimed, &evidence, &state.matching);

    if let Err(e) = insert_report(&state.db, &report).await {
        error!(verification_id = %report.verification_id, error = %e, "Failed to store report");
        state
            .record_error(format!("Report {} not stored: {}", report.verification_id, e))
            .await;
        return Err(ApiError::not_persisted(e, report));
    }

    info!(
        verification_id = %report.verification_id,
        sources = evidence.sources.len(),
        "Verification completed"
    );

    Ok(Json(report))
}

/// Build verification routes
pub fn verify_routes() -> Router<AppState> {
    Router::new().route("/api/doctor/verify", post(verify_doctor))
}
