//! Health check endpoints
//!
//! `/health` is process liveness with report store pool stats;
//! `/api/doctor/health` reports evidence source readiness.

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;
use tracing::warn;

use crate::services::SourceStatus;
use crate::AppState;

/// Report store pool statistics
#[derive(Debug, Serialize)]
pub struct DatabaseHealth {
    pub reachable: bool,
    pub pool_size: u32,
    pub idle_connections: usize,
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "ok" or "degraded"
    pub status: String,
    pub module: String,
    pub version: String,
    /// Seconds since service started
    pub uptime_seconds: u64,
    pub database: DatabaseHealth,
    /// Last error message if any (for diagnostics)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

/// GET /health
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime = Utc::now().signed_duration_since(state.startup_time);
    let uptime_seconds = uptime.num_seconds().max(0) as u64;

    let reachable = match sqlx::query("SELECT 1").execute(&state.db).await {
        Ok(_) => true,
        Err(e) => {
            warn!(error = %e, "Report store health probe failed");
            false
        }
    };

    let last_error = state.last_error.read().await.clone();

    Json(HealthResponse {
        status: if reachable { "ok" } else { "degraded" }.to_string(),
        module: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds,
        database: DatabaseHealth {
            reachable,
            pool_size: state.db.size(),
            idle_connections: state.db.num_idle(),
        },
        last_error,
    })
}

/// Registry reachability
#[derive(Debug, Serialize)]
pub struct RegistryHealth {
    pub configured: bool,
    pub reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Evidence source readiness response
#[derive(Debug, Serialize)]
pub struct SourcesHealthResponse {
    /// "healthy" when the registry answers, else "degraded"
    pub status: String,
    pub registry: RegistryHealth,
    pub places_enabled: bool,
    pub sources: Vec<SourceStatus>,
    pub git_hash: String,
}

/// GET /api/doctor/health
pub async fn sources_health(State(state): State<AppState>) -> Json<SourcesHealthResponse> {
    let registry = match &state.registry {
        Some(registry) => match registry.probe().await {
            Ok(()) => RegistryHealth {
                configured: true,
                reachable: true,
                error: None,
            },
            Err(e) => {
                warn!(error = %e, "Registry readiness probe failed");
                RegistryHealth {
                    configured: true,
                    reachable: false,
                    error: Some(e.to_string()),
                }
            }
        },
        None => RegistryHealth {
            configured: false,
            reachable: false,
            error: None,
        },
    };

    Json(SourcesHealthResponse {
        status: if registry.reachable { "healthy" } else { "degraded" }.to_string(),
        registry,
        places_enabled: state.places_enabled,
        sources: state.gatherer.sources(),
        git_hash: env!("GIT_HASH").to_string(),
    })
}

/// Build health check routes
pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/api/doctor/health", get(sources_health))
}
