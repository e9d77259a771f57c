//! dvs-verify library interface
//!
//! Medical-provider identity verification: claimed attributes are checked
//! field by field against evidence gathered from public provider sources,
//! and every result is stored as a report.

pub mod api;
pub mod db;
pub mod error;
pub mod models;
pub mod reconcile;
pub mod services;
pub mod utils;

pub use crate::error::{ApiError, ApiResult};

use axum::http::HeaderValue;
use axum::Router;
use chrono::{DateTime, Utc};
use dvs_common::config::{CorsConfig, MatchingConfig};
use services::{EvidenceGatherer, RegistrySource};
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Default upload limit for document extraction (10 MiB)
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Report store connection pool
    pub db: SqlitePool,
    /// Concurrent evidence lookups across all enabled sources
    pub gatherer: Arc<EvidenceGatherer>,
    /// Registry client for the readiness probe (absent in tests)
    pub registry: Option<Arc<RegistrySource>>,
    /// Whether the places source has credentials
    pub places_enabled: bool,
    /// Matching thresholds and weights
    pub matching: Arc<MatchingConfig>,
    /// Document upload size limit
    pub max_upload_bytes: usize,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
    /// Last error for diagnostic purposes
    pub last_error: Arc<RwLock<Option<String>>>,
}

impl AppState {
    pub fn new(db: SqlitePool, gatherer: EvidenceGatherer, matching: MatchingConfig) -> Self {
        Self {
            db,
            gatherer: Arc::new(gatherer),
            registry: None,
            places_enabled: false,
            matching: Arc::new(matching),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            startup_time: Utc::now(),
            last_error: Arc::new(RwLock::new(None)),
        }
    }

    /// Attach the registry client used by the readiness endpoint
    pub fn with_registry(mut self, registry: Arc<RegistrySource>, places_enabled: bool) -> Self {
        self.registry = Some(registry);
        self.places_enabled = places_enabled;
        self
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    /// Remember an error for `/health`
    pub async fn record_error(&self, message: impl Into<String>) {
        *self.last_error.write().await = Some(message.into());
    }
}

/// Build application router
pub fn build_router(state: AppState, cors: &CorsConfig) -> Router {
    let max_upload_bytes = state.max_upload_bytes;

    Router::new()
        .merge(api::index_routes())
        .merge(api::health_routes())
        .merge(api::verify_routes())
        .merge(api::search_routes())
        .merge(api::catalog_routes())
        .merge(api::report_routes())
        .merge(api::extract_routes(max_upload_bytes))
        .with_state(state)
        .layer(cors_layer(cors))
        .layer(TraceLayer::new_for_http())
}

/// CORS for the configured origins; any method and header
fn cors_layer(cors: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = cors
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any)
}
