//! Evidence search endpoint
//!
//! Gathers evidence for a name without reconciling it against anything and
//! returns the candidates in a flattened, display-ready form.

use axum::{extract::State, routing::post, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::models::{non_blank, AddressEntry, ExternalEvidence, Provenance, ProviderRecord};
use crate::reconcile::generate_search_id;
use crate::AppState;

use super::ApiJson;

/// Search request body
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchRequest {
    pub name: String,
    #[serde(default)]
    pub specialty: Option<String>,
}

/// One registry candidate, flattened
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CandidateResult {
    pub npi: Option<String>,
    pub name: Option<String>,
    pub specialties: Vec<String>,
    pub locations: Vec<String>,
    pub credential: Option<String>,
    pub source: Provenance,
}

/// Rated place listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlaceResult {
    pub name: String,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub rating: f64,
    pub reviews: u32,
    pub source: Provenance,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SearchResult {
    Candidate(CandidateResult),
    Place(PlaceResult),
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub search_id: String,
    pub timestamp: DateTime<Utc>,
    pub query: SearchRequest,
    pub results: Vec<SearchResult>,
    pub total_found: usize,
    pub sources_used: Vec<Provenance>,
}

impl From<&ProviderRecord> for CandidateResult {
    fn from(record: &ProviderRecord) -> Self {
        CandidateResult {
            npi: record.npi.clone(),
            name: record.display_name(),
            specialties: record.taxonomy_descriptions().map(str::to_string).collect(),
            locations: record
                .addresses
                .iter()
                .filter(|address| address.is_location())
                .chain(record.practice_locations.iter())
                .filter_map(AddressEntry::formatted)
                .collect(),
            credential: record.credential.clone(),
            source: Provenance::Registry,
        }
    }
}

/// Flatten gathered evidence into search results
///
/// One entry per candidate record, plus one place entry when a rating was
/// observed.
pub fn flatten_results(searched_name: &str, evidence: &ExternalEvidence) -> Vec<SearchResult> {
    let mut results: Vec<SearchResult> = evidence
        .candidates
        .iter()
        .map(|record| SearchResult::Candidate(record.into()))
        .collect();

    if let Some(rating) = &evidence.loose.rating {
        results.push(SearchResult::Place(PlaceResult {
            name: searched_name.to_string(),
            address: evidence.loose.address.as_ref().map(|a| a.value.clone()),
            phone: evidence.loose.phone.as_ref().map(|p| p.value.clone()),
            rating: rating.value,
            reviews: evidence.loose.review_count.unwrap_or(0),
            source: rating.from,
        }));
    }

    results
}

/// POST /api/doctor/search
pub async fn search_doctor(
    State(state): State<AppState>,
    ApiJson(request): ApiJson<SearchRequest>,
) -> ApiResult<Json<SearchResponse>> {
    let name = non_blank(Some(request.name.as_str()))
        .ok_or_else(|| ApiError::BadRequest("name must not be empty".to_string()))?;
    let specialty = non_blank(request.specialty.as_deref()).unwrap_or_default();

    info!(name = %name, specialty = %specialty, "Starting search");

    let timestamp = Utc::now();
    let evidence = state.gatherer.gather(&name, &specialty).await;
    let results = flatten_results(&name, &evidence);

    info!(name = %name, found = results.len(), "Search completed");

    Ok(Json(SearchResponse {
        search_id: generate_search_id(&name, timestamp),
        timestamp,
        query: request,
        total_found: results.len(),
        results,
        sources_used: evidence.sources,
    }))
}

/// Build search routes
pub fn search_routes() -> Router<AppState> {
    Router::new().route("/api/doctor/search", post(search_doctor))
}
