//! Maps-style places lookup
//!
//! Two requests: a text search to find the practice, then a details lookup
//! on the first hit for address, phone, rating and review count. Disabled
//! (not failed) when no API key is configured.

use super::evidence_gatherer::{EvidenceSource, SourceError};
use crate::models::evidence::non_blank;
use crate::models::{EvidenceFragment, PracticeLocation, Provenance};
use dvs_common::config::SourcesConfig;
use serde::Deserialize;
use tracing::{debug, info};

const DETAIL_FIELDS: &str = "name,formatted_address,formatted_phone_number,rating,user_ratings_total";

#[derive(Debug, Deserialize)]
struct TextSearchResponse {
    status: String,
    #[serde(default)]
    results: Vec<TextSearchHit>,
}

#[derive(Debug, Deserialize)]
struct TextSearchHit {
    place_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DetailsResponse {
    status: String,
    result: Option<PlaceDetails>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PlaceDetails {
    pub name: Option<String>,
    pub formatted_address: Option<String>,
    pub formatted_phone_number: Option<String>,
    pub rating: Option<f64>,
    pub user_ratings_total: Option<u32>,
}

impl From<PlaceDetails> for EvidenceFragment {
    fn from(details: PlaceDetails) -> Self {
        let address = non_blank(details.formatted_address.as_deref());
        let phone = non_blank(details.formatted_phone_number.as_deref());

        let practice_location = address.as_ref().map(|address| PracticeLocation {
            name: non_blank(details.name.as_deref()),
            address: Some(address.clone()),
            phone: phone.clone(),
        });

        EvidenceFragment {
            address,
            phone,
            rating: details.rating,
            review_count: details.user_ratings_total,
            practice_location,
            ..Default::default()
        }
    }
}

/// Places-backed evidence source
pub struct PlacesSource {
    http_client: reqwest::Client,
    api_key: Option<String>,
    text_search_url: String,
    details_url: String,
}

impl PlacesSource {
    pub fn new(config: &SourcesConfig) -> Result<Self, SourceError> {
        let http_client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| SourceError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key: config.places_api_key.clone(),
            text_search_url: config.places_text_search_url.clone(),
            details_url: config.places_details_url.clone(),
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.api_key.is_some()
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, &str)],
    ) -> Result<T, SourceError> {
        let response = self.http_client.get(url).query(params).send().await?;
        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(SourceError::Api(status.as_u16(), error_text));
        }
        response
            .json()
            .await
            .map_err(|e| SourceError::Parse(e.to_string()))
    }
}

#[async_trait::async_trait]
impl EvidenceSource for PlacesSource {
    fn name(&self) -> &'static str {
        "Places"
    }

    fn provenance(&self) -> Provenance {
        Provenance::Places
    }

    async fn fetch(&self, name: &str, specialty: &str) -> Result<EvidenceFragment, SourceError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(SourceError::NotAvailable("no places API key configured".to_string()));
        };

        let query = format!("Dr {} {}", name, specialty).trim().to_string();
        let search: TextSearchResponse = self
            .get_json(
                &self.text_search_url,
                &[("query", query.as_str()), ("key", api_key), ("type", "doctor")],
            )
            .await?;

        // ZERO_RESULTS is an empty answer, not an error
        if search.status == "ZERO_RESULTS" {
            debug!(query = %query, "Places search returned no results");
            return Ok(EvidenceFragment::default());
        }
        if search.status != "OK" {
            return Err(SourceError::Api(200, search.status));
        }

        let Some(place_id) = search.results.into_iter().find_map(|hit| hit.place_id) else {
            debug!(query = %query, "Places search returned no place id");
            return Ok(EvidenceFragment::default());
        };

        let details: DetailsResponse = self
            .get_json(
                &self.details_url,
                &[("place_id", place_id.as_str()), ("key", api_key), ("fields", DETAIL_FIELDS)],
            )
            .await?;

        if details.status != "OK" {
            return Err(SourceError::Api(200, details.status));
        }

        let details = details.result.unwrap_or_default();
        info!(
            rating = ?details.rating,
            reviews = ?details.user_ratings_total,
            "Places details retrieved"
        );

        Ok(EvidenceFragment::from(details))
    }
}
