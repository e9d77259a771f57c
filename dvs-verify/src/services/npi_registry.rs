//! National provider registry client
//!
//! Queries the registry's JSON API (version 2.1) by first/last name and
//! taxonomy description, and converts each result into a typed
//! [`ProviderRecord`]. Results that do not deserialize are skipped one by
//! one; the rest of the response is still used.

use super::evidence_gatherer::{EvidenceSource, SourceError};
use crate::models::{
    AddressEntry, EvidenceFragment, PayerIdentifier, Provenance, ProviderRecord, Taxonomy,
};
use dvs_common::config::SourcesConfig;
use serde::Deserialize;
use tracing::{debug, info, warn};

const API_VERSION: &str = "2.1";

/// Tokens dropped before splitting a name into first/last
const NAME_PREFIXES: &[&str] = &["dr", "dr.", "doctor", "mr", "mr.", "mrs", "mrs.", "ms", "ms."];
const NAME_SUFFIXES: &[&str] = &["md", "m.d.", "do", "d.o.", "phd", "ph.d.", "jr", "jr.", "sr", "sr."];

// ============================================================================
// Wire format
// ============================================================================

#[derive(Debug, Deserialize)]
struct RegistryResponse {
    #[serde(default)]
    results: Vec<serde_json::Value>,
    #[serde(rename = "Errors", default)]
    errors: Vec<RegistryApiError>,
}

#[derive(Debug, Deserialize)]
struct RegistryApiError {
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct RegistryResult {
    number: Option<serde_json::Value>,
    #[serde(default)]
    basic: RegistryBasic,
    #[serde(default)]
    taxonomies: Vec<RegistryTaxonomy>,
    #[serde(default)]
    addresses: Vec<RegistryAddress>,
    #[serde(rename = "practiceLocations", default)]
    practice_locations: Vec<RegistryAddress>,
    #[serde(default)]
    identifiers: Vec<RegistryIdentifier>,
}

#[derive(Debug, Default, Deserialize)]
struct RegistryBasic {
    first_name: Option<String>,
    middle_name: Option<String>,
    last_name: Option<String>,
    organization_name: Option<String>,
    credential: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RegistryTaxonomy {
    code: Option<String>,
    desc: Option<String>,
    license: Option<String>,
    state: Option<String>,
    #[serde(default)]
    primary: bool,
}

#[derive(Debug, Deserialize)]
struct RegistryAddress {
    address_1: Option<String>,
    address_2: Option<String>,
    city: Option<String>,
    state: Option<String>,
    postal_code: Option<String>,
    telephone_number: Option<String>,
    address_purpose: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RegistryIdentifier {
    desc: Option<String>,
    issuer: Option<String>,
    identifier: Option<String>,
}

impl From<RegistryAddress> for AddressEntry {
    fn from(a: RegistryAddress) -> Self {
        AddressEntry {
            line1: a.address_1,
            line2: a.address_2,
            city: a.city,
            state: a.state,
            postal_code: a.postal_code,
            telephone: a.telephone_number,
            purpose: a.address_purpose,
        }
    }
}

impl From<RegistryResult> for ProviderRecord {
    fn from(r: RegistryResult) -> Self {
        let npi = r.number.and_then(|n| match n {
            serde_json::Value::String(s) => Some(s),
            serde_json::Value::Number(n) => Some(n.to_string()),
            _ => None,
        });

        ProviderRecord {
            npi,
            first_name: r.basic.first_name,
            middle_name: r.basic.middle_name,
            last_name: r.basic.last_name,
            organization_name: r.basic.organization_name,
            credential: r.basic.credential,
            taxonomies: r
                .taxonomies
                .into_iter()
                .map(|t| Taxonomy {
                    code: t.code,
                    description: t.desc,
                    license: t.license,
                    state: t.state,
                    primary: t.primary,
                })
                .collect(),
            addresses: r.addresses.into_iter().map(AddressEntry::from).collect(),
            practice_locations: r.practice_locations.into_iter().map(AddressEntry::from).collect(),
            identifiers: r
                .identifiers
                .into_iter()
                .map(|i| PayerIdentifier {
                    description: i.desc,
                    issuer: i.issuer,
                    identifier: i.identifier,
                })
                .collect(),
        }
    }
}

/// Convert a registry response body into provider records
pub fn parse_registry_response(body: serde_json::Value) -> Result<Vec<ProviderRecord>, SourceError> {
    let response: RegistryResponse =
        serde_json::from_value(body).map_err(|e| SourceError::Parse(e.to_string()))?;

    if let Some(first) = response.errors.first() {
        return Err(SourceError::Api(200, first.description.clone()));
    }

    let mut records = Vec::with_capacity(response.results.len());
    for (index, raw) in response.results.into_iter().enumerate() {
        match serde_json::from_value::<RegistryResult>(raw) {
            Ok(result) => records.push(ProviderRecord::from(result)),
            Err(e) => warn!(index, error = %e, "Skipping malformed registry result"),
        }
    }

    Ok(records)
}

/// Split a claimed name into registry `(first, last)` search terms
///
/// `"Last, First"` is honored; otherwise the first and last remaining
/// tokens are used after dropping titles, suffixes and initials.
pub fn split_name(name: &str) -> (String, String) {
    if let Some((last, first)) = name.split_once(',') {
        let first = first.split_whitespace().next().unwrap_or("").to_string();
        return (first, last.trim().to_string());
    }

    let tokens: Vec<&str> = name
        .split_whitespace()
        .filter(|t| {
            let lower = t.to_lowercase();
            !NAME_PREFIXES.contains(&lower.as_str())
                && !NAME_SUFFIXES.contains(&lower.as_str())
                && t.trim_end_matches('.').chars().count() > 1
        })
        .collect();

    match tokens.as_slice() {
        [] => (String::new(), String::new()),
        [only] => (only.to_string(), String::new()),
        [first, .., last] => (first.to_string(), last.to_string()),
    }
}

// ============================================================================
// Source
// ============================================================================

/// Registry-backed evidence source
pub struct RegistrySource {
    http_client: reqwest::Client,
    base_url: String,
    limit: u32,
}

impl RegistrySource {
    pub fn new(config: &SourcesConfig) -> Result<Self, SourceError> {
        let http_client = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| SourceError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: config.registry_url.clone(),
            limit: config.registry_limit,
        })
    }

    /// Cheap reachability probe used by the readiness endpoint
    pub async fn probe(&self) -> Result<(), SourceError> {
        let response = self
            .http_client
            .get(&self.base_url)
            .query(&[("version", API_VERSION), ("number", "1234567893")])
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(SourceError::Api(response.status().as_u16(), "probe failed".to_string()))
        }
    }
}

#[async_trait::async_trait]
impl EvidenceSource for RegistrySource {
    fn name(&self) -> &'static str {
        "Registry"
    }

    fn provenance(&self) -> Provenance {
        Provenance::Registry
    }

    async fn fetch(&self, name: &str, specialty: &str) -> Result<EvidenceFragment, SourceError> {
        let (first_name, last_name) = split_name(name);
        if first_name.is_empty() && last_name.is_empty() {
            return Ok(EvidenceFragment::default());
        }

        let mut params: Vec<(&str, String)> = vec![
            ("version", API_VERSION.to_string()),
            ("first_name", first_name.clone()),
            ("last_name", last_name.clone()),
            ("limit", self.limit.to_string()),
        ];
        if !specialty.trim().is_empty() {
            params.push(("taxonomy_description", specialty.trim().to_string()));
        }

        debug!(first_name = %first_name, last_name = %last_name, "Querying provider registry");

        let response = self.http_client.get(&self.base_url).query(&params).send().await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(SourceError::Api(status.as_u16(), error_text));
        }

        let body: serde_json::Value = response.json().await?;
        let candidates = parse_registry_response(body)?;

        info!(
            first_name = %first_name,
            last_name = %last_name,
            results = candidates.len(),
            "Registry lookup complete"
        );

        Ok(EvidenceFragment {
            candidates,
            ..Default::default()
        })
    }
}
