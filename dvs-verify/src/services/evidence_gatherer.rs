//! Evidence gathering
//!
//! Runs every enabled [`EvidenceSource`] concurrently for one lookup and
//! merges their fragments into a single [`ExternalEvidence`] bag. A source
//! that fails or times out contributes nothing; it never fails the caller.

use crate::models::{EvidenceFragment, ExternalEvidence, Provenance};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Evidence source errors
#[derive(Debug, Error)]
pub enum SourceError {
    /// Network communication error
    #[error("Network error: {0}")]
    Network(String),

    /// Upstream answered with a non-success status
    #[error("API error {0}: {1}")]
    Api(u16, String),

    /// Response body could not be understood
    #[error("Parse error: {0}")]
    Parse(String),

    /// Source is not configured (e.g. missing API key)
    #[error("Source not available: {0}")]
    NotAvailable(String),

    /// Lookup exceeded the configured timeout
    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            SourceError::Parse(err.to_string())
        } else {
            SourceError::Network(err.to_string())
        }
    }
}

/// One external provider-data source
///
/// Implementations convert whatever the upstream returns into a typed
/// [`EvidenceFragment`] so nothing downstream handles raw responses.
#[async_trait::async_trait]
pub trait EvidenceSource: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &'static str;

    /// Provenance label attached to everything this source contributes
    fn provenance(&self) -> Provenance;

    /// Look up a provider by name and (possibly blank) specialty
    async fn fetch(&self, name: &str, specialty: &str) -> Result<EvidenceFragment, SourceError>;
}

/// Readiness of one configured source
#[derive(Debug, Clone, serde::Serialize)]
pub struct SourceStatus {
    pub name: &'static str,
    pub provenance: Provenance,
}

/// Concurrent, timeout-bounded fan-out over the configured sources
pub struct EvidenceGatherer {
    sources: Vec<Arc<dyn EvidenceSource>>,
    timeout: Duration,
}

impl EvidenceGatherer {
    pub fn new(sources: Vec<Arc<dyn EvidenceSource>>, timeout: Duration) -> Self {
        Self { sources, timeout }
    }

    /// Configured sources in merge order
    pub fn sources(&self) -> Vec<SourceStatus> {
        let mut statuses: Vec<SourceStatus> = self
            .sources
            .iter()
            .map(|s| SourceStatus {
                name: s.name(),
                provenance: s.provenance(),
            })
            .collect();
        statuses.sort_by_key(|s| merge_rank(s.provenance));
        statuses
    }

    /// Gather evidence from every source
    ///
    /// Fragments are merged in [`Provenance::MERGE_ORDER`] regardless of
    /// completion order.
    pub async fn gather(&self, name: &str, specialty: &str) -> ExternalEvidence {
        let started = Instant::now();

        let lookups = self.sources.iter().map(|source| {
            let source = Arc::clone(source);
            let timeout = self.timeout;
            async move {
                let result = match tokio::time::timeout(timeout, source.fetch(name, specialty)).await {
                    Ok(result) => result,
                    Err(_) => Err(SourceError::Timeout(timeout)),
                };
                (source.name(), source.provenance(), result)
            }
        });

        let mut results = futures::future::join_all(lookups).await;
        results.sort_by_key(|(_, provenance, _)| merge_rank(*provenance));

        let mut evidence = ExternalEvidence::new();
        for (source_name, provenance, result) in results {
            match result {
                Ok(fragment) => {
                    debug!(
                        source = source_name,
                        candidates = fragment.candidates.len(),
                        empty = fragment.is_empty(),
                        "Source lookup complete"
                    );
                    evidence.absorb(provenance, fragment);
                }
                Err(SourceError::NotAvailable(reason)) => {
                    debug!(source = source_name, reason = %reason, "Source skipped");
                }
                Err(e) => {
                    warn!(source = source_name, error = %e, "Source lookup failed, continuing without it");
                }
            }
        }

        info!(
            candidates = evidence.candidates.len(),
            sources = ?evidence.sources,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Evidence gathered"
        );

        evidence
    }
}

fn merge_rank(provenance: Provenance) -> usize {
    Provenance::MERGE_ORDER
        .iter()
        .position(|p| *p == provenance)
        .unwrap_or(Provenance::MERGE_ORDER.len())
}
