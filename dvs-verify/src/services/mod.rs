//! Collaborator services: evidence sources, document extraction, catalogs

pub mod catalog;
pub mod directories;
pub mod document_extractor;
pub mod evidence_gatherer;
pub mod npi_registry;
pub mod places;

pub use directories::DirectorySource;
pub use document_extractor::{extract_fields, ExtractedFields, ExtractionError};
pub use evidence_gatherer::{EvidenceGatherer, EvidenceSource, SourceError, SourceStatus};
pub use npi_registry::RegistrySource;
pub use places::PlacesSource;

use dvs_common::config::SourcesConfig;
use std::sync::Arc;
use tracing::info;

/// Handles to the configured sources
pub struct ConfiguredSources {
    pub gatherer: EvidenceGatherer,
    pub registry: Arc<RegistrySource>,
    pub places_enabled: bool,
}

/// Build every enabled evidence source from configuration
pub fn build_sources(config: &SourcesConfig) -> Result<ConfiguredSources, SourceError> {
    let registry = Arc::new(RegistrySource::new(config)?);
    let mut sources: Vec<Arc<dyn EvidenceSource>> = vec![registry.clone()];

    if config.directories_enabled {
        sources.push(Arc::new(DirectorySource::new(config)?));
    }

    let places = PlacesSource::new(config)?;
    let places_enabled = places.is_enabled();
    if places_enabled {
        sources.push(Arc::new(places));
    }

    info!(
        directories = config.directories_enabled,
        places = places_enabled,
        "Evidence sources configured"
    );

    // Directories and Places each issue two sequential requests
    let source_timeout = config.request_timeout() * 2;

    Ok(ConfiguredSources {
        gatherer: EvidenceGatherer::new(sources, source_timeout),
        registry,
        places_enabled,
    })
}
