//! External evidence model
//!
//! Every source converts its response into an [`EvidenceFragment`] once, at
//! the gathering boundary. The gatherer merges fragments into one
//! [`ExternalEvidence`] bag, so verifiers never deal with raw JSON or HTML.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Purpose label for practice (as opposed to mailing) addresses
pub const LOCATION_PURPOSE: &str = "LOCATION";

// ============================================================================
// Provenance
// ============================================================================

/// Labeled origin of an observed value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provenance {
    /// National provider registry
    Registry,
    /// Public provider directory pages
    Directories,
    /// Maps-style places lookup
    Places,
}

impl Provenance {
    /// Merge order used by the gatherer (later entries refine earlier ones)
    pub const MERGE_ORDER: [Provenance; 3] =
        [Provenance::Registry, Provenance::Directories, Provenance::Places];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provenance::Registry => "Registry",
            Provenance::Directories => "Directories",
            Provenance::Places => "Places",
        }
    }

    /// Parse a stored label; unknown labels yield `None`
    pub fn parse(label: &str) -> Option<Self> {
        match label {
            "Registry" => Some(Provenance::Registry),
            "Directories" => Some(Provenance::Directories),
            "Places" => Some(Provenance::Places),
            _ => None,
        }
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A value together with the source it came from
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sourced<T> {
    pub value: T,
    pub from: Provenance,
}

impl<T> Sourced<T> {
    pub fn new(value: T, from: Provenance) -> Self {
        Self { value, from }
    }
}

// ============================================================================
// Candidate provider records
// ============================================================================

/// Taxonomy (specialty) entry on a provider record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Taxonomy {
    pub code: Option<String>,
    pub description: Option<String>,
    pub license: Option<String>,
    pub state: Option<String>,
    pub primary: bool,
}

/// Address entry on a provider record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AddressEntry {
    pub line1: Option<String>,
    pub line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postal_code: Option<String>,
    pub telephone: Option<String>,
    pub purpose: Option<String>,
}

impl AddressEntry {
    pub fn is_location(&self) -> bool {
        self.purpose.as_deref() == Some(LOCATION_PURPOSE)
    }

    /// Render as `"{line1} {line2}, {city}, {state} {postal}"`
    ///
    /// The locality tail is omitted when city, state and postal code are all
    /// missing. Returns `None` if nothing at all is present.
    pub fn formatted(&self) -> Option<String> {
        let part = |v: &Option<String>| v.as_deref().map(str::trim).unwrap_or("").to_string();

        let street = format!("{} {}", part(&self.line1), part(&self.line2))
            .trim()
            .to_string();
        let (city, state, postal) = (part(&self.city), part(&self.state), part(&self.postal_code));

        let mut formatted = street;
        if !city.is_empty() || !state.is_empty() || !postal.is_empty() {
            formatted.push_str(format!(", {}, {} {}", city, state, postal).trim_end());
        }

        let formatted = formatted.trim().to_string();
        if formatted.is_empty() || formatted.chars().all(|c| c == ',' || c.is_whitespace()) {
            None
        } else {
            Some(formatted)
        }
    }
}

/// Payer identifier entry (used to infer insurance networks)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PayerIdentifier {
    pub description: Option<String>,
    pub issuer: Option<String>,
    pub identifier: Option<String>,
}

/// One externally observed provider record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderRecord {
    pub npi: Option<String>,
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub organization_name: Option<String>,
    pub credential: Option<String>,
    pub taxonomies: Vec<Taxonomy>,
    pub addresses: Vec<AddressEntry>,
    pub practice_locations: Vec<AddressEntry>,
    pub identifiers: Vec<PayerIdentifier>,
}

impl ProviderRecord {
    /// Composed `"first last"` name, or the organization name for
    /// organizational records
    pub fn display_name(&self) -> Option<String> {
        let first = self.first_name.as_deref().unwrap_or("").trim();
        let last = self.last_name.as_deref().unwrap_or("").trim();
        let composed = format!("{} {}", first, last).trim().to_string();

        if !composed.is_empty() {
            return Some(composed);
        }

        non_blank(self.organization_name.as_deref())
    }

    /// A record without a name and without taxonomies cannot be matched
    pub fn is_matchable(&self) -> bool {
        self.display_name().is_some() || !self.taxonomies.is_empty()
    }

    /// Non-empty taxonomy descriptions in record order
    pub fn taxonomy_descriptions(&self) -> impl Iterator<Item = &str> {
        self.taxonomies
            .iter()
            .filter_map(|t| t.description.as_deref())
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }

    /// Address entries followed by practice locations
    pub fn all_addresses(&self) -> impl Iterator<Item = &AddressEntry> {
        self.addresses.iter().chain(self.practice_locations.iter())
    }
}

// ============================================================================
// Loose fields and merge
// ============================================================================

/// Practice location reported by a non-registry source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PracticeLocation {
    pub name: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
}

/// Top-level values contributed by non-registry sources
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LooseFields {
    pub name: Option<Sourced<String>>,
    pub specialty: Option<Sourced<String>>,
    pub address: Option<Sourced<String>>,
    pub phone: Option<Sourced<String>>,
    pub services: Option<Sourced<Vec<String>>>,
    pub rating: Option<Sourced<f64>>,
    pub review_count: Option<u32>,
    pub practice_location: Option<Sourced<PracticeLocation>>,
}

/// What a single source produced for one lookup
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvidenceFragment {
    pub candidates: Vec<ProviderRecord>,
    pub name: Option<String>,
    pub specialty: Option<String>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub services: Vec<String>,
    pub rating: Option<f64>,
    pub review_count: Option<u32>,
    pub practice_location: Option<PracticeLocation>,
}

impl EvidenceFragment {
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
            && non_blank(self.name.as_deref()).is_none()
            && non_blank(self.specialty.as_deref()).is_none()
            && non_blank(self.address.as_deref()).is_none()
            && non_blank(self.phone.as_deref()).is_none()
            && self.services.iter().all(|s| s.trim().is_empty())
            && self.rating.is_none()
            && self.practice_location.is_none()
    }
}

/// Aggregated evidence for one verification request
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ExternalEvidence {
    pub candidates: Vec<ProviderRecord>,
    pub loose: LooseFields,
    /// Sources that contributed at least one value, in merge order
    pub sources: Vec<Provenance>,
}

impl ExternalEvidence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge one source's fragment into the bag
    ///
    /// Candidates are appended. Scalar loose fields take the incoming
    /// non-blank value, so callers absorb fragments in
    /// [`Provenance::MERGE_ORDER`]. Services are concatenated without
    /// duplicates and keep the provenance of the first contributor.
    pub fn absorb(&mut self, from: Provenance, fragment: EvidenceFragment) {
        if fragment.is_empty() {
            return;
        }

        self.candidates.extend(fragment.candidates);

        let loose = &mut self.loose;
        replace_if_present(&mut loose.name, fragment.name, from);
        replace_if_present(&mut loose.specialty, fragment.specialty, from);
        replace_if_present(&mut loose.address, fragment.address, from);
        replace_if_present(&mut loose.phone, fragment.phone, from);

        let services: Vec<String> = fragment
            .services
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if !services.is_empty() {
            let merged = loose
                .services
                .get_or_insert_with(|| Sourced::new(Vec::new(), from));
            for service in services {
                if !merged.value.contains(&service) {
                    merged.value.push(service);
                }
            }
        }

        if let Some(rating) = fragment.rating {
            loose.rating = Some(Sourced::new(rating, from));
        }
        if fragment.review_count.is_some() {
            loose.review_count = fragment.review_count;
        }
        if let Some(location) = fragment.practice_location {
            loose.practice_location = Some(Sourced::new(location, from));
        }

        if !self.sources.contains(&from) {
            self.sources.push(from);
        }
    }
}

fn replace_if_present(slot: &mut Option<Sourced<String>>, value: Option<String>, from: Provenance) {
    if let Some(value) = non_blank(value.as_deref()) {
        *slot = Some(Sourced::new(value, from));
    }
}

/// Trimmed copy of `value`, or `None` when it is absent or blank
pub fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address(line1: &str, city: &str, state: &str, postal: &str) -> AddressEntry {
        AddressEntry {
            line1: Some(line1.to_string()),
            city: Some(city.to_string()),
            state: Some(state.to_string()),
            postal_code: Some(postal.to_string()),
            purpose: Some(LOCATION_PURPOSE.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_address_formatting() {
        let entry = address("100 Main Street", "Springfield", "IL", "62701");
        assert_eq!(
            entry.formatted().as_deref(),
            Some("100 Main Street, Springfield, IL 62701")
        );

        let street_only = AddressEntry {
            line1: Some("1 Elm St".to_string()),
            line2: Some("Suite 4".to_string()),
            ..Default::default()
        };
        assert_eq!(street_only.formatted().as_deref(), Some("1 Elm St Suite 4"));

        assert_eq!(AddressEntry::default().formatted(), None);
    }

    #[test]
    fn test_display_name_falls_back_to_organization() {
        let person = ProviderRecord {
            first_name: Some("JOHN".to_string()),
            last_name: Some("SMITH".to_string()),
            ..Default::default()
        };
        assert_eq!(person.display_name().as_deref(), Some("JOHN SMITH"));

        let org = ProviderRecord {
            organization_name: Some("Springfield Clinic".to_string()),
            ..Default::default()
        };
        assert_eq!(org.display_name().as_deref(), Some("Springfield Clinic"));
    }

    #[test]
    fn test_unnamed_record_without_taxonomies_is_not_matchable() {
        assert!(!ProviderRecord::default().is_matchable());

        let taxonomy_only = ProviderRecord {
            taxonomies: vec![Taxonomy {
                description: Some("Cardiology".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        };
        assert!(taxonomy_only.is_matchable());
    }

    #[test]
    fn test_later_source_refines_scalars() {
        let mut evidence = ExternalEvidence::new();
        evidence.absorb(
            Provenance::Directories,
            EvidenceFragment {
                phone: Some("(212) 555-0100".to_string()),
                address: Some("1 Old Road".to_string()),
                services: vec!["Cardiology".to_string(), "Echo".to_string()],
                ..Default::default()
            },
        );
        evidence.absorb(
            Provenance::Places,
            EvidenceFragment {
                phone: Some("212-555-0199".to_string()),
                address: Some("   ".to_string()),
                services: vec!["Echo".to_string(), "Stress tests".to_string()],
                rating: Some(4.5),
                ..Default::default()
            },
        );

        let loose = &evidence.loose;
        assert_eq!(loose.phone, Some(Sourced::new("212-555-0199".to_string(), Provenance::Places)));
        assert_eq!(loose.address, Some(Sourced::new("1 Old Road".to_string(), Provenance::Directories)));

        let services = loose.services.as_ref().unwrap();
        assert_eq!(services.value, vec!["Cardiology", "Echo", "Stress tests"]);
        assert_eq!(services.from, Provenance::Directories);
        assert_eq!(evidence.sources, vec![Provenance::Directories, Provenance::Places]);
    }

    #[test]
    fn test_empty_fragment_does_not_count_as_source() {
        let mut evidence = ExternalEvidence::new();
        evidence.absorb(Provenance::Registry, EvidenceFragment::default());
        assert!(evidence.sources.is_empty());
    }

    #[test]
    fn test_provenance_labels() {
        for p in Provenance::MERGE_ORDER {
            assert_eq!(Provenance::parse(p.as_str()), Some(p));
        }
        assert_eq!(Provenance::parse("NPI Registry"), None);
        assert_eq!(serde_json::to_string(&Provenance::Places).unwrap(), "\"Places\"");
    }
}
