//! Field verifiers
//!
//! One pure function per claimed attribute. Each walks a fixed, ordered list
//! of evidence locations, stops at the first non-empty observed value, and
//! compares it with the claim through [`FieldOutcome::evaluate`]. Missing or
//! sparse evidence never fails a verifier; it only leaves the outcome
//! unknown.

use super::selector::mutual_contains;
use super::similarity::{address_similarity, name_similarity, phones_equal};
use crate::models::evidence::non_blank;
use crate::models::{
    ExternalEvidence, FieldOutcome, PayerIdentifier, Provenance, ProviderRecord, Sourced, Taxonomy,
};
use dvs_common::config::MatchingConfig;
use tracing::debug;

/// Inputs shared by every verifier for one request
#[derive(Debug, Clone, Copy)]
pub struct FieldContext<'a> {
    pub evidence: &'a ExternalEvidence,
    pub best: Option<&'a ProviderRecord>,
    pub config: &'a MatchingConfig,
}

fn claimed(value: Option<&str>) -> Option<String> {
    non_blank(value)
}

fn registry(value: String) -> Sourced<String> {
    Sourced::new(value, Provenance::Registry)
}

// ============================================================================
// Name and specialty
// ============================================================================

/// Candidate's composed name, then any loose name
pub fn verify_full_name(claimed_name: &str, ctx: &FieldContext<'_>) -> FieldOutcome<String> {
    let observed = ctx
        .best
        .and_then(ProviderRecord::display_name)
        .map(registry)
        .or_else(|| ctx.evidence.loose.name.clone());

    let threshold = ctx.config.name_threshold;
    FieldOutcome::evaluate(claimed(Some(claimed_name)), observed, |input, observed| {
        name_similarity(input, observed) >= threshold
    })
}

fn primary_description(record: &ProviderRecord) -> Option<String> {
    record
        .taxonomies
        .iter()
        .filter(|t| t.primary)
        .find_map(|t| non_blank(t.description.as_deref()))
        .or_else(|| record.taxonomy_descriptions().next().map(str::to_string))
}

/// Primary taxonomy, first taxonomy, then loose specialty or first service
pub fn verify_specialty(claimed_specialty: &str, ctx: &FieldContext<'_>) -> FieldOutcome<String> {
    let loose = &ctx.evidence.loose;
    let observed = ctx
        .best
        .and_then(primary_description)
        .map(registry)
        .or_else(|| loose.specialty.clone())
        .or_else(|| {
            loose.services.as_ref().and_then(|services| {
                services
                    .value
                    .first()
                    .map(|first| Sourced::new(first.clone(), services.from))
            })
        });

    FieldOutcome::evaluate(claimed(Some(claimed_specialty)), observed, |input, observed| {
        mutual_contains(input, observed)
    })
}

// ============================================================================
// Address and phone
// ============================================================================

/// Formatted LOCATION entries of the candidate, best by similarity to the
/// claim (first on ties), then loose address, then loose practice location
pub fn verify_address(claimed_address: Option<&str>, ctx: &FieldContext<'_>) -> FieldOutcome<String> {
    let input = claimed(claimed_address);

    let locations: Vec<String> = ctx
        .best
        .map(|record| {
            record
                .all_addresses()
                .filter(|a| a.is_location())
                .filter_map(|a| a.formatted())
                .collect()
        })
        .unwrap_or_default();

    let from_registry = match &input {
        Some(claim) => {
            let mut best: Option<(&String, f64)> = None;
            for location in &locations {
                let score = address_similarity(claim, location);
                if best.map_or(true, |(_, s)| score > s) {
                    best = Some((location, score));
                }
            }
            best.map(|(location, _)| location.clone())
        }
        None => locations.first().cloned(),
    };

    let loose = &ctx.evidence.loose;
    let observed = from_registry
        .map(registry)
        .or_else(|| loose.address.clone())
        .or_else(|| {
            loose.practice_location.as_ref().and_then(|loc| {
                non_blank(loc.value.address.as_deref()).map(|a| Sourced::new(a, loc.from))
            })
        });

    let threshold = ctx.config.address_threshold;
    FieldOutcome::evaluate(input, observed, |input, observed| {
        address_similarity(input, observed) >= threshold
    })
}

/// First LOCATION entry's phone, then loose phone, then loose practice location phone
pub fn verify_phone(claimed_phone: Option<&str>, ctx: &FieldContext<'_>) -> FieldOutcome<String> {
    let loose = &ctx.evidence.loose;
    let observed = ctx
        .best
        .and_then(|record| {
            record
                .all_addresses()
                .filter(|a| a.is_location())
                .find_map(|a| non_blank(a.telephone.as_deref()))
        })
        .map(registry)
        .or_else(|| loose.phone.clone())
        .or_else(|| {
            loose.practice_location.as_ref().and_then(|loc| {
                non_blank(loc.value.phone.as_deref()).map(|p| Sourced::new(p, loc.from))
            })
        });

    FieldOutcome::evaluate(claimed(claimed_phone), observed, |input, observed| {
        phones_equal(input, observed)
    })
}

// ============================================================================
// License
// ============================================================================

fn usable_license<'t>(taxonomy: &'t Taxonomy, config: &MatchingConfig) -> Option<&'t str> {
    let license = taxonomy.license.as_deref()?.trim();
    if license.is_empty()
        || config
            .license_placeholders
            .iter()
            .any(|p| p.trim().eq_ignore_ascii_case(license))
    {
        return None;
    }
    Some(license)
}

/// Specialty terms match directly or through a configured synonym group
pub fn specialty_terms_match(claimed: &str, description: &str, config: &MatchingConfig) -> bool {
    if claimed.trim().is_empty() || description.trim().is_empty() {
        return false;
    }
    if mutual_contains(claimed, description) {
        return true;
    }

    let (claimed, description) = (claimed.to_lowercase(), description.to_lowercase());
    config.specialty_synonyms.iter().any(|(canonical, aliases)| {
        let mentions = |text: &str| {
            text.contains(&canonical.to_lowercase())
                || aliases.iter().any(|alias| text.contains(&alias.to_lowercase()))
        };
        mentions(&claimed) && mentions(&description)
    })
}

/// License from the taxonomy matching the claimed specialty, then the
/// primary taxonomy, then the first usable one
pub fn verify_license(
    claimed_license: Option<&str>,
    claimed_specialty: &str,
    ctx: &FieldContext<'_>,
) -> FieldOutcome<String> {
    let config = ctx.config;
    let observed = ctx.best.and_then(|record| {
        let usable = move || {
            record
                .taxonomies
                .iter()
                .filter_map(move |t| usable_license(t, config).map(|license| (t, license)))
        };

        let by_specialty = usable().find(|(t, _)| {
            t.description
                .as_deref()
                .is_some_and(|desc| specialty_terms_match(claimed_specialty, desc, config))
        });
        let chosen = by_specialty
            .or_else(|| usable().find(|(t, _)| t.primary))
            .or_else(|| usable().next());

        if let Some((taxonomy, license)) = chosen {
            debug!(
                license,
                taxonomy = taxonomy.description.as_deref().unwrap_or("-"),
                "Selected license"
            );
        }

        chosen.map(|(_, license)| registry(license.to_string()))
    });

    FieldOutcome::evaluate(claimed(claimed_license), observed, |input, observed| {
        input.trim().to_uppercase() == observed.trim().to_uppercase()
    })
}

// ============================================================================
// Insurance networks and services
// ============================================================================

/// Canonical network name for a payer identifier, if one can be inferred
pub fn network_for_identifier(identifier: &PayerIdentifier) -> Option<&'static str> {
    let description = identifier.description.as_deref().unwrap_or("").to_uppercase();
    if description.contains("MEDICAID") {
        return Some("Medicaid");
    }
    if description.contains("MEDICARE") {
        return Some("Medicare");
    }

    let issuer = identifier.issuer.as_deref().unwrap_or("").to_lowercase();
    if issuer.contains("blue shield") || issuer.contains("blue cross") {
        Some("Blue Cross Blue Shield")
    } else if issuer.contains("aetna") {
        Some("Aetna")
    } else if issuer.contains("cigna") {
        Some("Cigna")
    } else if issuer.contains("humana") {
        Some("Humana")
    } else if issuer.contains("united") {
        Some("UnitedHealthcare")
    } else {
        None
    }
}

/// Networks inferred from the candidate's payer identifiers
pub fn verify_insurance_networks(
    claimed_networks: &[String],
    ctx: &FieldContext<'_>,
) -> FieldOutcome<Vec<String>> {
    let input = if claimed_networks.is_empty() {
        None
    } else {
        Some(claimed_networks.to_vec())
    };

    let observed = ctx.best.and_then(|record| {
        let mut networks: Vec<String> = Vec::new();
        for network in record.identifiers.iter().filter_map(network_for_identifier) {
            if !networks.iter().any(|n| n == network) {
                networks.push(network.to_string());
            }
        }
        if networks.is_empty() {
            None
        } else {
            Some(Sourced::new(networks, Provenance::Registry))
        }
    });

    FieldOutcome::evaluate(input, observed, |input, observed| {
        input
            .iter()
            .any(|claim| observed.iter().any(|found| found.eq_ignore_ascii_case(claim.trim())))
    })
}

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// The claim names the whole service, or shares one of its words longer
/// than two letters
fn service_mentioned(claimed_words: &[String], service: &str) -> bool {
    let service_words = words(service);
    if service_words.is_empty() {
        return false;
    }
    claimed_words
        .windows(service_words.len())
        .any(|window| window == service_words.as_slice())
        || service_words
            .iter()
            .filter(|word| word.chars().count() > 2)
            .any(|word| claimed_words.contains(word))
}

/// Loose services list only
pub fn verify_services(
    claimed_services: Option<&str>,
    ctx: &FieldContext<'_>,
) -> FieldOutcome<String, Vec<String>> {
    let observed = ctx
        .evidence
        .loose
        .services
        .clone()
        .filter(|services| !services.value.is_empty());

    FieldOutcome::evaluate(claimed(claimed_services), observed, |input, observed| {
        let claimed_words = words(input);
        observed.iter().any(|service| service_mentioned(&claimed_words, service))
    })
}
