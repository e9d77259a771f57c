//! Reconciliation orchestrator
//!
//! Runs the candidate selector once and all seven field verifiers over a
//! claimed identity, then assembles the immutable [`VerificationReport`].
//! No I/O and no shared state: the same inputs always give the same
//! outcomes (only the identifier and timestamp vary).

use super::selector::select_best_candidate;
use super::verifiers::{
    verify_address, verify_full_name, verify_insurance_networks, verify_license, verify_phone,
    verify_services, verify_specialty, FieldContext,
};
use crate::models::{ClaimedIdentity, ExternalEvidence, VerificationReport};
use chrono::{DateTime, Utc};
use dvs_common::config::MatchingConfig;
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use uuid::Uuid;

/// Reconcile a claimed identity against gathered evidence
pub fn reconcile(
    claimed: &ClaimedIdentity,
    evidence: &ExternalEvidence,
    config: &MatchingConfig,
) -> VerificationReport {
    reconcile_at(claimed, evidence, config, dvs_common::time::now())
}

/// [`reconcile`] with an explicit report timestamp
pub fn reconcile_at(
    claimed: &ClaimedIdentity,
    evidence: &ExternalEvidence,
    config: &MatchingConfig,
    timestamp: DateTime<Utc>,
) -> VerificationReport {
    let best = select_best_candidate(
        &claimed.full_name,
        &claimed.specialty,
        &evidence.candidates,
        config,
    );

    let ctx = FieldContext {
        evidence,
        best,
        config,
    };

    let verification_id = generate_verification_id(&claimed.full_name, timestamp);
    let report = VerificationReport {
        verification_id,
        timestamp,
        full_name: verify_full_name(&claimed.full_name, &ctx),
        specialty: verify_specialty(&claimed.specialty, &ctx),
        address: verify_address(claimed.address.as_deref(), &ctx),
        phone_number: verify_phone(claimed.phone_number.as_deref(), &ctx),
        license_number: verify_license(
            claimed.license_number.as_deref(),
            &claimed.specialty,
            &ctx,
        ),
        insurance_networks: verify_insurance_networks(&claimed.insurance_networks, &ctx),
        services_offered: verify_services(claimed.services_offered.as_deref(), &ctx),
    };

    debug!(
        verification_id = %report.verification_id,
        npi = best.and_then(|b| b.npi.as_deref()).unwrap_or("-"),
        "Field verification complete"
    );
    info!(
        verification_id = %report.verification_id,
        candidates = evidence.candidates.len(),
        matched_candidate = best.is_some(),
        "Reconciled claimed identity"
    );

    report
}

/// Four decimal digits derived from the claimed name
fn name_digits(full_name: &str) -> u64 {
    let digest = Sha256::digest(full_name.trim().to_lowercase().as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(prefix) % 10_000
}

/// `VER_{yyyymmdd}_{hhmmss}_{name digits}{random hex}`
///
/// The random suffix keeps same-second requests for the same name apart;
/// any remaining collision surfaces as a conflict when the report is stored.
pub fn generate_verification_id(full_name: &str, timestamp: DateTime<Utc>) -> String {
    tagged_id("VER", full_name, timestamp)
}

/// Same layout as [`generate_verification_id`] with a `SEARCH` prefix
pub fn generate_search_id(name: &str, timestamp: DateTime<Utc>) -> String {
    tagged_id("SEARCH", name, timestamp)
}

fn tagged_id(prefix: &str, name: &str, timestamp: DateTime<Utc>) -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!(
        "{}_{}_{:04}{}",
        prefix,
        timestamp.format("%Y%m%d_%H%M%S"),
        name_digits(name),
        &random[..4]
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AddressEntry, MatchState, Provenance, ProviderRecord, Sourced, Taxonomy};
    use chrono::TimeZone;

    fn claimed() -> ClaimedIdentity {
        ClaimedIdentity {
            full_name: "John A. Smith".to_string(),
            specialty: "Cardiology".to_string(),
            address: Some("100 Main St, Springfield, IL".to_string()),
            phone_number: Some("(212) 555-0199".to_string()),
            license_number: Some("ab1234".to_string()),
            insurance_networks: vec!["Aetna".to_string()],
            services_offered: Some("echocardiograms".to_string()),
        }
    }

    fn matching_record() -> ProviderRecord {
        ProviderRecord {
            npi: Some("1234567890".to_string()),
            first_name: Some("JOHN".to_string()),
            last_name: Some("SMITH".to_string()),
            taxonomies: vec![Taxonomy {
                description: Some("Cardiology".to_string()),
                license: Some("AB1234".to_string()),
                primary: true,
                ..Default::default()
            }],
            addresses: vec![AddressEntry {
                line1: Some("100 Main Street".to_string()),
                city: Some("Springfield".to_string()),
                state: Some("IL".to_string()),
                postal_code: Some("62701".to_string()),
                telephone: Some("212-555-0199".to_string()),
                purpose: Some("LOCATION".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    #[test]
    fn test_full_match() {
        let evidence = ExternalEvidence {
            candidates: vec![matching_record()],
            sources: vec![Provenance::Registry],
            ..Default::default()
        };
        let report = reconcile(&claimed(), &evidence, &MatchingConfig::default());

        assert_eq!(report.full_name.matches(), MatchState::Matched);
        assert_eq!(report.specialty.matches(), MatchState::Matched);
        assert_eq!(report.address.matches(), MatchState::Matched);
        assert_eq!(report.phone_number.matches(), MatchState::Matched);
        assert_eq!(report.license_number.matches(), MatchState::Matched);
        // No payer identifiers, no directory services
        assert_eq!(report.insurance_networks.matches(), MatchState::Unknown);
        assert_eq!(report.services_offered.matches(), MatchState::Unknown);
    }

    #[test]
    fn test_no_admitted_candidate_leaves_registry_fields_unknown() {
        let mut stranger = matching_record();
        stranger.first_name = Some("MARY".to_string());
        stranger.last_name = Some("JONES".to_string());

        let mut evidence = ExternalEvidence {
            candidates: vec![stranger],
            ..Default::default()
        };
        evidence.loose.phone = Some(Sourced::new("212-555-0199".to_string(), Provenance::Places));

        let report = reconcile(&claimed(), &evidence, &MatchingConfig::default());

        for outcome in [&report.full_name, &report.address, &report.license_number] {
            assert_eq!(outcome.observed_from(), None);
            assert_eq!(outcome.matches(), MatchState::Unknown);
        }
        assert_eq!(report.insurance_networks.observed_from(), None);

        // A non-registry source still supplies the phone
        assert_eq!(report.phone_number.observed_from(), Some(Provenance::Places));
        assert_eq!(report.phone_number.matches(), MatchState::Matched);
    }

    #[test]
    fn test_outcomes_are_deterministic() {
        let evidence = ExternalEvidence {
            candidates: vec![matching_record()],
            ..Default::default()
        };
        let config = MatchingConfig::default();
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();

        let a = reconcile_at(&claimed(), &evidence, &config, at);
        let b = reconcile_at(&claimed(), &evidence, &config, at);
        assert_eq!(a.full_name, b.full_name);
        assert_eq!(a.address, b.address);
        assert_eq!(a.timestamp, b.timestamp);
    }

    #[test]
    fn test_verification_id_format() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 5, 7).unwrap();
        let id = generate_verification_id("John Smith", at);

        assert!(id.starts_with("VER_20240301_090507_"), "{}", id);
        let suffix = &id["VER_20240301_090507_".len()..];
        assert_eq!(suffix.len(), 8);
        assert!(suffix[..4].chars().all(|c| c.is_ascii_digit()));
        assert!(suffix[4..].chars().all(|c| c.is_ascii_hexdigit()));

        // Name digits are stable across calls and case
        let again = generate_verification_id("  JOHN SMITH ", at);
        assert_eq!(&again[..24], &id[..24]);
    }

    #[test]
    fn test_search_id_shares_layout() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 5, 7).unwrap();
        let search = generate_search_id("John Smith", at);
        let verify = generate_verification_id("John Smith", at);

        assert!(search.starts_with("SEARCH_20240301_090507_"), "{}", search);
        assert_eq!(&search[23..27], &verify[20..24]);
    }
}
