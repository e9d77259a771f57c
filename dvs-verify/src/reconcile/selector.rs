//! Candidate selection
//!
//! Picks at most one provider record to drive the registry-backed field
//! comparisons. Name is the primary identity signal; specialty only
//! corroborates.

use super::similarity::name_similarity;
use crate::models::ProviderRecord;
use dvs_common::config::MatchingConfig;
use tracing::debug;

/// Case-insensitive substring test in either direction
pub(crate) fn mutual_contains(a: &str, b: &str) -> bool {
    let (a, b) = (a.to_lowercase(), b.to_lowercase());
    a.contains(&b) || b.contains(&a)
}

/// Weighted score for one candidate
///
/// `name_weight * name + specialty_weight * specialty`, where the specialty
/// part is 1.0 when the claimed specialty and any taxonomy description
/// contain one another, and 0.0 otherwise (including a blank claim).
pub fn candidate_score(
    claimed_name: &str,
    claimed_specialty: &str,
    candidate: &ProviderRecord,
    config: &MatchingConfig,
) -> f64 {
    let name_score = candidate
        .display_name()
        .map(|name| name_similarity(claimed_name, &name))
        .unwrap_or(0.0);

    let claimed_specialty = claimed_specialty.trim();
    let specialty_score = if claimed_specialty.is_empty() {
        0.0
    } else if candidate
        .taxonomy_descriptions()
        .any(|desc| mutual_contains(claimed_specialty, desc))
    {
        1.0
    } else {
        0.0
    };

    config.name_weight * name_score + config.specialty_weight * specialty_score
}

/// Select the best matching candidate, if any clears the admission threshold
///
/// A candidate replaces the current best only with a strictly greater score
/// that is also strictly above `candidate_threshold`, so ties keep the first
/// seen. Unmatchable records are skipped.
pub fn select_best_candidate<'a>(
    claimed_name: &str,
    claimed_specialty: &str,
    candidates: &'a [ProviderRecord],
    config: &MatchingConfig,
) -> Option<&'a ProviderRecord> {
    let mut best: Option<&ProviderRecord> = None;
    let mut best_score = 0.0;

    for (index, candidate) in candidates.iter().enumerate() {
        if !candidate.is_matchable() {
            continue;
        }

        let score = candidate_score(claimed_name, claimed_specialty, candidate, config);
        debug!(
            index,
            npi = candidate.npi.as_deref().unwrap_or("-"),
            score,
            "Scored candidate"
        );

        if score > best_score && score > config.candidate_threshold {
            best_score = score;
            best = Some(candidate);
        }
    }

    debug!(
        candidates = candidates.len(),
        selected = best.is_some(),
        best_score,
        "Candidate selection complete"
    );

    best
}
