//! Per-field verification outcome

use super::evidence::{Provenance, Sourced};
use serde::{Deserialize, Serialize};

/// Tri-state comparison result
///
/// Serialized as `true`, `false` or `null`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<bool>", into = "Option<bool>")]
pub enum MatchState {
    Matched,
    Mismatched,
    /// Not enough data to compare
    Unknown,
}

impl MatchState {
    pub fn as_option(self) -> Option<bool> {
        self.into()
    }
}

impl From<bool> for MatchState {
    fn from(matched: bool) -> Self {
        if matched {
            MatchState::Matched
        } else {
            MatchState::Mismatched
        }
    }
}

impl From<Option<bool>> for MatchState {
    fn from(value: Option<bool>) -> Self {
        value.map(MatchState::from).unwrap_or(MatchState::Unknown)
    }
}

impl From<MatchState> for Option<bool> {
    fn from(state: MatchState) -> Self {
        match state {
            MatchState::Matched => Some(true),
            MatchState::Mismatched => Some(false),
            MatchState::Unknown => None,
        }
    }
}

/// Outcome of checking one claimed attribute against observed evidence
///
/// Fields are private so the only way to build an outcome is
/// [`FieldOutcome::evaluate`]: `matches` is `Unknown` exactly when the
/// input or the observed value is missing.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldOutcome<I, O = I> {
    input_value: Option<I>,
    observed_value: Option<O>,
    observed_from: Option<Provenance>,
    matches: MatchState,
}

impl<I, O> FieldOutcome<I, O> {
    /// Compare `input` against `observed` with `rule`
    ///
    /// `rule` only runs when both sides are present.
    pub fn evaluate<F>(input: Option<I>, observed: Option<Sourced<O>>, rule: F) -> Self
    where
        F: FnOnce(&I, &O) -> bool,
    {
        let (observed_value, observed_from) = match observed {
            Some(sourced) => (Some(sourced.value), Some(sourced.from)),
            None => (None, None),
        };

        let matches = match (&input, &observed_value) {
            (Some(input), Some(observed)) => MatchState::from(rule(input, observed)),
            _ => MatchState::Unknown,
        };

        Self {
            input_value: input,
            observed_value,
            observed_from,
            matches,
        }
    }

    pub fn input_value(&self) -> Option<&I> {
        self.input_value.as_ref()
    }

    pub fn observed_value(&self) -> Option<&O> {
        self.observed_value.as_ref()
    }

    pub fn observed_from(&self) -> Option<Provenance> {
        self.observed_from
    }

    pub fn matches(&self) -> MatchState {
        self.matches
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_iff_a_side_is_missing() {
        let equal = |a: &String, b: &String| a == b;
        let observed = || Some(Sourced::new("x".to_string(), Provenance::Registry));

        let both = FieldOutcome::evaluate(Some("x".to_string()), observed(), equal);
        assert_eq!(both.matches(), MatchState::Matched);

        let no_input = FieldOutcome::evaluate(None, observed(), equal);
        assert_eq!(no_input.matches(), MatchState::Unknown);
        assert_eq!(no_input.observed_from(), Some(Provenance::Registry));

        let nothing_observed = FieldOutcome::<String>::evaluate(Some("x".to_string()), None, equal);
        assert_eq!(nothing_observed.matches(), MatchState::Unknown);
        assert_eq!(nothing_observed.observed_from(), None);
        assert_eq!(nothing_observed.input_value().map(String::as_str), Some("x"));
    }

    #[test]
    fn test_rule_not_called_without_both_sides() {
        let outcome = FieldOutcome::<String>::evaluate(None, None, |_, _| panic!("rule must not run"));
        assert_eq!(outcome.matches(), MatchState::Unknown);
    }

    #[test]
    fn test_serializes_camel_case_with_nullable_match() {
        let outcome = FieldOutcome::evaluate(
            Some("AB1234".to_string()),
            Some(Sourced::new("AB1234".to_string(), Provenance::Registry)),
            |a: &String, b: &String| a == b,
        );
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["inputValue"], "AB1234");
        assert_eq!(json["observedFrom"], "Registry");
        assert_eq!(json["matches"], true);

        let unknown = FieldOutcome::<String>::evaluate(None, None, |a, b| a == b);
        let json = serde_json::to_value(&unknown).unwrap();
        assert!(json["matches"].is_null());
        assert!(json["observedFrom"].is_null());
    }
}
