//! Data models for dvs-verify
//!
//! Typed replacements for the loosely-shaped records exchanged between the
//! evidence sources, the reconciliation engine and the report store.

pub mod claimed;
pub mod evidence;
pub mod outcome;
pub mod report;

pub use claimed::{ClaimedIdentity, ValidationError, VerificationRequest};
pub use evidence::{
    non_blank, AddressEntry, EvidenceFragment, ExternalEvidence, LooseFields, PayerIdentifier,
    PracticeLocation, Provenance, ProviderRecord, Sourced, Taxonomy,
};
pub use outcome::{FieldOutcome, MatchState};
pub use report::{ReportPage, ReportQuery, SortField, SortOrder, StoredReport, VerificationReport};
