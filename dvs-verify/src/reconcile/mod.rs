//! Field-reconciliation engine
//!
//! Pure, synchronous decision logic: similarity primitives, candidate
//! selection, per-field verifiers and the orchestrator that combines them.

pub mod orchestrator;
pub mod selector;
pub mod similarity;
pub mod verifiers;

pub use orchestrator::{generate_search_id, generate_verification_id, reconcile, reconcile_at};
pub use selector::{candidate_score, select_best_candidate};
pub use similarity::{address_similarity, name_similarity, normalize_phone, token_similarity};
