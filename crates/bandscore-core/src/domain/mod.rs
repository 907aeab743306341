//! Domain models for bandscore.
//!
//! Canonical definitions for the core entities:
//! - `CanonicalScore`: normalized 0-90 result with per-dimension subscores
//! - `RawProviderResult`: un-normalized output of one judgment backend
//! - `ScoringRequest`: one request-scoped scoring call
//! - `ScoreError`: the only errors that reach the caller

pub mod error;
pub mod request;
pub mod score;

// Re-export main types and errors
pub use error::{Result, ScoreError};
pub use request::{QuestionKind, ScoringRequest, SectionPayload};
pub use score::{
    CanonicalScore, Dimension, ProviderKind, ProviderMeta, RawProviderResult, Section,
};
