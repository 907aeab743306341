//! Caller-visible error taxonomy.
//!
//! Backend failures never appear here: provider timeouts, transport
//! errors, and malformed judgments are absorbed into fallback results
//! annotated in `metadata`. Only request-shape violations propagate.

/// Errors a scoring call may return to its caller.
#[derive(Debug, thiserror::Error)]
pub enum ScoreError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("no scoring path for section '{section}' question type '{question_type}'")]
    NoScoringPath {
        section: String,
        question_type: String,
    },
}

/// Result type for scoring operations.
pub type Result<T> = std::result::Result<T, ScoreError>;
