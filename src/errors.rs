//! Unified error types for CareerEngine
//!
//! Mirrors the donor codebase's error hierarchy: one flat enum with a
//! variant per failure family named in the external-interface contract,
//! each carrying a detail string, plus `From` conversions at the
//! collaborator boundaries (sqlite, I/O).

use std::fmt;

/// Main error type for the CareerEngine pipeline.
#[derive(Debug, Clone)]
pub enum CareerEngineError {
    /// No default resume exists for the user (input error, not a fault).
    NoDefaultResume,
    /// The target job could not be found (input error, not a fault).
    JobNotFound(String),
    /// The resume row exists but carries no usable text.
    ResumeMissing(String),
    /// The extractor exhausted its reask budget on malformed model output.
    ExtractionFailed(String),
    /// An extraction is already in flight past the join-window.
    ExtractionPending,
    /// A policy override had the wrong type for its key.
    InvalidOverride(String),
    /// The taxonomy vector index is unreachable or returned garbage.
    VectorIndexUnavailable(String),
    /// A language-model call exceeded its bounded timeout.
    LanguageModelTimeout(String),
    /// A persistence operation failed after retry.
    PersistenceFailed(String),
    /// Catch-all for conditions with no dedicated variant.
    Application(String),
}

impl fmt::Display for CareerEngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CareerEngineError::NoDefaultResume => {
                write!(f, "no default resume exists for this user")
            }
            CareerEngineError::JobNotFound(id) => write!(f, "job not found: {}", id),
            CareerEngineError::ResumeMissing(msg) => write!(f, "resume missing: {}", msg),
            CareerEngineError::ExtractionFailed(msg) => write!(f, "extraction failed: {}", msg),
            CareerEngineError::ExtractionPending => {
                write!(f, "extraction still in progress")
            }
            CareerEngineError::InvalidOverride(msg) => write!(f, "invalid override: {}", msg),
            CareerEngineError::VectorIndexUnavailable(msg) => {
                write!(f, "vector index unavailable: {}", msg)
            }
            CareerEngineError::LanguageModelTimeout(msg) => {
                write!(f, "language model call timed out: {}", msg)
            }
            CareerEngineError::PersistenceFailed(msg) => write!(f, "persistence failed: {}", msg),
            CareerEngineError::Application(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for CareerEngineError {}

impl From<rusqlite::Error> for CareerEngineError {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::QueryReturnedNoRows => {
                CareerEngineError::PersistenceFailed("query returned no rows".to_string())
            }
            rusqlite::Error::SqliteFailure(e, msg) => {
                let detail = msg.unwrap_or_else(|| format!("sqlite error code: {:?}", e.code));
                CareerEngineError::PersistenceFailed(detail)
            }
            other => CareerEngineError::PersistenceFailed(other.to_string()),
        }
    }
}

impl From<std::io::Error> for CareerEngineError {
    fn from(err: std::io::Error) -> Self {
        CareerEngineError::Application(format!("I/O error: {}", err))
    }
}

impl From<serde_json::Error> for CareerEngineError {
    fn from(err: serde_json::Error) -> Self {
        CareerEngineError::ExtractionFailed(format!("JSON error: {}", err))
    }
}

/// Whether an error is a transient fault worth retrying (spec.md §7).
pub fn is_retryable(error: &CareerEngineError) -> bool {
    matches!(
        error,
        CareerEngineError::ExtractionPending
            | CareerEngineError::VectorIndexUnavailable(_)
            | CareerEngineError::LanguageModelTimeout(_)
    )
}
