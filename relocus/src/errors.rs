use crate::resolver::Candidate;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// Candidates exist but the best score fell below the ambiguity threshold.
    /// Carries the top candidate so callers can surface a "did you mean" hint
    /// instead of silently proceeding.
    #[error("Ambiguous match: {message}")]
    AmbiguousMatch {
        message: String,
        suggestion: Box<Candidate>,
    },

    #[error("Capture incomplete: {0}")]
    CaptureIncomplete(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Fingerprint store rejected update: {message}")]
    StoreRejected { message: String, retryable: bool },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Internal error: {0}")]
    Internal(String),
}
