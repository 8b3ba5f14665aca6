//! Error types for snapshot construction.

use thiserror::Error;

/// Result type for adapter operations.
pub type Result<T> = std::result::Result<T, AdapterError>;

/// Errors raised while turning a captured document into a snapshot.
///
/// These are data errors, surfaced to the caller and never retried here;
/// re-fetching or re-parsing a document is the capture pipeline's decision.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The artifact URL does not carry the path segments the site requires.
    #[error("invalid artifact URL: {0}")]
    InvalidUrl(String),

    /// A field the snapshot requires is absent from the document.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// A field was present but its text could not be interpreted.
    #[error("can't parse {text:?} as {expected}")]
    Malformed {
        expected: &'static str,
        text: String,
    },

    /// A language ratio fell outside the range (0; 1].
    #[error("ratio {0} is outside the range (0; 1]")]
    RatioOutOfRange(f64),

    /// A language breakdown was constructed with no samples.
    #[error("a language breakdown needs at least one sample")]
    EmptyBreakdown,
}
