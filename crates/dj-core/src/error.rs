//! Error types for dijetplot

use thiserror::Error;

/// dijetplot error type
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Two binned inputs that must share an axis do not.
    #[error("Shape mismatch between '{left}' and '{right}': {detail}")]
    ShapeMismatch {
        /// Name of the reference distribution.
        left: String,
        /// Name of the distribution that disagrees with it.
        right: String,
        /// What differs (bin count or the first differing edge).
        detail: String,
    },

    /// Computation error
    #[error("Computation error: {0}")]
    Computation(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
