//! Error types for grownet.

use thiserror::Error;

/// Result type alias for grownet operations.
pub type Result<T> = std::result::Result<T, GrownetError>;

/// Main error type for grownet operations.
#[derive(Error, Debug)]
pub enum GrownetError {
    /// Configuration errors.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Array shape mismatch.
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// Expected shape.
        expected: Vec<usize>,
        /// Actual shape.
        actual: Vec<usize>,
    },

    /// Corpus reading errors.
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Tokenizer errors.
    #[error("Tokenizer error: {0}")]
    Tokenizer(String),

    /// Invalid argument.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<serde_yaml::Error> for GrownetError {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<serde_json::Error> for GrownetError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}
