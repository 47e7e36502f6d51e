//! Error types for fedig

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Shape mismatch: expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    #[error("Model inference failed: {0}")]
    Inference(String),

    #[error("Invalid gradient: {0}")]
    InvalidGradient(String),

    #[error("No selectable attribute: {0}")]
    NoSelectableAttribute(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl Error {
    /// Whether the error only invalidates the instance being evaluated.
    ///
    /// The search controllers skip the current seed or witness on these and
    /// keep going; everything else aborts the run.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::ShapeMismatch { .. }
                | Error::Inference(_)
                | Error::InvalidGradient(_)
                | Error::NoSelectableAttribute(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
