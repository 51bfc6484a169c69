//! Error types for the valuation pipeline

use thiserror::Error;

/// Main error type for valuation operations
#[derive(Error, Debug)]
pub enum ValuationError {
    #[error("Missing input: {0}")]
    MissingInput(String),

    #[error("Invalid assumption in {stage}: {reason}")]
    InvalidAssumption { stage: String, reason: String },

    #[error(
        "Configuration mismatch: horizon of {horizon} years requested but the assumption schedule covers {available}"
    )]
    ConfigurationMismatch { horizon: usize, available: usize },

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

impl ValuationError {
    /// Build an `InvalidAssumption` error for the named pipeline stage
    pub fn invalid(stage: &str, reason: impl Into<String>) -> Self {
        ValuationError::InvalidAssumption {
            stage: stage.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for valuation operations
pub type Result<T> = std::result::Result<T, ValuationError>;
