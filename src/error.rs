//! Error types

use thiserror::Error;

/// Main error type for the prediction engine
#[derive(Error, Debug)]
pub enum Error {
    // Data availability
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    // Configuration errors
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    #[error("Invalid model configuration: {0}")]
    InvalidModelConfig(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Store errors
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // State machine errors
    #[error("Invalid state transition: from {from} to {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Not enough history to produce a value; callers abstain instead of failing
    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, Error::InsufficientData(_))
    }

    /// Unknown model names and malformed configuration, surfaced to the caller
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Error::UnknownModel(_) | Error::InvalidModelConfig(_) | Error::Config(_)
        )
    }

    /// Backing store failures; safe to retry on the next cycle
    pub fn is_store_unavailable(&self) -> bool {
        matches!(
            self,
            Error::StoreUnavailable(_) | Error::Database(_) | Error::Json(_) | Error::Io(_)
        )
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
