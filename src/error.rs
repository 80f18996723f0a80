//! Error types for Aria

use thiserror::Error;

/// Result type alias for Aria operations
pub type Result<T> = std::result::Result<T, AriaError>;

/// Main error type for Aria
#[derive(Error, Debug)]
pub enum AriaError {
    #[error("Generation backend error: {0}")]
    Generation(String),

    #[error("Speech synthesis error: {0}")]
    Synthesis(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid artifact name: {0}")]
    InvalidArtifactName(String),

    #[error("Artifact not found: {0}")]
    ArtifactNotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AriaError {
    /// HTTP status code for API responses
    pub fn status_code(&self) -> u16 {
        match self {
            AriaError::InvalidInput(_) | AriaError::InvalidArtifactName(_) => 400,
            AriaError::ArtifactNotFound(_) => 404,
            AriaError::Generation(_) => 502,
            _ => 500,
        }
    }
}
