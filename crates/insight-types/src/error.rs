//! Error types for photo-insight

use thiserror::Error;

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration directory not found")]
    NotFound,

    #[error("API key not set (expected environment variable {0})")]
    MissingApiKey(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Rejected before any remote call is made
    #[error("Invalid image: {0}")]
    InvalidImage(String),

    /// Nothing left to analyze once input validation ran
    #[error("{0}")]
    Validation(String),

    /// Network, authentication and malformed-reply failures all land here
    #[error("Inference failed: {0}")]
    Inference(String),
}

impl Error {
    /// Message suitable for showing to the person who uploaded the image
    pub fn user_message(&self) -> &str {
        match self {
            Error::InvalidImage(_) => "Please upload a valid image file",
            Error::Validation(msg) => msg,
            _ => "Error analyzing image. Please try again.",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
