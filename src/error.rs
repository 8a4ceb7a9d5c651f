use thiserror::Error;

/// Errors that can occur inside the assistant pipeline
#[derive(Error, Debug)]
pub enum AssistantError {
    #[error("Invalid path: {path:?}")]
    InvalidPath { path: String },

    #[error("File not found: {path}")]
    NotFound { path: String },

    #[error("No API key configured")]
    MissingApiKey,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Model API error: {message}")]
    Api { message: String },

    #[error("Invalid model response: {message}")]
    InvalidResponse { message: String },

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Key store error: {message}")]
    KeyStore { message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),
}

/// Result type alias for assistant operations
pub type Result<T> = std::result::Result<T, AssistantError>;
