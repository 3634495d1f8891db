//! Error types for Drishti

use thiserror::Error;

/// Result type alias for Drishti operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Drishti
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Backend API error (unexpected status or payload)
    #[error("backend error: {0}")]
    Backend(String),

    /// Object detection error
    #[error("detection error: {0}")]
    Detection(String),

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// Translation error
    #[error("translation error: {0}")]
    Translate(String),

    /// Audio error
    #[error("audio error: {0}")]
    Audio(String),

    /// Camera / frame source error
    #[error("camera error: {0}")]
    Camera(String),

    /// Profile storage error
    #[error("profile error: {0}")]
    Profile(String),

    /// Currency recognition error
    #[error("currency error: {0}")]
    Currency(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
