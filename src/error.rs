//! Error types for the voice relay

use thiserror::Error;

/// Result type alias for relay operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the voice relay
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Language model error
    #[error("LLM error: {0}")]
    Llm(String),

    /// Upstream returned a non-success status
    #[error("upstream error {status}: {body}")]
    Upstream { status: u16, body: String },

    /// Text-to-speech error
    #[error("TTS error: {0}")]
    Tts(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Whether retrying the failed upstream call may succeed
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Upstream { status, body } => crate::llm::retry::is_recoverable(*status, body),
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }
}
