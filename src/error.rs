//! Error handling and custom error types
//!
//! Provides unified error handling across the crate using thiserror.

use thiserror::Error;

/// Message published when a failure carries no description of its own.
pub const FALLBACK_ERROR_MESSAGE: &str = "Unknown error";

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP request error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Stream stalled: no data received for {0}s")]
    StreamTimeout(u64),

    #[error("{0}")]
    Protocol(String),

    #[error("{0}")]
    Validation(String),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Image processing error: {0}")]
    Image(#[from] image::ImageError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invariant violation: {0}")]
    Invariant(String),
}

impl Error {
    /// Text shown to the user when this error ends a request.
    pub fn user_message(&self) -> String {
        let message = self.to_string();
        if message.trim().is_empty() {
            FALLBACK_ERROR_MESSAGE.to_string()
        } else {
            message
        }
    }

    /// True for network-level failures (connectivity, stalls).
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::StreamTimeout(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
