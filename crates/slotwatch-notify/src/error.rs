//! Error types for notification delivery.

use thiserror::Error;

/// Errors raised while delivering a notification.
///
/// These never cross the [`crate::Notifier`] boundary; channels log them.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// Desktop toast could not be shown
    #[error("desktop notification failed: {0}")]
    Desktop(String),

    /// Platform helper program failed or is missing
    #[error("{program} failed: {reason}")]
    Command {
        /// Program that was spawned
        program: String,
        /// What went wrong
        reason: String,
    },

    /// Audio output could not be opened or played
    #[error("audio playback failed: {0}")]
    Sound(String),

    /// Chat API rejected the message
    #[error("chat API error (HTTP {status}): {body}")]
    ChatApi {
        /// HTTP status code
        status: u16,
        /// Response body
        body: String,
    },

    /// HTTP transport failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type for notification operations.
pub type Result<T> = std::result::Result<T, NotifyError>;
