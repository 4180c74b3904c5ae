//! Error types for CAPTCHA resolution.

use thiserror::Error;

/// Errors raised while preprocessing, recognizing or resolving a CAPTCHA.
#[derive(Error, Debug)]
pub enum CaptchaError {
    /// Source image could not be decoded or re-encoded
    #[error("preprocess failed: {0}")]
    Preprocess(String),

    /// OCR engine fault for one strategy
    #[error("recognition failed: {0}")]
    Recognition(String),

    /// Whole resolution exceeded its deadline
    #[error("CAPTCHA resolution timed out after {timeout_ms}ms")]
    Timeout {
        /// Deadline in milliseconds
        timeout_ms: u64,
    },

    /// Nobody solved the CAPTCHA during the manual wait
    #[error("manual CAPTCHA wait expired after {wait_ms}ms")]
    FallbackTimedOut {
        /// Manual wait in milliseconds
        wait_ms: u64,
    },

    /// Page interaction failed (capture, submit, probe)
    #[error("driver error: {0}")]
    Driver(String),

    /// Debug artifact could not be written
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for CAPTCHA operations.
pub type Result<T> = std::result::Result<T, CaptchaError>;

impl From<image::ImageError> for CaptchaError {
    fn from(err: image::ImageError) -> Self {
        Self::Preprocess(err.to_string())
    }
}
