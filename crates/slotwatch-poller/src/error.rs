//! Error types for polling.

use slotwatch_browser::BrowserError;
use slotwatch_captcha::CaptchaError;
use thiserror::Error;

/// Errors raised by a poll cycle or the polling loop.
#[derive(Debug, Error)]
pub enum PollError {
    /// Target page could not be loaded
    #[error("could not load target page: {0}")]
    Navigation(#[source] BrowserError),

    /// CAPTCHA could not be resolved in time
    #[error("CAPTCHA not resolved: {0}")]
    Captcha(#[from] CaptchaError),

    /// A booking form selection failed
    #[error("could not select {field}: {source}")]
    Form {
        /// Form field being set
        field: &'static str,
        /// Underlying browser failure
        #[source]
        source: BrowserError,
    },

    /// Any other browser failure
    #[error("browser error: {0}")]
    Browser(#[from] BrowserError),

    /// Screenshot or debug artifact could not be written
    #[error("artifact error: {0}")]
    Artifact(#[from] std::io::Error),

    /// The loop hit its cycle ceiling
    #[error("max retries ({cycles}) reached")]
    MaxCyclesExceeded {
        /// Cycles that were run
        cycles: u32,
    },
}

/// Result type for polling operations.
pub type Result<T> = std::result::Result<T, PollError>;
