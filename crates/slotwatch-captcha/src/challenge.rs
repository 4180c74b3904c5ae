//! The page-side operations the resolver needs.

use crate::error::Result;
use async_trait::async_trait;

/// What the page shows after an answer was submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionState {
    /// Booking form appeared: the answer was accepted
    FormVisible,
    /// CAPTCHA is still there: the answer was rejected
    CaptchaVisible,
    /// Neither is visible
    Neither,
}

/// A CAPTCHA-protected page as seen by the resolver.
#[async_trait]
pub trait CaptchaChallenge: Send + Sync {
    /// Screenshot of the current CAPTCHA image.
    async fn capture(&self) -> Result<Vec<u8>>;

    /// Type `answer` and submit it.
    async fn submit(&self, answer: &str) -> Result<()>;

    /// Classify the page after a submission.
    async fn probe(&self) -> Result<SubmissionState>;

    /// Ask for a new CAPTCHA image. Returns `false` when no refresh control exists.
    async fn refresh(&self) -> Result<bool>;

    /// Whether the booking form is visible.
    async fn form_visible(&self) -> Result<bool>;
}
