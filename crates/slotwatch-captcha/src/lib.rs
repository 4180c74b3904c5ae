//! Slotwatch Captcha - turns a noisy CAPTCHA image into an accepted answer.
//!
//! The pieces, leaf first:
//!
//! - [`Preprocessor`]: grayscale, upscale, sharpen, stretch, binarize
//! - [`Recognizer`]: OCR boundary, [`TesseractRecognizer`] in production
//! - [`normalize`]: cleanup of raw OCR text
//! - [`StrategySelector`]: runs the strategy [`CATALOG`] and scores readings
//! - [`CaptchaResolver`]: bounded attempts, manual fallback, one deadline
//!
//! The page itself is reached through [`CaptchaChallenge`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod challenge;
pub mod error;
pub mod normalize;
pub mod preprocess;
pub mod recognizer;
pub mod resolver;
pub mod strategy;

pub use challenge::{CaptchaChallenge, SubmissionState};
pub use error::{CaptchaError, Result};
pub use normalize::normalize;
pub use preprocess::Preprocessor;
pub use recognizer::{Recognition, Recognizer, TesseractRecognizer};
pub use resolver::{
    AttemptOutcome, CaptchaAttempt, CaptchaResolver, Resolution, ResolutionMethod,
};
pub use strategy::{pick_best, StrategyConfig, StrategyResult, StrategySelector, CATALOG};
