//! Browser automation boundary for the watched booking page.
//!
//! Provides isolated browser sessions with interaction pacing, and the
//! [`BrowserActions`] / [`SessionProvider`] seams the rest of the workspace
//! is written against.

pub mod actions;
pub mod engine;
pub mod error;
mod script;
pub mod session;

pub use actions::{BrowserActions, SessionProvider};
pub use engine::BrowserEngine;
pub use error::{BrowserError, Result};
pub use session::BrowserSession;
pub use slotwatch_core::Locator;
