//! Shared types used across the Slotwatch workspace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Wall-clock instant used for cycle bookkeeping and artifact names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Current UTC time.
    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Wrap an existing `DateTime`.
    #[must_use]
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        Self(dt)
    }

    /// Inner `DateTime`.
    #[must_use]
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Timestamp safe for use inside file names, e.g. `20260512-093015123`.
    #[must_use]
    pub fn file_stamp(&self) -> String {
        self.0.format("%Y%m%d-%H%M%S%3f").to_string()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

/// Element locator understood by the browser collaborator.
///
/// `css` selects candidate elements, `text` narrows them to those whose
/// accessible name or visible text contains (or, with `exact`, equals) the
/// given string, case-insensitively. `nth` picks among the remaining matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locator {
    /// CSS selector for candidate elements
    pub css: String,
    /// Optional text / accessible-name filter
    #[serde(default)]
    pub text: Option<String>,
    /// Require the whole name to match instead of a substring
    #[serde(default)]
    pub exact: bool,
    /// Zero-based index among the matching elements
    #[serde(default)]
    pub nth: usize,
}

impl Locator {
    /// Locator matching the first element for a CSS selector.
    #[must_use]
    pub fn css(css: impl Into<String>) -> Self {
        Self {
            css: css.into(),
            text: None,
            exact: false,
            nth: 0,
        }
    }

    /// Locator matching elements whose name contains `text`.
    #[must_use]
    pub fn with_text(css: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::css(css)
        }
    }

    /// Locator matching elements whose name equals `text`.
    #[must_use]
    pub fn exact_text(css: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            exact: true,
            ..Self::with_text(css, text)
        }
    }

    /// Same locator, picking the `n`-th match.
    #[must_use]
    pub fn nth(mut self, n: usize) -> Self {
        self.nth = n;
        self
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.css)?;
        if let Some(text) = &self.text {
            let op = if self.exact { "=" } else { "~" };
            write!(f, "[name{op}\"{text}\"]")?;
        }
        if self.nth > 0 {
            write!(f, ">>nth={}", self.nth)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_file_stamp_has_no_separators() {
        let dt = Utc.with_ymd_and_hms(2026, 5, 12, 9, 30, 15).unwrap();
        let stamp = Timestamp::from_datetime(dt).file_stamp();
        assert_eq!(stamp, "20260512-093015000");
        assert!(!stamp.contains(':'));
    }

    #[test]
    fn test_locator_display() {
        assert_eq!(Locator::css("mat-select").nth(3).to_string(), "mat-select>>nth=3");
        assert_eq!(
            Locator::exact_text("mat-option", "Wiza krajowa").to_string(),
            "mat-option[name=\"Wiza krajowa\"]"
        );
    }

    #[test]
    fn test_locator_deserializes_with_defaults() {
        let loc: Locator = toml::from_str(r#"css = "button""#).expect("parse locator");
        assert_eq!(loc, Locator::css("button"));
    }
}
