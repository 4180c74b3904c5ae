//! Classification of the booking page after the form is filled.

use crate::error::Result;
use slotwatch_browser::BrowserActions;
use slotwatch_core::{PacingConfig, SiteConfig};
use tokio::time::sleep;
use tracing::{debug, info};

/// Index of the date dropdown among the form's dropdowns.
const DATE_PICKER: usize = 3;

/// Characters of page text kept in the indeterminate diagnostic.
const SNIPPET_LEN: usize = 300;

/// What the booking page offers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    /// Slots are offered
    Found {
        /// Offered dates, empty when they could not be read
        dates: Vec<String>,
        /// Alert text
        message: String,
    },
    /// Nothing to book, or the page could not be classified
    NoSlots {
        /// Why
        reason: String,
    },
}

/// Classify the page state.
///
/// In order: a known "no slots" phrase, disabled form without a date picker,
/// a date picker or continue button, otherwise indeterminate. Indeterminate
/// pages count as no slots.
pub async fn check_availability<B>(
    page: &B,
    site: &SiteConfig,
    pacing: &PacingConfig,
) -> Result<Availability>
where
    B: BrowserActions + ?Sized,
{
    info!("Checking for available appointment slots...");
    sleep(PacingConfig::ms(pacing.availability_ms)).await;

    let page_text = page.page_text().await?;

    if let Some(phrase) = no_slots_phrase(&page_text, &site.no_slots_phrases) {
        debug!("Matched no-slots phrase {:?}", phrase);
        return Ok(Availability::NoSlots {
            reason: format!("No appointments available, all slots are booked (\"{phrase}\")"),
        });
    }

    let date_picker = page
        .is_visible(&site.dropdown(DATE_PICKER))
        .await
        .unwrap_or(false);
    let continue_button = page
        .is_visible(&site.submit_button)
        .await
        .unwrap_or(false);
    let form_disabled = page
        .attribute(&site.dropdown(0), "aria-disabled")
        .await
        .ok()
        .flatten()
        .is_some_and(|value| value == "true");

    if form_disabled && !date_picker {
        return Ok(Availability::NoSlots {
            reason: "No appointments available, form fields disabled and no date picker shown"
                .to_string(),
        });
    }

    if date_picker || continue_button {
        let dates = read_dates(page, site, pacing).await;
        let listed = if dates.is_empty() {
            "(could not read options)".to_string()
        } else {
            dates.join(", ")
        };
        return Ok(Availability::Found {
            dates,
            message: format!("APPOINTMENTS FOUND! Available dates: {listed}"),
        });
    }

    Ok(Availability::NoSlots {
        reason: format!(
            "Unable to determine availability. Page text snippet: \"{}\"",
            snippet(&page_text)
        ),
    })
}

/// First configured phrase contained in `text`, ignoring case.
fn no_slots_phrase<'p>(text: &str, phrases: &'p [String]) -> Option<&'p str> {
    let haystack = text.to_lowercase();
    phrases
        .iter()
        .find(|phrase| haystack.contains(&phrase.to_lowercase()))
        .map(String::as_str)
}

/// Open the date dropdown, read its options, close it again. Best effort.
async fn read_dates<B>(page: &B, site: &SiteConfig, pacing: &PacingConfig) -> Vec<String>
where
    B: BrowserActions + ?Sized,
{
    if let Err(e) = page.click(&site.dropdown(DATE_PICKER)).await {
        debug!("Could not open date picker: {}", e);
        return Vec::new();
    }
    sleep(PacingConfig::ms(pacing.form_step_ms)).await;

    let dates = match page.texts(&site.options()).await {
        Ok(texts) => texts
            .into_iter()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect(),
        Err(e) => {
            debug!("Could not read date options: {}", e);
            Vec::new()
        }
    };

    if let Err(e) = page.press_escape().await {
        debug!("Could not close date picker: {}", e);
    }
    dates
}

fn snippet(text: &str) -> String {
    text.chars().take(SNIPPET_LEN).collect::<String>().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phrase_match_ignores_case() {
        let site = SiteConfig::default();
        assert_eq!(
            no_slots_phrase("Obecnie BRAK WOLNYCH TERMINÓW.", &site.no_slots_phrases),
            Some("brak wolnych termin")
        );
        assert_eq!(no_slots_phrase("Wybierz termin", &site.no_slots_phrases), None);
    }

    #[test]
    fn test_snippet_is_trimmed_and_bounded() {
        let long = format!("   {}", "ż".repeat(400));
        let cut = snippet(&long);
        assert_eq!(cut.chars().count(), SNIPPET_LEN - 3);
        assert!(!cut.starts_with(' '));
    }
}
