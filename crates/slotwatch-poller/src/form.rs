//! Booking form selections.

use crate::error::{PollError, Result};
use slotwatch_browser::{BrowserActions, Locator};
use slotwatch_core::{FormConfig, PacingConfig, SiteConfig};
use tokio::time::sleep;
use tracing::info;

/// Apply the three configured selections in order: service type, location,
/// party size.
pub async fn fill_booking_form<B>(
    page: &B,
    site: &SiteConfig,
    form: &FormConfig,
    pacing: &PacingConfig,
) -> Result<()>
where
    B: BrowserActions + ?Sized,
{
    info!("Filling booking form...");
    info!("  Service type: {}", form.service_type);
    info!("  Location: {}", form.location);
    info!("  People: {}", form.party_size);

    let steps = [
        ("service type", form.service_type.as_str(), true),
        ("location", form.location.as_str(), false),
        ("party size", form.party_size.as_str(), false),
    ];
    let last = steps.len() - 1;

    for (index, (field, value, exact)) in steps.into_iter().enumerate() {
        let option = if exact {
            Locator::exact_text(site.option_css.clone(), value)
        } else {
            Locator::with_text(site.option_css.clone(), value)
        };
        let form_error = |source| PollError::Form { field, source };

        page.click(&site.dropdown(index)).await.map_err(form_error)?;
        sleep(PacingConfig::ms(pacing.form_step_ms)).await;
        page.click(&option).await.map_err(form_error)?;

        let settle = if index == last {
            pacing.form_done_ms
        } else {
            pacing.form_step_ms
        };
        sleep(PacingConfig::ms(settle)).await;
        info!("Selected {}: {}", field, value);
    }
    Ok(())
}
