//! The watched site's CAPTCHA widget, driven through the browser.

use crate::artifacts::ArtifactStore;
use async_trait::async_trait;
use slotwatch_browser::{BrowserActions, BrowserError};
use slotwatch_captcha::{CaptchaChallenge, CaptchaError, SubmissionState};
use slotwatch_core::{PacingConfig, SiteConfig};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

fn driver(err: BrowserError) -> CaptchaError {
    CaptchaError::Driver(err.to_string())
}

/// [`CaptchaChallenge`] over a browser page.
pub struct SiteChallenge<'a, B: ?Sized> {
    page: &'a B,
    site: &'a SiteConfig,
    pacing: &'a PacingConfig,
    image_wait: Duration,
    samples: Option<&'a ArtifactStore>,
}

impl<'a, B> SiteChallenge<'a, B>
where
    B: BrowserActions + ?Sized,
{
    /// Challenge on `page` using the site's locators and pacing.
    pub fn new(
        page: &'a B,
        site: &'a SiteConfig,
        pacing: &'a PacingConfig,
        image_wait: Duration,
    ) -> Self {
        Self {
            page,
            site,
            pacing,
            image_wait,
            samples: None,
        }
    }

    /// Keep every captured CAPTCHA image in the store's debug directory.
    #[must_use]
    pub fn with_samples(mut self, store: &'a ArtifactStore) -> Self {
        self.samples = Some(store);
        self
    }
}

#[async_trait]
impl<B> CaptchaChallenge for SiteChallenge<'_, B>
where
    B: BrowserActions + ?Sized,
{
    async fn capture(&self) -> slotwatch_captcha::Result<Vec<u8>> {
        self.page
            .wait_for(&self.site.captcha_image, self.image_wait)
            .await
            .map_err(driver)?;
        sleep(PacingConfig::ms(self.pacing.captcha_render_ms)).await;

        let png = self
            .page
            .screenshot_element(&self.site.captcha_image)
            .await
            .map_err(driver)?;

        if let Some(store) = self.samples {
            match store.save_captcha_sample("original", &png) {
                Ok(path) => debug!("CAPTCHA sample saved: {}", path.display()),
                Err(e) => warn!("Could not save CAPTCHA sample: {}", e),
            }
        }
        Ok(png)
    }

    async fn submit(&self, answer: &str) -> slotwatch_captcha::Result<()> {
        self.page
            .fill(&self.site.captcha_input, answer)
            .await
            .map_err(driver)?;
        sleep(PacingConfig::ms(self.pacing.typing_ms)).await;

        self.page
            .click(&self.site.submit_button)
            .await
            .map_err(driver)?;
        sleep(PacingConfig::ms(self.pacing.submit_ms)).await;
        Ok(())
    }

    async fn probe(&self) -> slotwatch_captcha::Result<SubmissionState> {
        if self.form_visible().await.unwrap_or(false) {
            return Ok(SubmissionState::FormVisible);
        }
        let captcha = self
            .page
            .is_visible(&self.site.captcha_image)
            .await
            .unwrap_or(false);
        Ok(if captcha {
            SubmissionState::CaptchaVisible
        } else {
            SubmissionState::Neither
        })
    }

    async fn refresh(&self) -> slotwatch_captcha::Result<bool> {
        if !self
            .page
            .is_visible(&self.site.refresh_button)
            .await
            .map_err(driver)?
        {
            return Ok(false);
        }
        self.page
            .click(&self.site.refresh_button)
            .await
            .map_err(driver)?;
        sleep(PacingConfig::ms(self.pacing.refresh_ms)).await;
        Ok(true)
    }

    async fn form_visible(&self) -> slotwatch_captcha::Result<bool> {
        self.page
            .is_visible(&self.site.form_marker)
            .await
            .map_err(driver)
    }
}
