//! CAPTCHA sampling for tuning the preprocessing strategies.

use anyhow::Context;
use slotwatch_browser::{BrowserActions, SessionProvider};
use slotwatch_captcha::{pick_best, StrategySelector};
use slotwatch_core::{AppConfig, PacingConfig};
use slotwatch_poller::ArtifactStore;
use tracing::{info, warn};

/// Load the page `samples` times, store each CAPTCHA and log every
/// strategy's reading of it.
pub async fn run_captcha_debug<P: SessionProvider>(
    config: &AppConfig,
    provider: &P,
    selector: &StrategySelector,
    store: &ArtifactStore,
    samples: u32,
) -> anyhow::Result<()> {
    info!("CAPTCHA debug mode: collecting {} samples", samples);

    let session = provider
        .open_session()
        .await
        .context("could not open browser session")?;
    let result = collect(config, &session, selector, store, samples).await;
    provider.close_session(session).await;
    result?;

    info!(
        "Done! Check {} for the samples and preprocessed variants",
        store.captcha_debug_dir().display()
    );
    Ok(())
}

async fn collect<B: BrowserActions + ?Sized>(
    config: &AppConfig,
    page: &B,
    selector: &StrategySelector,
    store: &ArtifactStore,
    samples: u32,
) -> anyhow::Result<()> {
    let site = &config.site;

    for i in 1..=samples {
        info!("--- Sample {}/{} ---", i, samples);

        page.navigate(&config.target.url, config.browser.navigation_timeout())
            .await
            .context("could not load target page")?;
        page.wait_for(&site.captcha_image, config.captcha.image_wait())
            .await
            .context("CAPTCHA image did not appear")?;
        tokio::time::sleep(PacingConfig::ms(config.pacing.captcha_render_ms)).await;

        let png = page.screenshot_element(&site.captcha_image).await?;
        let path = store.save_captcha_sample(&format!("{i}-original"), &png)?;
        info!("Original saved: {}", path.display());

        let results = selector.select_all(&png).await;
        for result in &results {
            info!(
                "  {:<10} {:?} (confidence {:.1}%, score {:.1})",
                result.strategy_label,
                result.candidate_text,
                result.confidence,
                result.composite_score
            );
        }
        match pick_best(&results) {
            Some(best) => info!(
                "  Final answer: {:?} ({})",
                best.candidate_text, best.strategy_label
            ),
            None => warn!("  No plausible reading"),
        }

        if i < samples && page.is_visible(&site.refresh_button).await.unwrap_or(false) {
            if let Err(e) = page.click(&site.refresh_button).await {
                warn!("Could not refresh CAPTCHA: {}", e);
            }
            tokio::time::sleep(PacingConfig::ms(config.pacing.refresh_ms)).await;
        }
    }

    Ok(())
}
