//! The top-level polling loop.

use crate::artifacts::{ArtifactKind, ArtifactStore};
use crate::availability::{check_availability, Availability};
use crate::challenge::SiteChallenge;
use crate::error::{PollError, Result};
use crate::form::fill_booking_form;
use crate::gate::OperatorGate;
use slotwatch_browser::{BrowserActions, SessionProvider};
use slotwatch_captcha::CaptchaResolver;
use slotwatch_core::{AppConfig, Timestamp};
use slotwatch_notify::Notifier;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

const SEPARATOR: &str = "============================================================";

/// How a poll cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Slots were offered and the operator was alerted
    AppointmentFound,
    /// Nothing available (or not determinable)
    NoSlots,
    /// Navigation, CAPTCHA, form or driver failure
    Error,
    /// Shutdown was requested while the cycle ran
    Interrupted,
}

/// Record of one navigate-through-check pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollCycle {
    /// One-based cycle number
    pub cycle_index: u32,
    /// When the cycle started
    pub started_at: Timestamp,
    /// How it ended
    pub outcome: CycleOutcome,
    /// Alert text, no-slots reason or error message
    pub message: String,
}

/// Drives poll cycles against the booking page.
///
/// Every cycle runs in its own browser session, which is closed before the
/// cycle returns whatever the outcome.
pub struct AppointmentPoller<P: SessionProvider> {
    config: Arc<AppConfig>,
    provider: Arc<P>,
    resolver: CaptchaResolver,
    notifier: Arc<dyn Notifier>,
    gate: Arc<dyn OperatorGate>,
    artifacts: ArtifactStore,
    shutdown: CancellationToken,
}

impl<P: SessionProvider> AppointmentPoller<P> {
    /// Create a poller.
    pub fn new(
        config: Arc<AppConfig>,
        provider: Arc<P>,
        resolver: CaptchaResolver,
        notifier: Arc<dyn Notifier>,
        gate: Arc<dyn OperatorGate>,
    ) -> Self {
        let artifacts = ArtifactStore::new(config.paths.screenshot_dir.clone());
        Self {
            config,
            provider,
            resolver,
            notifier,
            gate,
            artifacts,
            shutdown: CancellationToken::new(),
        }
    }

    /// Stop polling when `token` is cancelled.
    ///
    /// A cycle in flight is abandoned and its session closed.
    #[must_use]
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    /// Artifact store used for screenshots.
    pub fn artifacts(&self) -> &ArtifactStore {
        &self.artifacts
    }

    /// Poll until the cycle ceiling is reached or shutdown is requested.
    ///
    /// Returns `Ok` only on shutdown, otherwise
    /// [`PollError::MaxCyclesExceeded`].
    pub async fn run(&self) -> Result<()> {
        let max_cycles = self.config.polling.max_cycles;
        let interval = self.config.polling.interval();

        for index in 1..=max_cycles {
            if self.shutdown.is_cancelled() {
                return Ok(());
            }
            let cycle = self.run_cycle(index).await;
            match cycle.outcome {
                CycleOutcome::AppointmentFound => {
                    info!("Resuming polling...");
                    continue;
                }
                CycleOutcome::Interrupted => return Ok(()),
                CycleOutcome::NoSlots => {
                    info!("Next check in {} seconds...", interval.as_secs());
                }
                CycleOutcome::Error => {
                    info!("Retrying in {} seconds...", interval.as_secs());
                }
            }
            tokio::select! {
                () = self.shutdown.cancelled() => return Ok(()),
                () = tokio::time::sleep(interval) => {}
            }
        }

        error!("Max retries ({}) reached. Stopping.", max_cycles);
        Err(PollError::MaxCyclesExceeded { cycles: max_cycles })
    }

    /// Run one cycle. Failures are folded into the returned record.
    pub async fn run_cycle(&self, index: u32) -> PollCycle {
        let started_at = Timestamp::now();
        info!("{}", SEPARATOR);
        info!(cycle = index, "Attempt {}/{}", index, self.config.polling.max_cycles);

        let session = match self.provider.open_session().await {
            Ok(session) => session,
            Err(e) => {
                error!(cycle = index, "Could not open browser session: {}", e);
                return PollCycle {
                    cycle_index: index,
                    started_at,
                    outcome: CycleOutcome::Error,
                    message: e.to_string(),
                };
            }
        };

        let (outcome, message) = match self.evaluate(&session).await {
            Some(Ok(done)) => done,
            Some(Err(e)) => {
                error!(cycle = index, "Error during check: {}", e);
                self.screenshot(&session, ArtifactKind::Error).await;
                (CycleOutcome::Error, e.to_string())
            }
            None => {
                warn!(cycle = index, "Shutdown requested, abandoning cycle");
                (CycleOutcome::Interrupted, "shutdown requested".to_string())
            }
        };

        info!("Closing browser session...");
        self.provider.close_session(session).await;

        PollCycle {
            cycle_index: index,
            started_at,
            outcome,
            message,
        }
    }

    /// One check without looping or sleeping.
    ///
    /// Errors are returned after the session is closed.
    pub async fn check_once(&self) -> Result<PollCycle> {
        let started_at = Timestamp::now();
        let session = self.provider.open_session().await?;

        let result = self.evaluate(&session).await;
        self.provider.close_session(session).await;

        let (outcome, message) = match result {
            Some(done) => done?,
            None => (CycleOutcome::Interrupted, "shutdown requested".to_string()),
        };
        Ok(PollCycle {
            cycle_index: 1,
            started_at,
            outcome,
            message,
        })
    }

    /// [`Self::act`] raced against shutdown. `None` when shutdown won.
    async fn evaluate(&self, page: &P::Session) -> Option<Result<(CycleOutcome, String)>> {
        tokio::select! {
            biased;
            () = self.shutdown.cancelled() => None,
            result = self.act(page) => Some(result),
        }
    }

    /// Check the page and act on the result: alert and pause on a found
    /// slot, screenshot when there is none.
    async fn act(&self, page: &P::Session) -> Result<(CycleOutcome, String)> {
        match self.check(page).await? {
            Availability::Found { message, .. } => {
                self.alert_found(page, &message).await;
                self.pause_for_booking().await;
                Ok((CycleOutcome::AppointmentFound, message))
            }
            Availability::NoSlots { reason } => {
                warn!("{}", reason);
                self.screenshot(page, ArtifactKind::NoAppointment).await;
                Ok((CycleOutcome::NoSlots, reason))
            }
        }
    }

    /// Navigate, get past the CAPTCHA, fill the form and classify the page.
    async fn check(&self, page: &P::Session) -> Result<Availability> {
        let config = &*self.config;

        info!("Navigating to captcha page...");
        page.navigate(&config.target.url, config.browser.navigation_timeout())
            .await
            .map_err(PollError::Navigation)?;
        info!("Captcha page loaded");

        let mut challenge = SiteChallenge::new(
            page,
            &config.site,
            &config.pacing,
            config.captcha.image_wait(),
        );
        if config.captcha.debug {
            challenge = challenge.with_samples(&self.artifacts);
        }
        let resolution = self
            .resolver
            .resolve(&challenge, self.notifier.as_ref(), config.captcha.timeout())
            .await?;
        if !resolution.confirmed {
            warn!("Continuing without confirmation that the CAPTCHA was accepted");
        }

        fill_booking_form(page, &config.site, &config.form, &config.pacing).await?;
        check_availability(page, &config.site, &config.pacing).await
    }

    async fn alert_found(&self, page: &P::Session, message: &str) {
        info!("{}", SEPARATOR);
        info!("APPOINTMENT SLOT FOUND!");
        info!("{}", message);
        if let Ok(url) = page.current_url().await {
            info!("Page URL: {}", url);
        }
        info!("{}", SEPARATOR);

        self.screenshot(page, ArtifactKind::AppointmentFound).await;

        self.notifier
            .notify_all(
                "APPOINTMENT AVAILABLE!",
                &format!(
                    "An appointment slot is available on the Polish consulate website!\n\n\
                     {message}\n\nGo book it NOW!"
                ),
            )
            .await;
        self.notifier
            .speak("Appointment available! Go to the browser now and book your appointment!")
            .await;
        self.notifier.alert(10).await;
    }

    async fn pause_for_booking(&self) {
        if !self.config.polling.pause_on_found {
            return;
        }
        info!("Browser is paused, book your appointment now!");
        info!("Press Enter to continue polling.");
        self.gate.wait_for_resume().await;
    }

    async fn screenshot(&self, page: &P::Session, kind: ArtifactKind) {
        match self.artifacts.save_page(page, kind).await {
            Ok(path) => info!("Screenshot saved: {}", path.display()),
            Err(e) => warn!("Could not save screenshot: {}", e),
        }
    }
}
