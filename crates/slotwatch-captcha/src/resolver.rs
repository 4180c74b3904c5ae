//! CAPTCHA resolution state machine.
//!
//! OCR attempts run up to a ceiling, refreshing the image between failures.
//! After the ceiling the operator is asked to solve it by hand. The whole
//! sequence runs under one deadline: a watcher task cancels a token when the
//! deadline passes and every suspension point below is guarded by that token.

use crate::challenge::{CaptchaChallenge, SubmissionState};
use crate::error::{CaptchaError, Result};
use crate::strategy::{StrategyResult, StrategySelector};
use slotwatch_core::CaptchaConfig;
use slotwatch_notify::Notifier;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// How one OCR attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// Booking form appeared after submitting
    Solved,
    /// No strategy produced a plausible reading
    LowConfidence,
    /// CAPTCHA was still shown after submitting
    Rejected,
    /// Capture or submission failed
    Errored,
    /// Neither the CAPTCHA nor the form was visible after submitting
    Unconfirmed,
}

/// Record of one OCR attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptchaAttempt {
    /// One-based attempt number
    pub attempt_index: u32,
    /// Reading that was submitted, if any
    pub best_result: Option<StrategyResult>,
    /// How the attempt ended
    pub outcome: AttemptOutcome,
}

/// Who got past the CAPTCHA.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionMethod {
    /// OCR answer accepted
    Automatic,
    /// Operator solved it in the browser
    Manual,
}

/// Successful resolution.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// How it was solved
    pub method: ResolutionMethod,
    /// `false` when success was assumed without seeing the booking form
    pub confirmed: bool,
    /// Every OCR attempt, in order
    pub attempts: Vec<CaptchaAttempt>,
}

/// Cancellation token tied to the resolution deadline.
struct Deadline {
    token: CancellationToken,
    timeout_ms: u64,
}

impl Deadline {
    /// Run `fut` unless the deadline passes first; the losing future is dropped.
    async fn guard<F: Future>(&self, fut: F) -> Result<F::Output> {
        tokio::select! {
            biased;
            () = self.token.cancelled() => Err(CaptchaError::Timeout {
                timeout_ms: self.timeout_ms,
            }),
            output = fut => Ok(output),
        }
    }
}

/// Resolves the CAPTCHA on one page.
#[derive(Clone)]
pub struct CaptchaResolver {
    selector: StrategySelector,
    max_attempts: u32,
    manual_wait: Duration,
    manual_poll: Duration,
}

impl CaptchaResolver {
    /// Resolver using the attempt ceiling and manual wait from config.
    #[must_use]
    pub fn new(selector: StrategySelector, config: &CaptchaConfig) -> Self {
        Self {
            selector,
            max_attempts: config.max_attempts.max(1),
            manual_wait: config.manual_wait(),
            manual_poll: Duration::from_secs(1),
        }
    }

    /// How often the manual fallback checks for the booking form.
    #[must_use]
    pub fn with_manual_poll(mut self, interval: Duration) -> Self {
        self.manual_poll = interval;
        self
    }

    /// The strategy selector used for each attempt.
    #[must_use]
    pub fn selector(&self) -> &StrategySelector {
        &self.selector
    }

    /// Get past the CAPTCHA within `timeout`.
    ///
    /// Fails with [`CaptchaError::Timeout`] when the deadline passes, whatever
    /// step was running, and with [`CaptchaError::FallbackTimedOut`] when the
    /// operator did not solve it during the manual wait.
    pub async fn resolve(
        &self,
        challenge: &dyn CaptchaChallenge,
        notifier: &dyn Notifier,
        timeout: Duration,
    ) -> Result<Resolution> {
        let deadline = Deadline {
            token: CancellationToken::new(),
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        };

        let watcher = {
            let token = deadline.token.clone();
            tokio::spawn(async move {
                tokio::time::sleep(timeout).await;
                token.cancel();
            })
        };

        let result = self.run(challenge, notifier, &deadline).await;
        watcher.abort();

        if let Err(CaptchaError::Timeout { .. }) = &result {
            warn!(
                "CAPTCHA solving timed out after {}s, will retry",
                timeout.as_secs()
            );
        }
        result
    }

    async fn run(
        &self,
        challenge: &dyn CaptchaChallenge,
        notifier: &dyn Notifier,
        deadline: &Deadline,
    ) -> Result<Resolution> {
        let mut attempts = Vec::new();

        for index in 1..=self.max_attempts {
            info!(attempt = index, "CAPTCHA OCR attempt {}/{}", index, self.max_attempts);
            let attempt = self.attempt(index, challenge, deadline).await?;
            let outcome = attempt.outcome;
            attempts.push(attempt);

            match outcome {
                AttemptOutcome::Solved => {
                    return Ok(Resolution {
                        method: ResolutionMethod::Automatic,
                        confirmed: true,
                        attempts,
                    })
                }
                AttemptOutcome::Unconfirmed => {
                    return Ok(Resolution {
                        method: ResolutionMethod::Automatic,
                        confirmed: false,
                        attempts,
                    })
                }
                AttemptOutcome::LowConfidence
                | AttemptOutcome::Rejected
                | AttemptOutcome::Errored => {}
            }
        }

        self.manual_fallback(challenge, notifier, deadline).await?;
        Ok(Resolution {
            method: ResolutionMethod::Manual,
            confirmed: true,
            attempts,
        })
    }

    async fn attempt(
        &self,
        index: u32,
        challenge: &dyn CaptchaChallenge,
        deadline: &Deadline,
    ) -> Result<CaptchaAttempt> {
        let mut best_result = None;
        let outcome = match self.solve_once(challenge, deadline, &mut best_result).await {
            Ok(outcome) => outcome,
            Err(e @ CaptchaError::Timeout { .. }) => return Err(e),
            Err(e) => {
                warn!(attempt = index, "OCR attempt {} failed: {}", index, e);
                AttemptOutcome::Errored
            }
        };
        Ok(CaptchaAttempt {
            attempt_index: index,
            best_result,
            outcome,
        })
    }

    async fn solve_once(
        &self,
        challenge: &dyn CaptchaChallenge,
        deadline: &Deadline,
        best_result: &mut Option<StrategyResult>,
    ) -> Result<AttemptOutcome> {
        let image = deadline.guard(challenge.capture()).await??;

        let Some(best) = deadline.guard(self.selector.select(&image)).await? else {
            warn!("OCR produced no plausible reading, refreshing CAPTCHA");
            self.refresh(challenge, deadline).await?;
            return Ok(AttemptOutcome::LowConfidence);
        };

        let answer = best.candidate_text.clone();
        info!(strategy = best.strategy_label, "OCR result {:?}, submitting", answer);
        *best_result = Some(best);

        deadline.guard(challenge.submit(&answer)).await??;

        match deadline.guard(challenge.probe()).await?? {
            SubmissionState::FormVisible => {
                info!("CAPTCHA solved automatically ({:?})", answer);
                Ok(AttemptOutcome::Solved)
            }
            SubmissionState::CaptchaVisible => {
                warn!("CAPTCHA answer {:?} was rejected, refreshing", answer);
                self.refresh(challenge, deadline).await?;
                Ok(AttemptOutcome::Rejected)
            }
            SubmissionState::Neither => {
                warn!(
                    "Neither CAPTCHA nor booking form visible after submitting {:?}; \
                     assuming the page moved on",
                    answer
                );
                Ok(AttemptOutcome::Unconfirmed)
            }
        }
    }

    /// Refresh failures are logged; only the deadline propagates.
    async fn refresh(&self, challenge: &dyn CaptchaChallenge, deadline: &Deadline) -> Result<()> {
        match deadline.guard(challenge.refresh()).await? {
            Ok(true) => debug!("CAPTCHA refreshed"),
            Ok(false) => debug!("No refresh control visible"),
            Err(e) => warn!("Could not refresh CAPTCHA: {}", e),
        }
        Ok(())
    }

    async fn manual_fallback(
        &self,
        challenge: &dyn CaptchaChallenge,
        notifier: &dyn Notifier,
        deadline: &Deadline,
    ) -> Result<()> {
        info!("Auto-solve failed, please solve the CAPTCHA manually in the browser window");
        deadline
            .guard(async {
                notifier
                    .notify(
                        "CAPTCHA Required",
                        "Auto-solve failed. Please solve the CAPTCHA manually.",
                    )
                    .await;
                notifier.alert(3).await;
            })
            .await?;

        info!("Waiting for the CAPTCHA to be solved and the booking form to load...");
        let started = Instant::now();
        loop {
            match deadline.guard(challenge.form_visible()).await? {
                Ok(true) => {
                    info!("CAPTCHA solved manually, booking form loaded");
                    return Ok(());
                }
                Ok(false) => {}
                Err(e) => debug!("Booking form check failed: {}", e),
            }

            if started.elapsed() >= self.manual_wait {
                return Err(CaptchaError::FallbackTimedOut {
                    wait_ms: u64::try_from(self.manual_wait.as_millis()).unwrap_or(u64::MAX),
                });
            }
            deadline.guard(tokio::time::sleep(self.manual_poll)).await?;
        }
    }
}
