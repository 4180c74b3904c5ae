//! Slotwatch - polls a CAPTCHA-gated booking page and alerts the operator
//! as soon as an appointment slot is offered.

mod cli;
mod debug;
mod logging;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands};
use slotwatch_browser::BrowserEngine;
use slotwatch_captcha::{CaptchaResolver, Preprocessor, StrategySelector, TesseractRecognizer};
use slotwatch_core::{AppConfig, PacingConfig};
use slotwatch_notify::Notifier;
use slotwatch_poller::{AppointmentPoller, ArtifactStore, OperatorGate, PollError, StdinGate};
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    let mut config =
        AppConfig::load_with_env(cli.config.as_deref()).context("failed to load configuration")?;
    if cli.headed {
        config.browser.headless = false;
    }
    config
        .paths
        .ensure_dirs()
        .context("failed to create output directories")?;
    logging::init_tracing(&config.paths.log_file)?;

    log_banner(&config);
    let config = Arc::new(config);

    info!("Launching browser...");
    let engine = Arc::new(
        BrowserEngine::launch(
            &config.browser,
            PacingConfig::ms(config.pacing.min_action_gap_ms),
        )
        .await
        .context("failed to launch browser")?,
    );

    let outcome = run_command(cli.command(), &config, &engine).await;
    engine.shutdown().await;
    outcome
}

async fn run_command(
    command: Commands,
    config: &Arc<AppConfig>,
    engine: &Arc<BrowserEngine>,
) -> anyhow::Result<ExitCode> {
    match command {
        Commands::Watch => {
            let poller = build_poller(config, engine).with_shutdown(shutdown_on_ctrl_c());
            match poller.run().await {
                Ok(()) => {
                    info!("Interrupted, shutting down");
                    Ok(ExitCode::SUCCESS)
                }
                Err(PollError::MaxCyclesExceeded { .. }) => Ok(ExitCode::FAILURE),
                Err(e) => Err(e.into()),
            }
        }
        Commands::Once => {
            let poller = build_poller(config, engine).with_shutdown(shutdown_on_ctrl_c());
            match poller.check_once().await {
                Ok(cycle) => {
                    info!(outcome = ?cycle.outcome, "{}", cycle.message);
                    Ok(ExitCode::SUCCESS)
                }
                Err(e) => {
                    error!("Check failed: {}", e);
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Commands::CaptchaDebug { samples } => {
            let store = ArtifactStore::new(config.paths.screenshot_dir.clone());
            let preprocessor = Preprocessor::new().with_debug_dir(store.captcha_debug_dir());
            let selector = build_selector(config, preprocessor);
            debug::run_captcha_debug(config, engine.as_ref(), &selector, &store, samples).await?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Token cancelled on the first Ctrl-C.
fn shutdown_on_ctrl_c() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => trigger.cancel(),
            Err(e) => warn!("Could not listen for Ctrl-C: {}", e),
        }
    });
    token
}

fn build_selector(config: &AppConfig, preprocessor: Preprocessor) -> StrategySelector {
    let recognizer = Arc::new(TesseractRecognizer::from_config(&config.captcha));
    StrategySelector::new(recognizer, preprocessor)
}

fn build_resolver(config: &AppConfig) -> CaptchaResolver {
    let mut preprocessor = Preprocessor::new();
    if config.captcha.debug {
        let store = ArtifactStore::new(config.paths.screenshot_dir.clone());
        preprocessor = preprocessor.with_debug_dir(store.captcha_debug_dir());
    }
    CaptchaResolver::new(build_selector(config, preprocessor), &config.captcha)
        .with_manual_poll(PacingConfig::ms(config.pacing.manual_poll_ms))
}

fn build_poller(
    config: &Arc<AppConfig>,
    engine: &Arc<BrowserEngine>,
) -> AppointmentPoller<BrowserEngine> {
    let notifier: Arc<dyn Notifier> =
        Arc::new(slotwatch_notify::from_config(&config.notifications));
    let gate: Arc<dyn OperatorGate> = Arc::new(StdinGate);

    AppointmentPoller::new(
        Arc::clone(config),
        Arc::clone(engine),
        build_resolver(config),
        notifier,
        gate,
    )
}

fn log_banner(config: &AppConfig) {
    info!("============================================================");
    info!("Slotwatch appointment checker");
    info!("URL: {}", config.target.url);
    info!(
        "Service: {} | Location: {} | People: {}",
        config.form.service_type, config.form.location, config.form.party_size
    );
    info!(
        "Poll interval: {}s | Max cycles: {}",
        config.polling.interval().as_secs(),
        config.polling.max_cycles
    );
    info!(
        "CAPTCHA: {} attempts, {}s timeout",
        config.captcha.max_attempts,
        config.captcha.timeout().as_secs()
    );
    info!("Browser session is opened and closed for every check");
    info!("============================================================");
}
