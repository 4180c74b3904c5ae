//! Command-line interface.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Watch a CAPTCHA-gated booking page and alert when a slot opens up.
#[derive(Parser, Debug)]
#[command(name = "slotwatch", version, about)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Force a visible browser window regardless of configuration
    #[arg(long, global = true)]
    pub headed: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Poll continuously until the cycle ceiling is reached (default)
    Watch,
    /// Run a single check and exit
    Once,
    /// Capture CAPTCHA samples and log what every strategy reads
    CaptchaDebug {
        /// Number of CAPTCHA images to sample
        #[arg(short, long, default_value_t = 5)]
        samples: u32,
    },
}

impl Cli {
    /// The subcommand to run, `watch` when none was given.
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Watch)
    }
}
