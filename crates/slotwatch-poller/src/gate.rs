//! Operator-controlled pause after a slot is found.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::warn;

/// Blocks the poller until the operator lets it continue.
#[async_trait]
pub trait OperatorGate: Send + Sync {
    /// Wait for the operator to resume polling.
    async fn wait_for_resume(&self);
}

/// Waits for Enter on standard input.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinGate;

#[async_trait]
impl OperatorGate for StdinGate {
    async fn wait_for_resume(&self) {
        let mut line = String::new();
        let mut stdin = BufReader::new(tokio::io::stdin());
        match stdin.read_line(&mut line).await {
            Ok(0) => warn!("Standard input closed, resuming without confirmation"),
            Ok(_) => {}
            Err(e) => warn!("Could not read standard input ({}), resuming", e),
        }
    }
}

/// Never pauses.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoPause;

#[async_trait]
impl OperatorGate for NoPause {
    async fn wait_for_resume(&self) {}
}
