//! Polling with bounded exponential backoff and cooperative cancellation
//!
//! Every wait in the crate (receipts, ticket status, retry transactions) goes
//! through [`poll_until`]. A poll never has side effects on chain; cancelling
//! only stops the local loop.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::config::BridgeConfig;
use crate::error::BridgeError;

/// Backoff schedule for a polling loop
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Delay before the second attempt
    pub initial_interval: Duration,
    /// Upper bound for any single delay
    pub max_interval: Duration,
    /// Growth factor applied after every unsuccessful attempt
    pub multiplier: f64,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            initial_interval: Duration::from_millis(1000),
            max_interval: Duration::from_secs(30),
            multiplier: 1.5,
        }
    }
}

impl PollConfig {
    pub fn from_bridge_config(config: &BridgeConfig) -> Self {
        Self {
            initial_interval: Duration::from_millis(config.poll_interval_ms),
            max_interval: Duration::from_millis(config.max_poll_interval_ms),
            multiplier: config.backoff_multiplier,
        }
    }

    /// Delay to wait after `attempt` unsuccessful attempts (0-based)
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.max(1.0).powi(attempt.min(64) as i32);
        let millis = (self.initial_interval.as_millis() as f64 * factor)
            .min(self.max_interval.as_millis() as f64);
        Duration::from_millis(millis as u64)
    }
}

/// Cloneable cancellation signal shared between a caller and its polling loops
#[derive(Debug, Clone)]
pub struct CancelToken {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Signal every loop holding a clone of this token to stop
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once [`cancel`](Self::cancel) has been called
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in self, so the channel cannot close under us
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

/// Repeatedly run `op` until it yields a value
///
/// - `Ok(Some(v))` ends the loop with `v`
/// - `Ok(None)` means "not yet" and schedules another attempt
/// - transient errors are logged and retried
/// - any other error is returned immediately
///
/// Fails with [`BridgeError::MessageTimeout`] once `timeout` has elapsed and
/// with [`BridgeError::Cancelled`] when `cancel` fires.
pub async fn poll_until<T, F, Fut>(
    what: &str,
    config: &PollConfig,
    timeout: Duration,
    cancel: Option<&CancelToken>,
    mut op: F,
) -> Result<T, BridgeError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>, BridgeError>>,
{
    let deadline = Instant::now() + timeout;
    let mut attempt: u32 = 0;

    loop {
        if cancel.is_some_and(|c| c.is_cancelled()) {
            return Err(BridgeError::Cancelled);
        }

        match op().await {
            Ok(Some(value)) => return Ok(value),
            Ok(None) => {
                debug!(what = what, attempt = attempt, "Not ready yet");
            }
            Err(e) if e.is_transient() => {
                warn!(what = what, attempt = attempt, error = %e, "Transient error while polling");
            }
            Err(e) => return Err(e),
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(BridgeError::MessageTimeout {
                what: what.to_string(),
                timeout_ms: timeout.as_millis() as u64,
            });
        }

        let delay = config.backoff_for_attempt(attempt).min(deadline - now);
        attempt = attempt.saturating_add(1);

        match cancel {
            Some(token) => {
                tokio::select! {
                    _ = token.cancelled() => return Err(BridgeError::Cancelled),
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            None => tokio::time::sleep(delay).await,
        }
    }
}
