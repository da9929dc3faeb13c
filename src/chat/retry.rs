//! Backoff policy and the sleep seam it waits through.

use std::time::Duration;

use async_trait::async_trait;

use crate::config::ChatConfig;

/// Bounded exponential backoff: up to `max_retries` extra attempts, waiting
/// `initial_delay` before the first and doubling each time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(1000),
        }
    }
}

impl From<&ChatConfig> for RetryPolicy {
    fn from(config: &ChatConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            initial_delay: config.initial_backoff(),
        }
    }
}

impl RetryPolicy {
    /// The waits in order, one per retry.
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        (0..self.max_retries).map(|n| self.initial_delay.saturating_mul(2u32.saturating_pow(n)))
    }
}

/// Waits between attempts. Tests substitute a recorder.
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, delay: Duration);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}
