//! Retry policy for investigation attempts.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Bounded exponential backoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first. Values below 1 are treated as 1.
    pub max_attempts: u32,
    /// Delay before the first retry (milliseconds).
    pub initial_delay_ms: u64,
    /// Upper bound for any single delay (milliseconds).
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 1_000,
            max_delay_ms: 10_000,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn once() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Delay before retry number `retry` (1-based):
    /// `min(initial_delay * 2^(retry - 1), max_delay)`.
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u64.saturating_pow(retry.saturating_sub(1));
        let delay = self.initial_delay_ms.saturating_mul(factor);
        Duration::from_millis(delay.min(self.max_delay_ms))
    }

    /// Every delay a run exhausting its attempts would sleep, in order.
    pub fn schedule(&self) -> Vec<Duration> {
        (1..self.attempts()).map(|retry| self.backoff(retry)).collect()
    }
}
