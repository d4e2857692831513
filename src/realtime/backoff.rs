//! Reconnect backoff policy
//!
//! `delay(attempt) = min(base * growth^attempt, cap)`. The attempt
//! counter never decreases except on successful connect (`reset`) or
//! the explicit reset that the table feed performs after exhausting its
//! attempts. The two exhaustion behaviors are intentionally different
//! per feed and must not be unified: order feeds give up and surface a
//! `failed` status, the table feed resets and keeps retrying forever.

use std::time::Duration;

use crate::config::FeedSettings;

/// What a feed does once `max_attempts` is reached
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExhaustPolicy {
    /// Stop reconnecting; the caller observes `failed` and must retry manually
    GiveUp,
    /// Reset the attempt counter and keep retrying indefinitely
    ResetAndRetry,
}

/// Outcome of asking the policy for the next reconnect
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectDecision {
    /// Wait this long, then attempt to reconnect
    Retry(Duration),
    /// Max attempts reached; apply the feed's exhaustion behavior
    Exhausted,
}

/// Per-channel reconnect state
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    settings: FeedSettings,
    on_exhaust: ExhaustPolicy,
    attempt: u32,
}

impl ReconnectPolicy {
    pub fn new(settings: FeedSettings, on_exhaust: ExhaustPolicy) -> Self {
        Self {
            settings,
            on_exhaust,
            attempt: 0,
        }
    }

    /// Backoff delay for a given attempt number (pure, for inspection)
    pub fn delay(&self, attempt: u32) -> Duration {
        let raw = (self.settings.base_delay_ms as f64) * self.settings.growth.powi(attempt as i32);
        let capped = raw.min(self.settings.max_delay_ms as f64);
        Duration::from_millis(capped as u64)
    }

    /// Decide the next reconnect, consuming one attempt
    pub fn next(&mut self) -> ReconnectDecision {
        if self.attempt >= self.settings.max_attempts {
            return ReconnectDecision::Exhausted;
        }
        let delay = self.delay(self.attempt);
        self.attempt += 1;
        ReconnectDecision::Retry(delay)
    }

    /// Reset the attempt counter (successful connect, or the table feed's
    /// post-exhaustion reset)
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    pub fn on_exhaust(&self) -> ExhaustPolicy {
        self.on_exhaust
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}
