//! Exponential backoff reconnection bookkeeping.

use std::time::Duration;

/// How long a connection must stay up before a drop counts as a transient
/// blip rather than a failed connect.
pub const MIN_STABLE_CONNECTION: Duration = Duration::from_millis(3000);

/// Grace window after a successful (re)connect; once it elapses without a
/// drop, the attempt counter and delay are forgiven.
pub const STABILITY_RESET_WINDOW: Duration = Duration::from_millis(10_000);

/// Immutable reconnection policy, supplied at wrapper construction.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    /// Whether auto-reconnect may ever run.
    pub enabled: bool,
    /// Ceiling on consecutive reconnect attempts since the last reset.
    pub max_attempts: u32,
    /// Delay before the first reconnection attempt.
    pub initial_delay: Duration,
    /// Upper bound on the doubling delay.
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 5,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(32_000),
        }
    }
}

/// Tracks consecutive reconnect attempts and the next backoff delay.
///
/// The delay to arm is read with `current_delay()` before the timer fires;
/// `advance()` is called when it fires, doubling the delay (clamped to the
/// policy maximum) and counting the attempt.
#[derive(Debug)]
pub struct RetrySchedule {
    policy: ReconnectPolicy,
    attempts: u32,
    current_delay: Duration,
}

impl RetrySchedule {
    pub fn new(policy: ReconnectPolicy) -> Self {
        let current_delay = policy.initial_delay;
        Self {
            policy,
            attempts: 0,
            current_delay,
        }
    }

    /// True once the attempt ceiling has been reached.
    pub fn exhausted(&self) -> bool {
        self.attempts >= self.policy.max_attempts
    }

    /// Delay to arm for the next attempt.
    pub fn current_delay(&self) -> Duration {
        self.current_delay
    }

    /// Count an attempt and double the delay, clamped to the maximum.
    pub fn advance(&mut self) {
        self.attempts = self.attempts.saturating_add(1);
        self.current_delay = (self.current_delay * 2).min(self.policy.max_delay);
    }

    /// Reset after the connection has stayed stable for the grace window.
    pub fn reset(&mut self) {
        self.attempts = 0;
        self.current_delay = self.policy.initial_delay;
    }

    /// Consecutive attempts since the last reset.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}
