//! Minimum-interval submission limiter.
//!
//! Tracks the start time of the last accepted submission. Owned by the
//! form orchestrator; nothing about it is process-global or persisted.

use std::time::Duration;

use tokio::time::Instant;

/// Default minimum gap between accepted submissions.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_millis(5000);

/// Result of a [`RateLimiter::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    /// Whether a new submission may start now.
    pub allowed: bool,
    /// Time left until the interval elapses (zero when allowed).
    pub remaining: Duration,
}

impl RateDecision {
    /// Remaining wait in milliseconds.
    pub fn remaining_ms(&self) -> u128 {
        self.remaining.as_millis()
    }

    /// Remaining wait rounded up to whole seconds, for display.
    pub fn remaining_secs(&self) -> u64 {
        let secs = self.remaining.as_secs();
        if self.remaining.subsec_nanos() > 0 {
            secs.saturating_add(1)
        } else {
            secs
        }
    }
}

/// Enforces a fixed minimum interval measured from the last accepted start.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    min_interval: Duration,
    last_accepted: Option<Instant>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_INTERVAL)
    }
}

impl RateLimiter {
    /// Create a limiter with the given minimum interval.
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_accepted: None,
        }
    }

    /// Configured minimum interval.
    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Decide whether a submission starting at `now` may proceed.
    ///
    /// Does not record anything; call [`RateLimiter::record`] once the
    /// attempt is accepted.
    pub fn check(&self, now: Instant) -> RateDecision {
        let Some(last) = self.last_accepted else {
            return RateDecision {
                allowed: true,
                remaining: Duration::ZERO,
            };
        };

        let elapsed = now.saturating_duration_since(last);
        if elapsed >= self.min_interval {
            RateDecision {
                allowed: true,
                remaining: Duration::ZERO,
            }
        } else {
            RateDecision {
                allowed: false,
                remaining: self.min_interval.saturating_sub(elapsed),
            }
        }
    }

    /// Record `now` as the start of an accepted submission.
    pub fn record(&mut self, now: Instant) {
        self.last_accepted = Some(now);
    }
}
