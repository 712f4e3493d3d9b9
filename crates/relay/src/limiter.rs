//! Global notification cooldown.
//!
//! [`RateLimiter`] is a single gate shared by every rule and notifier: once
//! an event has been notified, events arriving within `threshold` whole
//! seconds are skipped without rule evaluation. The state is owned by the
//! relay task and only updated after a successful dispatch.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, SystemTime};

/// Wall-clock source
pub trait Clock: Send + Sync {
    fn now(&self) -> SystemTime;
}

/// Production clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }
}

impl<C: Clock + ?Sized> Clock for Box<C> {
    fn now(&self) -> SystemTime {
        (**self).now()
    }
}

/// Manually driven clock for tests. Clones share the same instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<SystemTime>>,
}

impl ManualClock {
    pub fn new(start: SystemTime) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Moves the clock forward.
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(SystemTime::UNIX_EPOCH + Duration::from_secs(1_700_000_000))
    }
}

impl Clock for ManualClock {
    fn now(&self) -> SystemTime {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cooldown gate
pub struct RateLimiter {
    /// instant of the last successful dispatch
    last_sent_at: Option<SystemTime>,
    /// cooldown (whole seconds)
    threshold_secs: u64,
    clock: Box<dyn Clock>,
}

impl RateLimiter {
    /// Creates a limiter on the system clock.
    pub fn new(threshold_secs: u64) -> Self {
        Self::with_clock(threshold_secs, SystemClock)
    }

    pub fn with_clock(threshold_secs: u64, clock: impl Clock + 'static) -> Self {
        Self {
            last_sent_at: None,
            threshold_secs,
            clock: Box::new(clock),
        }
    }

    /// Whether an event arriving now falls inside the cooldown.
    ///
    /// Never true before the first recorded send. A clock that moved
    /// backwards counts as zero elapsed seconds.
    pub fn is_within_cooldown(&self) -> bool {
        let Some(last) = self.last_sent_at else {
            return false;
        };
        let elapsed = self
            .clock
            .now()
            .duration_since(last)
            .unwrap_or(Duration::ZERO)
            .as_secs();
        elapsed <= self.threshold_secs
    }

    /// Starts a new cooldown period at the current instant.
    pub fn record_send(&mut self) {
        self.last_sent_at = Some(self.clock.now());
    }

    pub fn last_sent_at(&self) -> Option<SystemTime> {
        self.last_sent_at
    }

    pub fn threshold_secs(&self) -> u64 {
        self.threshold_secs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(threshold: u64) -> (RateLimiter, ManualClock) {
        let clock = ManualClock::default();
        (RateLimiter::with_clock(threshold, clock.clone()), clock)
    }

    #[test]
    fn not_limited_before_first_send() {
        let (limiter, _) = limiter(10);
        assert!(!limiter.is_within_cooldown());
        assert!(limiter.last_sent_at().is_none());
    }

    #[test]
    fn limited_up_to_and_including_threshold() {
        let (mut limiter, clock) = limiter(10);
        limiter.record_send();
        assert!(limiter.is_within_cooldown());

        clock.advance(Duration::from_secs(5));
        assert!(limiter.is_within_cooldown());

        // 10.9 s elapsed is 10 whole seconds: still inside
        clock.advance(Duration::from_millis(5_900));
        assert!(limiter.is_within_cooldown());

        clock.advance(Duration::from_millis(100));
        assert!(!limiter.is_within_cooldown());
    }

    #[test]
    fn record_send_restarts_cooldown() {
        let (mut limiter, clock) = limiter(10);
        limiter.record_send();
        clock.advance(Duration::from_secs(30));
        assert!(!limiter.is_within_cooldown());

        limiter.record_send();
        assert!(limiter.is_within_cooldown());
    }

    #[test]
    fn zero_threshold_limits_within_same_second() {
        let (mut limiter, clock) = limiter(0);
        limiter.record_send();
        assert!(limiter.is_within_cooldown());
        clock.advance(Duration::from_secs(1));
        assert!(!limiter.is_within_cooldown());
    }
}
