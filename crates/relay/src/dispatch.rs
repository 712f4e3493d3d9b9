//! Event dispatch -- the queue's consumer.
//!
//! For every event popped from the queue, [`Dispatcher`] applies the global
//! cooldown, evaluates the rule table, hands each built message to its
//! notifier and restarts the cooldown when at least one send succeeded.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use alertik_core::LogEvent;
use tracing::{debug, info};

use crate::limiter::RateLimiter;
use crate::notifier::NotifierSet;
use crate::queue::EventQueue;
use crate::rule::RuleTable;

/// Dispatch counters
#[derive(Debug, Default)]
pub struct RelayStats {
    processed: AtomicU64,
    matched: AtomicU64,
    unhandled: AtomicU64,
    suppressed: AtomicU64,
    notified: AtomicU64,
    send_failures: AtomicU64,
}

impl RelayStats {
    /// Events taken from the queue.
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// Rule matches (an event may match several rules).
    pub fn matched(&self) -> u64 {
        self.matched.load(Ordering::Relaxed)
    }

    /// Events no rule matched.
    pub fn unhandled(&self) -> u64 {
        self.unhandled.load(Ordering::Relaxed)
    }

    /// Events skipped by the cooldown.
    pub fn suppressed(&self) -> u64 {
        self.suppressed.load(Ordering::Relaxed)
    }

    /// Messages delivered.
    pub fn notified(&self) -> u64 {
        self.notified.load(Ordering::Relaxed)
    }

    /// Messages that failed to send.
    pub fn send_failures(&self) -> u64 {
        self.send_failures.load(Ordering::Relaxed)
    }
}

/// Rule evaluation and notification, serialised on one task
pub struct Dispatcher {
    rules: RuleTable,
    notifiers: NotifierSet,
    limiter: RateLimiter,
    stats: Arc<RelayStats>,
}

impl Dispatcher {
    pub fn new(rules: RuleTable, notifiers: NotifierSet, limiter: RateLimiter) -> Self {
        Self {
            rules,
            notifiers,
            limiter,
            stats: Arc::new(RelayStats::default()),
        }
    }

    pub fn stats(&self) -> Arc<RelayStats> {
        Arc::clone(&self.stats)
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Processes one event and returns the number of rules it matched.
    ///
    /// Events inside the cooldown are not evaluated at all and report zero.
    pub async fn process_event(&mut self, event: &LogEvent) -> usize {
        self.stats.processed.fetch_add(1, Ordering::Relaxed);
        info!(
            received_at = %event.formatted_timestamp(),
            text = %event.text,
            "log event"
        );

        if self.limiter.is_within_cooldown() {
            self.stats.suppressed.fetch_add(1, Ordering::Relaxed);
            info!(
                cooldown_secs = self.limiter.threshold_secs(),
                "ignoring event, too close to the previous notification"
            );
            return 0;
        }

        let evaluation = self.rules.evaluate(event);
        if evaluation.matched == 0 {
            self.stats.unhandled.fetch_add(1, Ordering::Relaxed);
            debug!(text = %event.text, "not handled");
            return 0;
        }
        self.stats
            .matched
            .fetch_add(evaluation.matched as u64, Ordering::Relaxed);

        let mut delivered = false;
        for dispatch in &evaluation.dispatches {
            match self.notifiers.send(dispatch.notifier, &dispatch.message).await {
                Ok(()) => {
                    delivered = true;
                    self.stats.notified.fetch_add(1, Ordering::Relaxed);
                    info!(
                        rule_id = %dispatch.rule_id,
                        notifier = %dispatch.notifier,
                        "notification sent"
                    );
                }
                Err(_) => {
                    self.stats.send_failures.fetch_add(1, Ordering::Relaxed);
                }
            }
        }

        if delivered {
            self.limiter.record_send();
        }

        evaluation.matched
    }

    /// Pops and processes events until the queue is closed and drained.
    pub async fn run(mut self, queue: Arc<EventQueue>) {
        info!(rules = self.rules.len(), "dispatcher started");
        while let Some(event) = queue.pop().await {
            self.process_event(&event).await;
        }
        info!(
            processed = self.stats.processed(),
            notified = self.stats.notified(),
            "dispatcher stopped"
        );
    }
}
