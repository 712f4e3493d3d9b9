//! Periodic health reporting.
//!
//! The orchestrator snapshots the relay into a [`DaemonHealth`] report on
//! a fixed interval and logs it. Anything other than healthy is logged at
//! warn level.

use std::time::Instant;

use alertik_core::pipeline::{HealthStatus, Pipeline};
use alertik_relay::AlertRelay;

/// Seconds between health reports.
pub const HEALTH_REPORT_INTERVAL_SECS: u64 = 300;

/// Health and counters snapshot for the whole daemon.
#[derive(Debug, Clone)]
pub struct DaemonHealth {
    /// Relay health status.
    pub status: HealthStatus,
    /// Seconds since the daemon started.
    pub uptime_secs: u64,
    /// Datagrams received.
    pub received: u64,
    /// Events dropped because the queue was full.
    pub dropped: u64,
    /// Events taken off the queue.
    pub processed: u64,
    /// Events skipped by the cooldown.
    pub suppressed: u64,
    /// Notifications delivered.
    pub notified: u64,
    /// Notifications that failed.
    pub send_failures: u64,
    /// Queue fill ratio (0.0 - 1.0).
    pub queue_utilization: f64,
}

impl DaemonHealth {
    /// Snapshot the relay.
    pub async fn collect(relay: &AlertRelay, start_time: Instant) -> Self {
        let stats = relay.stats();
        let (received, dropped) = relay
            .receiver_stats()
            .map(|r| (r.received(), r.dropped()))
            .unwrap_or_default();

        Self {
            status: relay.health_check().await,
            uptime_secs: start_time.elapsed().as_secs(),
            received,
            dropped,
            processed: stats.processed(),
            suppressed: stats.suppressed(),
            notified: stats.notified(),
            send_failures: stats.send_failures(),
            queue_utilization: relay.queue_utilization(),
        }
    }

    /// Log the report.
    pub fn log(&self) {
        match &self.status {
            HealthStatus::Healthy => tracing::info!(
                uptime_secs = self.uptime_secs,
                received = self.received,
                dropped = self.dropped,
                processed = self.processed,
                suppressed = self.suppressed,
                notified = self.notified,
                send_failures = self.send_failures,
                "health report"
            ),
            HealthStatus::Degraded(reason) | HealthStatus::Unhealthy(reason) => tracing::warn!(
                reason = %reason,
                uptime_secs = self.uptime_secs,
                dropped = self.dropped,
                queue_utilization = self.queue_utilization,
                send_failures = self.send_failures,
                "relay not healthy"
            ),
        }
    }
}
