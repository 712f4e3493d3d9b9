//! Pipeline trait -- lifecycle contract for long-running modules.

use std::future::Future;
use std::pin::Pin;

use crate::error::AlertikError;

/// Boxed, sendable future (for dyn-compatible async traits)
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Module health
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// operating normally
    Healthy,
    /// running but impaired
    Degraded(String),
    /// not operating
    Unhealthy(String),
}

impl HealthStatus {
    /// `true` for [`HealthStatus::Healthy`]
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }

    /// `true` for [`HealthStatus::Unhealthy`]
    pub fn is_unhealthy(&self) -> bool {
        matches!(self, Self::Unhealthy(_))
    }
}

/// Start/stop/health lifecycle implemented by the relay.
pub trait Pipeline: Send {
    /// Spawns the background tasks.
    fn start(&mut self) -> impl Future<Output = Result<(), AlertikError>> + Send;

    /// Signals shutdown and waits for the background tasks to finish.
    fn stop(&mut self) -> impl Future<Output = Result<(), AlertikError>> + Send;

    /// Reports current health.
    fn health_check(&self) -> impl Future<Output = HealthStatus> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_predicates() {
        assert!(HealthStatus::Healthy.is_healthy());
        assert!(!HealthStatus::Degraded("queue 95% full".to_owned()).is_healthy());
        assert!(HealthStatus::Unhealthy("stopped".to_owned()).is_unhealthy());
    }
}
