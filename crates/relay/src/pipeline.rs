//! Relay orchestration -- wires receiver, queue and dispatcher together.
//!
//! [`AlertRelay`] implements core's [`Pipeline`] trait so the daemon can
//! drive it through start/stop/health_check.
//!
//! # Internal architecture
//! ```text
//! UdpSocket -> SyslogReceiver -> EventQueue -> Dispatcher -> RuleTable -> NotifierSet
//!                  |                                |
//!             forward (opt)                    RateLimiter
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use alertik_core::config::{AlertikConfig, NotifierKind};
use alertik_core::error::{AlertikError, PipelineError};
use alertik_core::pipeline::{HealthStatus, Pipeline};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::dispatch::{Dispatcher, RelayStats};
use crate::error::RelayError;
use crate::limiter::{Clock, RateLimiter, SystemClock};
use crate::notifier::NotifierSet;
use crate::queue::EventQueue;
use crate::receiver::{ReceiverStats, SyslogReceiver};
use crate::rule::RuleTable;

/// Queue fill ratio above which the relay reports itself degraded
const DEGRADED_UTILIZATION: f64 = 0.9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RelayState {
    Initialized,
    Running,
    Stopped,
}

/// Alert relay
///
/// # Example
/// ```ignore
/// use alertik_relay::AlertRelayBuilder;
///
/// let mut relay = AlertRelayBuilder::new().config(config).build()?;
/// relay.start().await?;
/// tokio::signal::ctrl_c().await?;
/// relay.stop().await?;
/// ```
pub struct AlertRelay {
    config: AlertikConfig,
    state: RelayState,
    queue: Arc<EventQueue>,
    /// taken by start()
    dispatcher: Option<Dispatcher>,
    rule_count: usize,
    notifiers: Vec<NotifierKind>,
    stats: Arc<RelayStats>,
    receiver_stats: Option<Arc<ReceiverStats>>,
    local_addr: Option<SocketAddr>,
    cancel: CancellationToken,
    receiver_task: Option<JoinHandle<Result<(), RelayError>>>,
    dispatcher_task: Option<JoinHandle<()>>,
}

impl AlertRelay {
    pub fn state_name(&self) -> &str {
        match self.state {
            RelayState::Initialized => "initialized",
            RelayState::Running => "running",
            RelayState::Stopped => "stopped",
        }
    }

    /// Number of enabled rules.
    pub fn rule_count(&self) -> usize {
        self.rule_count
    }

    /// Notifiers referenced by at least one rule.
    pub fn notifiers(&self) -> &[NotifierKind] {
        &self.notifiers
    }

    /// Dispatch counters.
    pub fn stats(&self) -> Arc<RelayStats> {
        Arc::clone(&self.stats)
    }

    /// Receiver counters, once started.
    pub fn receiver_stats(&self) -> Option<Arc<ReceiverStats>> {
        self.receiver_stats.clone()
    }

    /// Bound UDP address, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn queue_utilization(&self) -> f64 {
        self.queue.utilization()
    }

    /// Cancelled when the relay shuts down, including when the receiver
    /// fails on its own.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn config(&self) -> &AlertikConfig {
        &self.config
    }
}

impl Pipeline for AlertRelay {
    async fn start(&mut self) -> Result<(), AlertikError> {
        match self.state {
            RelayState::Running => return Err(PipelineError::AlreadyRunning.into()),
            RelayState::Stopped => {
                return Err(PipelineError::InitFailed("relay cannot be restarted".to_owned()).into());
            }
            RelayState::Initialized => {}
        }

        info!("starting alert relay");

        let receiver = SyslogReceiver::bind(&self.config.receiver, Arc::clone(&self.queue)).await?;
        self.local_addr = Some(receiver.local_addr()?);
        self.receiver_stats = Some(receiver.stats());

        let Some(dispatcher) = self.dispatcher.take() else {
            return Err(PipelineError::InitFailed("dispatcher missing".to_owned()).into());
        };

        let cancel = self.cancel.clone();
        let queue = Arc::clone(&self.queue);
        self.receiver_task = Some(tokio::spawn(async move {
            let result = receiver.run(cancel.clone()).await;
            if let Err(e) = &result {
                error!(error = %e, "syslog receiver failed");
                cancel.cancel();
            }
            queue.close();
            result
        }));

        self.dispatcher_task = Some(tokio::spawn(dispatcher.run(Arc::clone(&self.queue))));

        self.state = RelayState::Running;
        info!(
            addr = ?self.local_addr,
            rules = self.rule_count,
            "alert relay started"
        );
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), AlertikError> {
        if self.state != RelayState::Running {
            return Err(PipelineError::NotRunning.into());
        }

        info!("stopping alert relay");
        self.cancel.cancel();
        self.queue.close();

        let mut result = Ok(());
        if let Some(task) = self.receiver_task.take() {
            result = match task.await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(AlertikError::from(e)),
                Err(e) => Err(PipelineError::Task(e.to_string()).into()),
            };
        }

        if self.queue.len() > 0 {
            info!(count = self.queue.len(), "draining remaining queued events");
        }
        if let Some(task) = self.dispatcher_task.take()
            && let Err(e) = task.await
        {
            error!(error = %e, "dispatcher task failed");
            if result.is_ok() {
                result = Err(PipelineError::Task(e.to_string()).into());
            }
        }

        self.state = RelayState::Stopped;
        info!(
            processed = self.stats.processed(),
            notified = self.stats.notified(),
            "alert relay stopped"
        );
        result
    }

    async fn health_check(&self) -> HealthStatus {
        match self.state {
            RelayState::Running => {
                if self.receiver_task.as_ref().is_some_and(JoinHandle::is_finished) {
                    return HealthStatus::Unhealthy("syslog receiver stopped".to_owned());
                }
                let utilization = self.queue.utilization();
                if utilization > DEGRADED_UTILIZATION {
                    HealthStatus::Degraded(format!(
                        "event queue utilization high: {:.1}%",
                        utilization * 100.0
                    ))
                } else {
                    HealthStatus::Healthy
                }
            }
            RelayState::Initialized => HealthStatus::Unhealthy("not started".to_owned()),
            RelayState::Stopped => HealthStatus::Unhealthy("stopped".to_owned()),
        }
    }
}

/// Alert relay builder
///
/// Validates the configuration, builds the rule table and sets up every
/// notifier the rules reference. All failures here are fatal.
pub struct AlertRelayBuilder {
    config: AlertikConfig,
    notifiers: Option<NotifierSet>,
    clock: Box<dyn Clock>,
}

impl AlertRelayBuilder {
    pub fn new() -> Self {
        Self {
            config: AlertikConfig::default(),
            notifiers: None,
            clock: Box::new(SystemClock),
        }
    }

    pub fn config(mut self, config: AlertikConfig) -> Self {
        self.config = config;
        self
    }

    /// Uses a prebuilt notifier table instead of the HTTP one.
    pub fn notifiers(mut self, notifiers: NotifierSet) -> Self {
        self.notifiers = Some(notifiers);
        self
    }

    /// Uses a custom clock for the cooldown.
    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }

    pub fn build(self) -> Result<AlertRelay, RelayError> {
        self.config.validate()?;

        let rules = RuleTable::build(&self.config.events)?;
        rules.log_summary();

        let notifiers = match self.notifiers {
            Some(notifiers) => notifiers,
            None => NotifierSet::from_config(&self.config.dispatch)?,
        };
        let used = rules.notifiers();
        notifiers.setup(&used, &self.config.notifiers)?;

        let limiter = RateLimiter::with_clock(self.config.dispatch.cooldown_secs, self.clock);
        let rule_count = rules.len();
        let dispatcher = Dispatcher::new(rules, notifiers, limiter);

        Ok(AlertRelay {
            queue: Arc::new(EventQueue::new(self.config.receiver.queue_capacity)),
            stats: dispatcher.stats(),
            dispatcher: Some(dispatcher),
            rule_count,
            notifiers: used,
            config: self.config,
            state: RelayState::Initialized,
            receiver_stats: None,
            local_addr: None,
            cancel: CancellationToken::new(),
            receiver_task: None,
            dispatcher_task: None,
        })
    }
}

impl Default for AlertRelayBuilder {
    fn default() -> Self {
        Self::new()
    }
}
