//! Relay orchestration -- assembly, lifecycle and shutdown.
//!
//! The [`Orchestrator`] is the central coordinator of the daemon. It loads
//! configuration, builds the relay (rule table, notifier setup), starts it
//! and runs the main loop until a shutdown signal arrives or the relay
//! stops on its own.
//!
//! # Shutdown Triggers
//!
//! - `SIGTERM` (from systemd, Docker, or `kill`)
//! - `SIGINT` (Ctrl+C)
//! - the relay cancelling itself (receiver failure, full queue under `abort`)

use std::fmt;
use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::Result;

use alertik_core::config::AlertikConfig;
use alertik_core::pipeline::Pipeline;
use alertik_relay::{AlertRelay, AlertRelayBuilder};

use crate::health::{DaemonHealth, HEALTH_REPORT_INTERVAL_SECS};

/// Why the main loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// SIGTERM or SIGINT.
    Signal(&'static str),
    /// The relay cancelled its own shutdown token.
    RelayStopped,
}

/// The main daemon orchestrator.
pub struct Orchestrator {
    /// Loaded and validated configuration.
    config: AlertikConfig,
    relay: AlertRelay,
    /// Daemon start time (for uptime reporting).
    start_time: Instant,
}

impl Orchestrator {
    /// Load configuration and build the orchestrator.
    ///
    /// This performs the following steps:
    /// 1. Load `alertik.toml` (if given) and apply environment overrides
    /// 2. Validate the configuration
    /// 3. Build the rule table and set up the notifiers it uses
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read or parsed
    /// - Configuration validation fails
    /// - A rule is invalid or a used notifier lacks credentials
    pub async fn build(config_path: Option<&Path>) -> Result<Self> {
        let config = AlertikConfig::load(config_path)
            .await
            .map_err(|e| anyhow::anyhow!("failed to load config: {}", e))?;
        Self::build_from_config(config)
    }

    /// Build from an already-loaded configuration.
    pub fn build_from_config(config: AlertikConfig) -> Result<Self> {
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("config validation failed: {}", e))?;

        let relay = AlertRelayBuilder::new()
            .config(config.clone())
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build alert relay: {}", e))?;

        tracing::info!(rules = relay.rule_count(), "orchestrator initialized");

        Ok(Self {
            config,
            relay,
            start_time: Instant::now(),
        })
    }

    /// Start the relay and block until shutdown.
    ///
    /// Returns an error if the relay fails to start or if it stopped with
    /// an error (for example the receiver aborting on a full queue).
    pub async fn run(&mut self) -> Result<()> {
        tracing::info!("starting alert relay");
        self.relay.start().await?;

        tracing::info!("entering main event loop");
        let reason = self.wait_for_shutdown().await?;
        match reason {
            ShutdownReason::Signal(signal) => {
                tracing::info!(signal = signal, "shutdown signal received");
            }
            ShutdownReason::RelayStopped => {
                tracing::warn!("relay stopped unexpectedly, shutting down");
            }
        }

        self.shutdown().await
    }

    /// Stop the relay and log final counters.
    async fn shutdown(&mut self) -> Result<()> {
        tracing::info!("stopping alert relay");
        let result = self.relay.stop().await;
        self.health().await.log();
        result.map_err(|e| anyhow::anyhow!("alert relay stopped with error: {}", e))
    }

    async fn wait_for_shutdown(&self) -> Result<ShutdownReason> {
        let token = self.relay.shutdown_token();
        let signal = wait_for_shutdown_signal();
        tokio::pin!(signal);

        let mut interval = tokio::time::interval(Duration::from_secs(HEALTH_REPORT_INTERVAL_SECS));
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // the first tick completes immediately
        interval.tick().await;

        loop {
            tokio::select! {
                result = &mut signal => return Ok(ShutdownReason::Signal(result?)),
                _ = token.cancelled() => return Ok(ShutdownReason::RelayStopped),
                _ = interval.tick() => self.health().await.log(),
            }
        }
    }

    /// Get the current health report.
    pub async fn health(&self) -> DaemonHealth {
        DaemonHealth::collect(&self.relay, self.start_time).await
    }

    /// Startup summary (printed by `--validate`).
    pub fn summary(&self) -> StartupSummary {
        let receiver = &self.config.receiver;
        StartupSummary {
            bind: receiver.bind.clone(),
            queue_capacity: receiver.queue_capacity,
            queue_full_policy: receiver.queue_full_policy.to_string(),
            forward: match (&receiver.forward_host, receiver.forward_port) {
                (Some(host), Some(port)) => Some(format!("{}:{}", host, port)),
                _ => None,
            },
            static_rules: self.config.events.static_events.len(),
            dynamic_rules: self.config.events.dynamic_events.len(),
            notifiers: self
                .relay
                .notifiers()
                .iter()
                .map(|kind| kind.to_string())
                .collect(),
            cooldown_secs: self.config.dispatch.cooldown_secs,
        }
    }

    /// Get a reference to the loaded configuration.
    pub fn config(&self) -> &AlertikConfig {
        &self.config
    }

    /// Get a reference to the relay.
    pub fn relay(&self) -> &AlertRelay {
        &self.relay
    }
}

/// What the daemon will do once started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartupSummary {
    pub bind: String,
    pub queue_capacity: usize,
    pub queue_full_policy: String,
    pub forward: Option<String>,
    pub static_rules: usize,
    pub dynamic_rules: usize,
    pub notifiers: Vec<String>,
    pub cooldown_secs: u64,
}

impl fmt::Display for StartupSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "listen:        udp://{}", self.bind)?;
        writeln!(
            f,
            "queue:         {} slots, {} when full",
            self.queue_capacity, self.queue_full_policy
        )?;
        writeln!(
            f,
            "forward:       {}",
            self.forward.as_deref().unwrap_or("disabled")
        )?;
        writeln!(
            f,
            "rules:         {} static, {} dynamic",
            self.static_rules, self.dynamic_rules
        )?;
        if self.notifiers.is_empty() {
            writeln!(f, "notifiers:     none")?;
        } else {
            writeln!(f, "notifiers:     {}", self.notifiers.join(", "))?;
        }
        write!(f, "cooldown:      {}s", self.cooldown_secs)
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT).
///
/// Returns the name of the signal that triggered the shutdown.
///
/// # Errors
///
/// Returns an error if signal handlers cannot be installed.
async fn wait_for_shutdown_signal() -> Result<&'static str> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("failed to install SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("failed to install SIGINT handler: {}", e))?;

    Ok(tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    })
}
