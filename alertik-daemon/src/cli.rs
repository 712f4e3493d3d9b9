//! CLI argument definitions for the alertik daemon.
//!
//! Uses `clap` v4 derive macros to parse command-line arguments.

use std::path::PathBuf;

use clap::Parser;

/// Syslog-to-chat alerting relay.
///
/// Listens for syslog datagrams, matches them against the configured
/// events and notifies Telegram, Slack, Teams or Discord.
#[derive(Parser, Debug)]
#[command(name = "alertik")]
#[command(version, about, long_about = None)]
pub struct DaemonCli {
    /// Path to an alertik.toml configuration file.
    ///
    /// Without it, defaults plus environment variables are used.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override log level (trace, debug, info, warn, error).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log format (json, pretty).
    ///
    /// Takes precedence over the config file and environment variables.
    #[arg(long)]
    pub log_format: Option<String>,

    /// Validate configuration, rules and notifier credentials, then exit.
    #[arg(long)]
    pub validate: bool,
}
