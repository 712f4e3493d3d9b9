//! Logging initialization for the alertik daemon.
//!
//! Configures `tracing-subscriber` based on the `[general]` section
//! of `AlertikConfig`. Supports JSON structured logging and
//! human-readable pretty format, on stdout or appended to a file.

use std::fs::OpenOptions;
use std::sync::Mutex;

use anyhow::{Context, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use alertik_core::config::GeneralConfig;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync + 'static>;

/// Initialize the global tracing subscriber.
///
/// Must be called exactly once, before any tracing macros are used.
/// `RUST_LOG` takes precedence over `config.log_level`.
///
/// # Formats
///
/// * `"json"` - Machine-parseable JSON lines
/// * `"pretty"` - Human-readable output (default)
pub fn init_tracing(config: &GeneralConfig) -> Result<()> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(build_layer(config)?.with_filter(env_filter))
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize tracing subscriber: {}", e))?;

    Ok(())
}

/// Build the formatting layer for the configured format and destination.
pub fn build_layer(config: &GeneralConfig) -> Result<BoxedLayer> {
    let file = match &config.log_file {
        Some(path) => Some(
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("failed to open log file {}", path))?,
        ),
        None => None,
    };

    let layer = match (config.log_format.as_str(), file) {
        ("json", None) => tracing_subscriber::fmt::layer().json().boxed(),
        ("json", Some(file)) => tracing_subscriber::fmt::layer()
            .json()
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .boxed(),
        ("pretty", None) => tracing_subscriber::fmt::layer().pretty().boxed(),
        ("pretty", Some(file)) => tracing_subscriber::fmt::layer()
            .pretty()
            .with_ansi(false)
            .with_writer(Mutex::new(file))
            .boxed(),
        (other, _) => {
            return Err(anyhow::anyhow!(
                "unknown log format '{}', expected 'json' or 'pretty'",
                other
            ));
        }
    };

    Ok(layer)
}
