//! Alertik core -- shared types, errors, configuration and the pipeline trait.
//!
//! # Modules
//!
//! - [`config`]: `alertik.toml` + environment configuration
//! - [`error`]: domain error taxonomy
//! - [`event`]: [`LogEvent`], the unit handed from the receiver to the relay
//! - [`pipeline`]: [`Pipeline`] lifecycle trait and [`HealthStatus`]

pub mod config;
pub mod error;
pub mod event;
pub mod pipeline;

// --- re-exports ---

// errors
pub use error::{AlertikError, ConfigError, NotifyError, PipelineError};

// config
pub use config::{AlertikConfig, NotifierKind};

// events
pub use event::LogEvent;

// pipeline trait
pub use pipeline::{BoxFuture, HealthStatus, Pipeline};
