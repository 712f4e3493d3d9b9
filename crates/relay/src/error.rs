//! Relay error types
//!
//! [`RelayError`] covers rule-table construction, notifier setup and the
//! receive loop. `From<RelayError> for AlertikError` lets the daemon
//! propagate it with `?`.

use alertik_core::error::{AlertikError, ConfigError, NotifyError, PipelineError};

/// Relay domain error
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// a rule could not be built
    #[error("rule validation error: rule '{rule_id}': {reason}")]
    RuleValidation {
        /// offending rule id (`static<n>` / `event<n>`)
        rule_id: String,
        reason: String,
    },

    /// configuration problem detected while building components
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// notification failure
    #[error(transparent)]
    Notify(#[from] NotifyError),

    /// receive loop failure
    #[error("receiver error: {0}")]
    Receiver(String),

    /// queue full under the abort policy
    #[error("event queue full (capacity {capacity})")]
    QueueFull { capacity: usize },

    /// HTTP client could not be built
    #[error("http client error: {0}")]
    HttpClient(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<RelayError> for AlertikError {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::RuleValidation { rule_id, reason } => {
                AlertikError::Config(ConfigError::InvalidValue {
                    field: rule_id,
                    reason,
                })
            }
            RelayError::Config(e) => AlertikError::Config(e),
            RelayError::Notify(e) => AlertikError::Notify(e),
            RelayError::QueueFull { capacity } => {
                AlertikError::Pipeline(PipelineError::QueueFull { capacity })
            }
            RelayError::Io(e) => AlertikError::Io(e),
            other => AlertikError::Pipeline(PipelineError::Task(other.to_string())),
        }
    }
}
