//! Error types -- the domain error taxonomy.
//!
//! - [`ConfigError`]: fatal, detected before the pipeline starts
//! - [`NotifyError`]: transient, a single notification attempt is abandoned
//! - [`PipelineError`]: lifecycle and I/O failures of the running relay

/// Alertik top-level error type
#[derive(Debug, thiserror::Error)]
pub enum AlertikError {
    /// configuration error (fatal)
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// pipeline lifecycle error
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// notification error
    #[error("notify error: {0}")]
    Notify(#[from] NotifyError),

    /// I/O error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration errors
///
/// Every variant is fatal: the process must not start with an invalid
/// rule table or missing notifier credentials.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// config file not found
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// config file could not be parsed
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// invalid value
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    /// a required environment variable / field is absent
    #[error("missing required config '{key}'")]
    Missing { key: String },

    /// a rule references an unknown notifier
    #[error("unknown notifier '{name}' for '{field}'")]
    UnknownNotifier { field: String, name: String },

    /// a regex rule failed to compile
    #[error("invalid regex for '{field}': {reason}")]
    InvalidRegex { field: String, reason: String },

    /// notifier credentials absent at setup time
    #[error("missing credentials for {notifier}: set {}", .keys.join(", "))]
    MissingCredentials {
        notifier: String,
        keys: Vec<&'static str>,
    },
}

/// Pipeline lifecycle errors
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// start() called while running
    #[error("pipeline already running")]
    AlreadyRunning,

    /// stop() called while not running
    #[error("pipeline not running")]
    NotRunning,

    /// initialisation failed
    #[error("pipeline init failed: {0}")]
    InitFailed(String),

    /// queue full under the abort policy
    #[error("event queue full (capacity {capacity})")]
    QueueFull { capacity: usize },

    /// background task failed
    #[error("task failed: {0}")]
    Task(String),
}

/// Notification errors
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// notifier used before setup()
    #[error("{notifier} notifier not set up")]
    NotSetUp { notifier: String },

    /// request could not be sent / no response
    #[error("{notifier} transport error: {reason}")]
    Transport { notifier: String, reason: String },

    /// server answered with a non-2xx status
    #[error("{notifier} responded with status {status}")]
    Status { notifier: String, status: u16 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let err = ConfigError::InvalidValue {
            field: "receiver.queue_capacity".to_owned(),
            reason: "must be at least 2".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("receiver.queue_capacity"));
        assert!(msg.contains("at least 2"));
    }

    #[test]
    fn missing_credentials_lists_keys() {
        let err = ConfigError::MissingCredentials {
            notifier: "Telegram".to_owned(),
            keys: vec!["TELEGRAM_BOT_TOKEN", "TELEGRAM_CHAT_ID"],
        };
        assert_eq!(
            err.to_string(),
            "missing credentials for Telegram: set TELEGRAM_BOT_TOKEN, TELEGRAM_CHAT_ID"
        );
    }

    #[test]
    fn converts_to_alertik_error() {
        let err: AlertikError = NotifyError::Status {
            notifier: "Slack".to_owned(),
            status: 500,
        }
        .into();
        assert!(matches!(err, AlertikError::Notify(_)));
        assert!(err.to_string().contains("500"));
    }

    #[test]
    fn queue_full_display() {
        let err = PipelineError::QueueFull { capacity: 64 };
        assert!(err.to_string().contains("64"));
    }
}
