//! Configuration -- `alertik.toml` parsing and environment overrides.
//!
//! [`AlertikConfig`] is the immutable input of the relay: receiver options,
//! dispatch options, notifier credentials and the event (rule) specs.
//!
//! # Loading order
//! 1. defaults (`Default` impls)
//! 2. config file (`alertik.toml`, optional)
//! 3. environment variables
//!
//! The environment surface keeps the variable names routers are usually
//! deployed with:
//!
//! ```text
//! STATIC_EVENTS_ENABLED=0            STATIC_EVENT0_NOTIFIER=Telegram
//! ENV_EVENTS=1
//! EVENT0_MATCH_TYPE=regex            EVENT0_MATCH_STR=user (\w+) logged in
//! EVENT0_NOTIFIER=Slack              EVENT0_MASK_MSG=@1 is in!
//! TELEGRAM_BOT_TOKEN / TELEGRAM_CHAT_ID / SLACK_WEBHOOK_URL
//! TEAMS_WEBHOOK_URL / DISCORD_WEBHOOK_URL / FORWARD_HOST / FORWARD_PORT
//! ```
//!
//! Everything else is overridable as `ALERTIK_{SECTION}_{FIELD}`.
//!
//! # Example
//! ```no_run
//! # async fn example() -> Result<(), alertik_core::error::AlertikError> {
//! use std::path::Path;
//! use alertik_core::config::AlertikConfig;
//!
//! let config = AlertikConfig::load(Some(Path::new("alertik.toml"))).await?;
//! let config = AlertikConfig::parse("[dispatch]\ncooldown_secs = 30")?;
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{AlertikError, ConfigError};

/// Maximum number of dynamic (configuration-defined) events
pub const MAX_DYNAMIC_EVENTS: usize = 16;

/// Alertik configuration root
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertikConfig {
    /// logging
    #[serde(default)]
    pub general: GeneralConfig,
    /// UDP receiver and queue
    #[serde(default)]
    pub receiver: ReceiverConfig,
    /// rate limiting and HTTP client
    #[serde(default)]
    pub dispatch: DispatchConfig,
    /// notifier credentials
    #[serde(default)]
    pub notifiers: NotifiersConfig,
    /// rule specs
    #[serde(default)]
    pub events: EventsConfig,
}

impl AlertikConfig {
    /// Loads the optional config file, applies the process environment and
    /// validates the result.
    pub async fn load(path: Option<&Path>) -> Result<Self, AlertikError> {
        let mut config = match path {
            Some(path) => Self::from_file(path).await?,
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Loads a TOML file (no environment overrides).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, AlertikError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AlertikError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                AlertikError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// Parses a TOML string.
    pub fn parse(toml_str: &str) -> Result<Self, AlertikError> {
        toml::from_str(toml_str).map_err(|e| {
            AlertikError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// Applies overrides from the process environment.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_env_overrides_from(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary key lookup.
    ///
    /// Malformed `ALERTIK_*` tuning values are logged and ignored; malformed
    /// event definitions and forward settings are fatal.
    pub fn apply_env_overrides_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup: &dyn Fn(&str) -> Option<String> = &lookup;

        // General
        override_string(&mut self.general.log_level, lookup, "ALERTIK_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, lookup, "ALERTIK_GENERAL_LOG_FORMAT");
        override_opt_string(&mut self.general.log_file, lookup, "ALERTIK_GENERAL_LOG_FILE");

        // Receiver
        override_string(&mut self.receiver.bind, lookup, "ALERTIK_RECEIVER_BIND");
        override_parsed(
            &mut self.receiver.queue_capacity,
            lookup,
            "ALERTIK_RECEIVER_QUEUE_CAPACITY",
        );
        override_parsed(
            &mut self.receiver.queue_full_policy,
            lookup,
            "ALERTIK_RECEIVER_QUEUE_FULL_POLICY",
        );
        override_opt_string(&mut self.receiver.forward_host, lookup, "FORWARD_HOST");
        if let Some(port) = lookup("FORWARD_PORT") {
            let parsed = port.trim().parse::<u16>().map_err(|_| ConfigError::InvalidValue {
                field: "FORWARD_PORT".to_owned(),
                reason: format!("'{port}' is not a valid port"),
            })?;
            self.receiver.forward_port = Some(parsed);
        }

        // Dispatch
        override_parsed(
            &mut self.dispatch.cooldown_secs,
            lookup,
            "ALERTIK_DISPATCH_COOLDOWN_SECS",
        );
        override_parsed(
            &mut self.dispatch.http_timeout_secs,
            lookup,
            "ALERTIK_DISPATCH_HTTP_TIMEOUT_SECS",
        );
        override_string(
            &mut self.dispatch.telegram_api_url,
            lookup,
            "ALERTIK_DISPATCH_TELEGRAM_API_URL",
        );

        // Notifier credentials
        override_opt_string(&mut self.notifiers.telegram_bot_token, lookup, "TELEGRAM_BOT_TOKEN");
        override_opt_string(&mut self.notifiers.telegram_chat_id, lookup, "TELEGRAM_CHAT_ID");
        override_opt_string(&mut self.notifiers.slack_webhook_url, lookup, "SLACK_WEBHOOK_URL");
        override_opt_string(&mut self.notifiers.teams_webhook_url, lookup, "TEAMS_WEBHOOK_URL");
        override_opt_string(
            &mut self.notifiers.discord_webhook_url,
            lookup,
            "DISCORD_WEBHOOK_URL",
        );

        // Events
        if let Some(static_events) = static_events_from_env(lookup)? {
            self.events.static_events = static_events;
        }
        if let Some(dynamic_events) = dynamic_events_from_env(lookup)? {
            self.events.dynamic_events = dynamic_events;
        }

        Ok(())
    }

    /// Validates option values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_level".to_owned(),
                reason: format!("must be one of: {}", valid_levels.join(", ")),
            });
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(ConfigError::InvalidValue {
                field: "general.log_format".to_owned(),
                reason: format!("must be one of: {}", valid_formats.join(", ")),
            });
        }

        if self.receiver.bind.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::InvalidValue {
                field: "receiver.bind".to_owned(),
                reason: format!("'{}' is not a socket address", self.receiver.bind),
            });
        }

        const MAX_QUEUE_CAPACITY: usize = 65_536;
        if self.receiver.queue_capacity < 2 || self.receiver.queue_capacity > MAX_QUEUE_CAPACITY {
            return Err(ConfigError::InvalidValue {
                field: "receiver.queue_capacity".to_owned(),
                reason: format!("must be 2-{MAX_QUEUE_CAPACITY}"),
            });
        }

        match (&self.receiver.forward_host, self.receiver.forward_port) {
            (Some(_), Some(_)) | (None, None) => {}
            _ => {
                return Err(ConfigError::InvalidValue {
                    field: "receiver.forward".to_owned(),
                    reason: "FORWARD_HOST and FORWARD_PORT must be specified together".to_owned(),
                });
            }
        }

        if self.dispatch.http_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "dispatch.http_timeout_secs".to_owned(),
                reason: "must be greater than 0".to_owned(),
            });
        }

        if self.dispatch.telegram_api_url.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "dispatch.telegram_api_url".to_owned(),
                reason: "must not be empty".to_owned(),
            });
        }

        if self.events.dynamic_events.len() > MAX_DYNAMIC_EVENTS {
            return Err(ConfigError::InvalidValue {
                field: "events.dynamic_events".to_owned(),
                reason: format!(
                    "{} events exceed the maximum supported ({MAX_DYNAMIC_EVENTS})",
                    self.events.dynamic_events.len()
                ),
            });
        }

        Ok(())
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// log level (trace, debug, info, warn, error)
    pub log_level: String,
    /// log format (json, pretty)
    pub log_format: String,
    /// append log records to this file instead of stdout
    pub log_file: Option<String>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "pretty".to_owned(),
            log_file: None,
        }
    }
}

/// Behaviour when a datagram arrives while the event queue is full
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueFullPolicy {
    /// discard the incoming datagram (default)
    #[default]
    DropNewest,
    /// discard the oldest queued event to make room
    DropOldest,
    /// stop the receiver; the daemon exits
    Abort,
}

impl FromStr for QueueFullPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "drop_newest" => Ok(Self::DropNewest),
            "drop_oldest" => Ok(Self::DropOldest),
            "abort" => Ok(Self::Abort),
            other => Err(format!(
                "unknown queue full policy '{other}', expected drop_newest, drop_oldest or abort"
            )),
        }
    }
}

impl fmt::Display for QueueFullPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DropNewest => write!(f, "drop_newest"),
            Self::DropOldest => write!(f, "drop_oldest"),
            Self::Abort => write!(f, "abort"),
        }
    }
}

/// UDP receiver settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiverConfig {
    /// bind address
    pub bind: String,
    /// event queue slots (one slot is always kept free)
    pub queue_capacity: usize,
    /// queue-full behaviour
    pub queue_full_policy: QueueFullPolicy,
    /// upstream syslog host every datagram is copied to
    pub forward_host: Option<String>,
    /// upstream syslog port
    pub forward_port: Option<u16>,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:5140".to_owned(),
            queue_capacity: 64,
            queue_full_policy: QueueFullPolicy::default(),
            forward_host: None,
            forward_port: None,
        }
    }
}

/// Notification dispatch settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// minimum seconds between two notified events
    pub cooldown_secs: u64,
    /// HTTP request timeout (seconds)
    pub http_timeout_secs: u64,
    /// Telegram Bot API base URL
    pub telegram_api_url: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: 10,
            http_timeout_secs: 10,
            telegram_api_url: "https://api.telegram.org".to_owned(),
        }
    }
}

/// Notifier credentials. Only the notifiers referenced by enabled rules
/// need theirs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifiersConfig {
    pub telegram_bot_token: Option<String>,
    pub telegram_chat_id: Option<String>,
    pub slack_webhook_url: Option<String>,
    pub teams_webhook_url: Option<String>,
    pub discord_webhook_url: Option<String>,
}

/// Notification back-ends
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotifierKind {
    Telegram,
    Slack,
    Teams,
    Discord,
}

impl NotifierKind {
    /// All kinds, in table order
    pub const ALL: [NotifierKind; 4] = [Self::Telegram, Self::Slack, Self::Teams, Self::Discord];

    /// Stable table index
    pub fn index(self) -> usize {
        self as usize
    }

    /// Configuration name
    pub fn name(self) -> &'static str {
        match self {
            Self::Telegram => "Telegram",
            Self::Slack => "Slack",
            Self::Teams => "Teams",
            Self::Discord => "Discord",
        }
    }
}

impl FromStr for NotifierKind {
    type Err = String;

    /// Exact, case-sensitive match against [`NotifierKind::name`].
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| s.to_owned())
    }
}

impl fmt::Display for NotifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a rule pattern is matched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchType {
    /// case-sensitive substring containment
    #[serde(rename = "substr")]
    Substring,
    /// regular expression
    #[serde(rename = "regex")]
    Regex,
}

impl FromStr for MatchType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "substr" => Ok(Self::Substring),
            "regex" => Ok(Self::Regex),
            other => Err(other.to_owned()),
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Substring => write!(f, "substr"),
            Self::Regex => write!(f, "regex"),
        }
    }
}

/// Rule specs
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EventsConfig {
    /// enabled built-in events, in evaluation order
    pub static_events: Vec<StaticEventConfig>,
    /// configuration-defined events
    pub dynamic_events: Vec<DynamicEventConfig>,
}

/// Enables one built-in event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaticEventConfig {
    /// built-in event id
    pub id: usize,
    /// notifier the event is sent to
    pub notifier: NotifierKind,
}

/// A fully configuration-defined event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DynamicEventConfig {
    pub match_type: MatchType,
    /// substring or regex pattern
    pub match_str: String,
    pub notifier: NotifierKind,
    /// message template (`@1`..`@99` capture groups, `@@` literal)
    pub mask_msg: String,
}

// --- environment event parsing ---

/// `STATIC_EVENTS_ENABLED=0,3,...` plus `STATIC_EVENT<n>_NOTIFIER`.
///
/// Returns `None` when the variable is absent or empty.
fn static_events_from_env(
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<Option<Vec<StaticEventConfig>>, ConfigError> {
    let Some(enabled) = lookup("STATIC_EVENTS_ENABLED").filter(|v| !v.trim().is_empty()) else {
        return Ok(None);
    };

    let mut events = Vec::new();
    for item in enabled.split(',') {
        let item = item.trim();
        let id = item.parse::<usize>().map_err(|_| ConfigError::InvalidValue {
            field: "STATIC_EVENTS_ENABLED".to_owned(),
            reason: format!("'{item}' is not a valid event number"),
        })?;
        let notifier = required_notifier(lookup, &format!("STATIC_EVENT{id}_NOTIFIER"))?;
        events.push(StaticEventConfig { id, notifier });
    }
    Ok(Some(events))
}

/// `ENV_EVENTS=<count>` plus `EVENT<n>_{MATCH_TYPE,MATCH_STR,NOTIFIER,MASK_MSG}`.
///
/// Returns `None` when the count is absent, unparsable or not positive.
fn dynamic_events_from_env(
    lookup: &dyn Fn(&str) -> Option<String>,
) -> Result<Option<Vec<DynamicEventConfig>>, ConfigError> {
    let count = match lookup("ENV_EVENTS").map(|v| v.trim().parse::<i64>()) {
        Some(Ok(count)) if count > 0 => count as usize,
        _ => return Ok(None),
    };

    if count > MAX_DYNAMIC_EVENTS {
        return Err(ConfigError::InvalidValue {
            field: "ENV_EVENTS".to_owned(),
            reason: format!(
                "{count} events exceed the maximum supported ({MAX_DYNAMIC_EVENTS})"
            ),
        });
    }

    let mut events = Vec::with_capacity(count);
    for i in 0..count {
        let key = format!("EVENT{i}_MATCH_TYPE");
        let raw = required(lookup, &key)?;
        let match_type = raw.parse::<MatchType>().map_err(|v| ConfigError::InvalidValue {
            field: key,
            reason: format!("'{v}' is not one of: substr, regex"),
        })?;

        events.push(DynamicEventConfig {
            match_type,
            notifier: required_notifier(lookup, &format!("EVENT{i}_NOTIFIER"))?,
            match_str: required(lookup, &format!("EVENT{i}_MATCH_STR"))?,
            mask_msg: required(lookup, &format!("EVENT{i}_MASK_MSG"))?,
        });
    }
    Ok(Some(events))
}

fn required(lookup: &dyn Fn(&str) -> Option<String>, key: &str) -> Result<String, ConfigError> {
    lookup(key).ok_or_else(|| ConfigError::Missing {
        key: key.to_owned(),
    })
}

fn required_notifier(
    lookup: &dyn Fn(&str) -> Option<String>,
    key: &str,
) -> Result<NotifierKind, ConfigError> {
    let name = required(lookup, key)?;
    name.parse().map_err(|name| ConfigError::UnknownNotifier {
        field: key.to_owned(),
        name,
    })
}

// --- override helpers ---

fn override_string(target: &mut String, lookup: &dyn Fn(&str) -> Option<String>, key: &str) {
    if let Some(val) = lookup(key) {
        *target = val;
    }
}

fn override_opt_string(
    target: &mut Option<String>,
    lookup: &dyn Fn(&str) -> Option<String>,
    key: &str,
) {
    if let Some(val) = lookup(key) {
        *target = Some(val);
    }
}

fn override_parsed<T>(target: &mut T, lookup: &dyn Fn(&str) -> Option<String>, key: &str)
where
    T: FromStr,
{
    if let Some(val) = lookup(key) {
        match val.trim().parse::<T>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key = key,
                value = val.as_str(),
                "failed to parse env var, ignoring"
            ),
        }
    }
}
