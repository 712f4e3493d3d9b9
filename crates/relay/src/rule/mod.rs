//! Rule engine -- matching and message building.
//!
//! Two disjoint rule sets are evaluated against every event:
//!
//! - **static**: built-in events enabled by id. The first match runs its
//!   handler and ends static evaluation.
//! - **dynamic**: configuration-defined events. Every match renders its
//!   mask template; dynamic rules never short-circuit each other.
//!
//! # Architecture
//! - [`RuleTable`]: immutable rule sets and evaluation
//! - [`loader`]: builds rules from configuration
//! - [`matcher`]: substring / regex patterns
//! - [`template`]: `@N` mask templates
//! - [`wifi`]: failed WiFi association handler
//! - [`types`]: rule data structures

pub mod loader;
pub mod matcher;
pub mod template;
pub mod types;
pub mod wifi;

pub use loader::RuleLoader;
pub use matcher::{Match, Pattern};
pub use template::{MAX_MESSAGE_LEN, RenderedMessage, TemplateWarning};
pub use types::{BUILTIN_EVENTS, BuiltinEvent, BuiltinHandler, Rule, RuleAction};

use alertik_core::LogEvent;
use alertik_core::config::{EventsConfig, NotifierKind};
use tracing::{debug, info, warn};

use crate::error::RelayError;

/// A message to hand to a notifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub rule_id: String,
    pub notifier: NotifierKind,
    pub message: String,
}

/// Outcome of evaluating one event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Evaluation {
    /// rules that matched (static + dynamic)
    pub matched: usize,
    /// messages to send; a matched rule may produce none
    pub dispatches: Vec<Dispatch>,
}

/// Immutable rule table
///
/// # Example
/// ```ignore
/// let table = RuleTable::build(&config.events)?;
/// let evaluation = table.evaluate(&event);
/// for dispatch in evaluation.dispatches {
///     notifiers.send(dispatch.notifier, &dispatch.message).await?;
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct RuleTable {
    static_rules: Vec<Rule>,
    dynamic_rules: Vec<Rule>,
}

impl RuleTable {
    /// Builds and validates the table.
    pub fn build(events: &EventsConfig) -> Result<Self, RelayError> {
        let (static_rules, dynamic_rules) = RuleLoader::load(events)?;
        Ok(Self {
            static_rules,
            dynamic_rules,
        })
    }

    pub fn static_rules(&self) -> &[Rule] {
        &self.static_rules
    }

    pub fn dynamic_rules(&self) -> &[Rule] {
        &self.dynamic_rules
    }

    /// Total number of enabled rules.
    pub fn len(&self) -> usize {
        self.static_rules.len() + self.dynamic_rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Distinct notifiers referenced by enabled rules, in table order.
    pub fn notifiers(&self) -> Vec<NotifierKind> {
        NotifierKind::ALL
            .into_iter()
            .filter(|kind| {
                self.static_rules
                    .iter()
                    .chain(&self.dynamic_rules)
                    .any(|rule| rule.notifier == *kind)
            })
            .collect()
    }

    /// Logs one line per enabled rule.
    pub fn log_summary(&self) {
        if self.static_rules.is_empty() {
            info!("static events disabled");
        }
        for rule in &self.static_rules {
            let name = match rule.action {
                RuleAction::Builtin(handler) => handler.event_name(),
                RuleAction::Template(_) => "template",
            };
            info!(
                rule_id = %rule.id,
                name,
                notifier = %rule.notifier,
                pattern = rule.pattern.as_str(),
                "static event enabled"
            );
        }

        if self.dynamic_rules.is_empty() {
            info!("environment events disabled");
        }
        for rule in &self.dynamic_rules {
            let mask = match &rule.action {
                RuleAction::Template(mask) => mask.as_str(),
                RuleAction::Builtin(_) => "",
            };
            info!(
                rule_id = %rule.id,
                match_type = %rule.pattern.match_type(),
                pattern = rule.pattern.as_str(),
                notifier = %rule.notifier,
                mask,
                "environment event enabled"
            );
        }
    }

    /// Evaluates every rule against `event`.
    pub fn evaluate(&self, event: &LogEvent) -> Evaluation {
        let mut evaluation = Evaluation::default();

        for rule in &self.static_rules {
            if let Some(m) = rule.pattern.captures(&event.text) {
                evaluation.matched += 1;
                evaluation.dispatches.extend(apply(rule, &m, event));
                break;
            }
        }

        for rule in &self.dynamic_rules {
            if let Some(m) = rule.pattern.captures(&event.text) {
                evaluation.matched += 1;
                evaluation.dispatches.extend(apply(rule, &m, event));
            }
        }

        evaluation
    }
}

fn apply(rule: &Rule, m: &Match<'_>, event: &LogEvent) -> Option<Dispatch> {
    debug!(rule_id = %rule.id, "rule matched");

    let message = match &rule.action {
        RuleAction::Template(mask) => {
            let rendered = template::render(mask, &m.groups, event.timestamp);
            for warning in &rendered.warnings {
                warn!(rule_id = %rule.id, %warning, "mask template problem");
            }
            rendered.text
        }
        RuleAction::Builtin(BuiltinHandler::WifiLoginAttempt) => {
            info!(rule_id = %rule.id, "login attempt detected");
            match wifi::parse_login_attempt(&event.text) {
                Ok(attempt) => {
                    info!(
                        mac = attempt.mac_address,
                        interface = attempt.interface,
                        "retrieved login attempt info"
                    );
                    wifi::login_attempt_message(&attempt, event.timestamp)
                }
                Err(e) => {
                    warn!(rule_id = %rule.id, error = %e, "unable to parse login attempt, ignoring");
                    return None;
                }
            }
        }
    };

    Some(Dispatch {
        rule_id: rule.id.clone(),
        notifier: rule.notifier,
        message,
    })
}
