//! Rule data types

use alertik_core::config::{MatchType, NotifierKind};

use super::matcher::Pattern;

/// A compiled rule, read-only once the table is built
#[derive(Debug, Clone)]
pub struct Rule {
    /// `static<n>` or `event<n>`
    pub id: String,
    pub pattern: Pattern,
    pub notifier: NotifierKind,
    pub action: RuleAction,
}

/// What a matching rule produces
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleAction {
    /// render a mask template
    Template(String),
    /// run a built-in handler
    Builtin(BuiltinHandler),
}

/// Built-in event handlers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinHandler {
    /// failed WiFi association (wrong password)
    WifiLoginAttempt,
}

/// Catalogue entry of a built-in event
#[derive(Debug, Clone, Copy)]
pub struct BuiltinEvent {
    pub name: &'static str,
    pub match_type: MatchType,
    pub pattern: &'static str,
    pub handler: BuiltinHandler,
}

impl BuiltinHandler {
    /// Catalogue name of the built-in event this handler serves.
    pub fn event_name(self) -> &'static str {
        BUILTIN_EVENTS
            .iter()
            .find(|event| event.handler == self)
            .map_or("unknown", |event| event.name)
    }
}

/// Built-in events, indexed by static event id
pub const BUILTIN_EVENTS: &[BuiltinEvent] = &[BuiltinEvent {
    name: "wifi_login_attempt",
    match_type: MatchType::Substring,
    pattern: super::wifi::WIFI_LOGIN_PATTERN,
    handler: BuiltinHandler::WifiLoginAttempt,
}];
