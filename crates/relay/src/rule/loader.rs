//! Rule loader -- builds compiled rules from [`EventsConfig`].
//!
//! Any invalid entry is fatal: the relay never starts with a partial rule
//! table.

use std::collections::HashSet;

use alertik_core::config::{
    DynamicEventConfig, EventsConfig, MAX_DYNAMIC_EVENTS, StaticEventConfig,
};

use super::matcher::Pattern;
use super::types::{BUILTIN_EVENTS, Rule, RuleAction};
use crate::error::RelayError;

/// Rule loader
pub struct RuleLoader;

impl RuleLoader {
    /// Builds the static and dynamic rule sets, in evaluation order.
    pub fn load(events: &EventsConfig) -> Result<(Vec<Rule>, Vec<Rule>), RelayError> {
        let static_rules = Self::load_static(&events.static_events)?;
        let dynamic_rules = Self::load_dynamic(&events.dynamic_events)?;
        Ok((static_rules, dynamic_rules))
    }

    /// Enables built-in events by id.
    ///
    /// # Errors
    /// - an id outside the built-in catalogue
    /// - the same id enabled twice
    pub fn load_static(specs: &[StaticEventConfig]) -> Result<Vec<Rule>, RelayError> {
        let mut seen = HashSet::new();
        let mut rules = Vec::with_capacity(specs.len());

        for spec in specs {
            let rule_id = format!("static{}", spec.id);
            let builtin = BUILTIN_EVENTS
                .get(spec.id)
                .ok_or_else(|| RelayError::RuleValidation {
                    rule_id: rule_id.clone(),
                    reason: format!(
                        "event {} is not valid, should be between 0-{}",
                        spec.id,
                        BUILTIN_EVENTS.len() - 1
                    ),
                })?;

            if !seen.insert(spec.id) {
                return Err(RelayError::RuleValidation {
                    rule_id,
                    reason: "enabled more than once".to_owned(),
                });
            }

            rules.push(Rule {
                pattern: Pattern::compile(builtin.match_type, builtin.pattern, &rule_id)?,
                id: rule_id,
                notifier: spec.notifier,
                action: RuleAction::Builtin(builtin.handler),
            });
        }

        Ok(rules)
    }

    /// Compiles configuration-defined events.
    ///
    /// # Errors
    /// - more than [`MAX_DYNAMIC_EVENTS`] events
    /// - a regex that does not compile
    /// - an empty pattern
    pub fn load_dynamic(specs: &[DynamicEventConfig]) -> Result<Vec<Rule>, RelayError> {
        if specs.len() > MAX_DYNAMIC_EVENTS {
            return Err(RelayError::RuleValidation {
                rule_id: format!("event{MAX_DYNAMIC_EVENTS}"),
                reason: format!(
                    "{} events exceed the maximum supported ({MAX_DYNAMIC_EVENTS})",
                    specs.len()
                ),
            });
        }

        specs
            .iter()
            .enumerate()
            .map(|(i, spec)| {
                let rule_id = format!("event{i}");
                if spec.match_str.is_empty() {
                    return Err(RelayError::RuleValidation {
                        rule_id,
                        reason: "match string must not be empty".to_owned(),
                    });
                }
                Ok(Rule {
                    pattern: Pattern::compile(spec.match_type, &spec.match_str, &rule_id)?,
                    id: rule_id,
                    notifier: spec.notifier,
                    action: RuleAction::Template(spec.mask_msg.clone()),
                })
            })
            .collect()
    }
}
