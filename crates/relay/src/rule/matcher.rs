//! Pattern matching -- substring containment or a precompiled regex.

use regex::Regex;

use alertik_core::config::MatchType;

use crate::error::RelayError;

/// A compiled rule pattern
#[derive(Debug, Clone)]
pub enum Pattern {
    /// case-sensitive containment
    Substring(String),
    /// compiled once when the rule table is built
    Regex(Regex),
}

/// Result of a successful match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match<'t> {
    /// capture groups 1..=N; unmatched optional groups are empty
    pub groups: Vec<&'t str>,
}

impl Pattern {
    /// Compiles `pattern` for the given match type.
    pub fn compile(
        match_type: MatchType,
        pattern: &str,
        rule_id: &str,
    ) -> Result<Self, RelayError> {
        match match_type {
            MatchType::Substring => Ok(Self::Substring(pattern.to_owned())),
            MatchType::Regex => Regex::new(pattern)
                .map(Self::Regex)
                .map_err(|e| RelayError::RuleValidation {
                    rule_id: rule_id.to_owned(),
                    reason: format!("invalid regex '{pattern}': {e}"),
                }),
        }
    }

    pub fn match_type(&self) -> MatchType {
        match self {
            Self::Substring(_) => MatchType::Substring,
            Self::Regex(_) => MatchType::Regex,
        }
    }

    /// Pattern source text.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Substring(s) => s,
            Self::Regex(re) => re.as_str(),
        }
    }

    /// Number of capture groups (always zero for substrings).
    pub fn group_count(&self) -> usize {
        match self {
            Self::Substring(_) => 0,
            Self::Regex(re) => re.captures_len() - 1,
        }
    }

    pub fn is_match(&self, text: &str) -> bool {
        match self {
            Self::Substring(s) => text.contains(s.as_str()),
            Self::Regex(re) => re.is_match(text),
        }
    }

    /// Matches `text`, collecting capture groups for regex patterns.
    pub fn captures<'t>(&self, text: &'t str) -> Option<Match<'t>> {
        match self {
            Self::Substring(s) => text.contains(s.as_str()).then(|| Match { groups: Vec::new() }),
            Self::Regex(re) => {
                let caps = re.captures(text)?;
                let groups = caps
                    .iter()
                    .skip(1)
                    .map(|g| g.map_or("", |m| m.as_str()))
                    .collect();
                Some(Match { groups })
            }
        }
    }
}
