//! Per-path policy classification.
//!
//! Each incoming request path is matched against an ordered rule list; the
//! first matching rule governs the request. Order is significant: earlier
//! entries take precedence, so a specific whitelist can punch a hole in a
//! later catch-all. There is no most-specific-match.

use regex::Regex;

use crate::config::PathRuleConfig;

/// One compiled path rule.
#[derive(Debug, Clone)]
pub struct PathRule {
    pattern: Regex,

    /// Pass through without requiring authentication.
    pub whitelist: bool,

    /// Reject unauthenticated requests immediately instead of redirecting.
    pub fail_fast: bool,
}

/// Ordered, first-match-wins path classification.
#[derive(Debug, Clone)]
pub struct PathPolicy {
    rules: Vec<PathRule>,
}

impl PathPolicy {
    /// Compile the configured rules. Patterns are validated again here so
    /// programmatic construction gets the same guarantee as config loading.
    pub fn from_config(rules: &[PathRuleConfig]) -> Result<Self, regex::Error> {
        let rules = rules
            .iter()
            .map(|rule| {
                Ok(PathRule {
                    pattern: Regex::new(&rule.pattern)?,
                    whitelist: rule.whitelist,
                    fail_fast: rule.fail_fast,
                })
            })
            .collect::<Result<Vec<_>, regex::Error>>()?;

        Ok(Self { rules })
    }

    /// First rule whose pattern matches the path. `None` is a configuration
    /// error for the caller, never a silent allow or deny.
    pub fn match_path(&self, path: &str) -> Option<&PathRule> {
        self.rules.iter().find(|rule| rule.pattern.is_match(path))
    }
}
