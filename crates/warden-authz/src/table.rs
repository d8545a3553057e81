//! Compiled rules and the immutable table that holds them.

use chrono::{DateTime, Utc};
use serde::Serialize;
use warden_router::{PathMatcher, PathVariables, RequestPath};

use crate::requirement::Requirement;

/// One compiled rule: where it applies and what it requires.
#[derive(Debug)]
pub struct Rule {
    order_key: String,
    discriminator: Option<String>,
    matcher: Box<dyn PathMatcher>,
    requirement: Requirement,
}

impl Rule {
    /// Assembles a rule.
    pub fn new(
        order_key: impl Into<String>,
        discriminator: Option<String>,
        matcher: Box<dyn PathMatcher>,
        requirement: Requirement,
    ) -> Self {
        Self {
            order_key: order_key.into(),
            discriminator,
            matcher,
            requirement,
        }
    }

    /// The key that placed this rule in the table.
    pub fn order_key(&self) -> &str {
        &self.order_key
    }

    /// Text before the key separator (often a method); never used for
    /// matching.
    pub fn discriminator(&self) -> Option<&str> {
        self.discriminator.as_deref()
    }

    /// The path pattern text.
    pub fn pattern(&self) -> &str {
        self.matcher.pattern()
    }

    /// The requirement.
    pub const fn requirement(&self) -> &Requirement {
        &self.requirement
    }

    /// Matches a request path, returning captured variables.
    pub fn matches(&self, path: &RequestPath<'_>) -> Option<PathVariables> {
        self.matcher.match_path(path)
    }
}

/// A serializable view of one rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleSummary {
    /// Order key.
    pub order_key: String,
    /// Discarded key prefix, if any.
    pub discriminator: Option<String>,
    /// Path pattern.
    pub pattern: String,
    /// Requirement text.
    pub requirement: String,
    /// `"authority"` or `"expression"`.
    pub kind: &'static str,
}

/// An ordered, immutable snapshot of compiled rules.
///
/// Tables are never modified after construction; a reload builds a new
/// table and swaps it in whole.
#[derive(Debug)]
pub struct RuleTable {
    rules: Vec<Rule>,
    generation: u64,
    built_at: DateTime<Utc>,
}

impl RuleTable {
    /// Wraps compiled rules, preserving their order.
    pub fn new(rules: Vec<Rule>, generation: u64) -> Self {
        Self {
            rules,
            generation,
            built_at: Utc::now(),
        }
    }

    /// A table with no rules (generation 0). Every request is allowed.
    pub fn empty() -> Self {
        Self::new(Vec::new(), 0)
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns true if the table has no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Reload counter; 1 for the startup table, 0 for the empty fallback.
    pub const fn generation(&self) -> u64 {
        self.generation
    }

    /// When the table was built.
    pub const fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    /// Rules in table order.
    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }

    /// The first rule whose pattern matches `path`, with its variables.
    ///
    /// Later rules are never consulted once one matches, even if they are
    /// more specific.
    pub fn find(&self, path: &RequestPath<'_>) -> Option<(&Rule, PathVariables)> {
        self.rules
            .iter()
            .find_map(|rule| rule.matches(path).map(|vars| (rule, vars)))
    }

    /// Serializable summaries, in table order.
    pub fn summaries(&self) -> Vec<RuleSummary> {
        self.rules
            .iter()
            .map(|rule| RuleSummary {
                order_key: rule.order_key.clone(),
                discriminator: rule.discriminator.clone(),
                pattern: rule.pattern().to_string(),
                requirement: rule.requirement.to_string(),
                kind: if rule.requirement.is_authority() {
                    "authority"
                } else {
                    "expression"
                },
            })
            .collect()
    }
}

impl<'a> IntoIterator for &'a RuleTable {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}
