//! Turns raw rule data into a [`RuleTable`].

use std::sync::Arc;

use tracing::debug;
use warden_router::PathPattern;

use crate::config::EngineConfig;
use crate::error::{AuthzError, AuthzResult};
use crate::expression::ExpressionEvaluator;
use crate::hierarchy::RoleHierarchy;
use crate::requirement::{AuthorityRequirement, Requirement};
use crate::source::{RawRule, RawRules};
use crate::table::{Rule, RuleTable};

/// Compiles raw rules, resolving each requirement once.
///
/// Compilation is all-or-nothing: the first malformed rule aborts the
/// whole table, so a half-valid rule set is never published.
#[derive(Debug, Clone)]
pub struct RuleCompiler {
    hierarchy: Arc<RoleHierarchy>,
    expressions: ExpressionEvaluator,
    role_prefix: String,
    key_separator: String,
}

impl RuleCompiler {
    /// Creates a compiler for the given hierarchy and conventions.
    pub fn new(hierarchy: Arc<RoleHierarchy>, config: &EngineConfig) -> Self {
        Self {
            expressions: ExpressionEvaluator::new(Arc::clone(&hierarchy), &config.role_prefix),
            hierarchy,
            role_prefix: config.role_prefix.clone(),
            key_separator: config.key_separator.clone(),
        }
    }

    /// The hierarchy every compiled rule consults.
    pub fn hierarchy(&self) -> &Arc<RoleHierarchy> {
        &self.hierarchy
    }

    /// Compiles every rule in order into a table with the given generation.
    ///
    /// # Errors
    ///
    /// Returns a configuration error naming the first rule whose pattern
    /// or requirement is malformed.
    pub fn compile(&self, raw: &RawRules, generation: u64) -> AuthzResult<RuleTable> {
        let rules = raw
            .iter()
            .map(|(order_key, rule)| self.compile_rule(order_key, rule))
            .collect::<AuthzResult<Vec<_>>>()?;

        debug!(rules = rules.len(), generation, "compiled rule table");
        Ok(RuleTable::new(rules, generation))
    }

    /// Compiles a single rule.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPattern` or `InvalidRequirement`.
    pub fn compile_rule(&self, order_key: &str, raw: &RawRule) -> AuthzResult<Rule> {
        let (discriminator, pattern) = self.split_key(&raw.match_key);
        let pattern = PathPattern::parse(pattern)
            .map_err(|e| AuthzError::invalid_pattern(order_key, e))?;
        let requirement = self.requirement(order_key, &raw.requirement)?;

        Ok(Rule::new(
            order_key,
            discriminator.map(str::to_string),
            Box::new(pattern),
            requirement,
        ))
    }

    /// Splits a match key at the first separator.
    ///
    /// A key without the separator is used whole as the pattern.
    pub fn split_key<'k>(&self, match_key: &'k str) -> (Option<&'k str>, &'k str) {
        match match_key.split_once(self.key_separator.as_str()) {
            Some((discriminator, pattern)) => (Some(discriminator), pattern),
            None => (None, match_key),
        }
    }

    fn requirement(&self, order_key: &str, raw: &str) -> AuthzResult<Requirement> {
        let text = raw.trim();
        if text.is_empty() {
            return Err(AuthzError::invalid_requirement(
                order_key,
                raw,
                "requirement is blank",
            ));
        }

        if text.starts_with(self.role_prefix.as_str()) {
            if text.contains(char::is_whitespace) {
                return Err(AuthzError::invalid_requirement(
                    order_key,
                    raw,
                    "authority requirements must be a single authority",
                ));
            }
            return Ok(Requirement::Authority(AuthorityRequirement::new(
                text,
                Arc::clone(&self.hierarchy),
            )));
        }

        self.expressions
            .compile(text)
            .map(Requirement::Expression)
            .map_err(|e| AuthzError::invalid_requirement(order_key, raw, e.to_string()))
    }
}
