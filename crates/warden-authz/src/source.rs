//! Rule sources: where raw rules come from.
//!
//! A source returns an ordered mapping `order key -> (match key,
//! requirement)`. Iteration order of the mapping is table order.
//!
//! Three sources ship with the crate:
//! - [`StaticRuleSource`]: in memory, replaceable at runtime
//! - [`FileRuleSource`]: a TOML or JSON [`RuleDocument`] on disk
//! - [`HttpRuleSource`]: the same JSON document served over HTTP

use std::fmt::Debug;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::DEFAULT_KEY_SEPARATOR;
use crate::error::{AuthzError, AuthzResult};

/// One uncompiled rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRule {
    /// `discriminator|pattern`, or a bare pattern.
    pub match_key: String,
    /// An authority (`ROLE_ADMIN`) or an expression.
    pub requirement: String,
}

impl RawRule {
    /// Creates a raw rule.
    pub fn new(match_key: impl Into<String>, requirement: impl Into<String>) -> Self {
        Self {
            match_key: match_key.into(),
            requirement: requirement.into(),
        }
    }
}

/// Raw rules in table order, keyed by order key.
pub type RawRules = IndexMap<String, RawRule>;

/// Supplies raw rules to the engine.
///
/// Only `fetch_all` performs I/O; the engine bounds it with a timeout.
#[async_trait]
pub trait RuleSource: Send + Sync + Debug {
    /// Fetches the complete, ordered rule set.
    ///
    /// # Errors
    ///
    /// `SourceUnavailable` when the backing store cannot be reached, or a
    /// configuration error when its content is malformed.
    async fn fetch_all(&self) -> AuthzResult<RawRules>;

    /// A short description for logs and errors (path, URL, name).
    fn describe(&self) -> String;
}

// ─── Rule documents ─────────────────────────────────────────────────────

/// The on-disk / over-the-wire rule format.
///
/// ```toml
/// [[rules]]
/// order = 10
/// method = "GET"
/// pattern = "/admin/**"
/// requirement = "ROLE_ADMIN"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleDocument {
    /// The rules, in any order.
    #[serde(default)]
    pub rules: Vec<RuleRecord>,
}

/// One rule in a [`RuleDocument`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RuleRecord {
    /// Sort position; lower runs first, ties keep document order.
    pub order: u32,
    /// Discriminator kept for diagnostics; not used for matching.
    #[serde(default = "default_method")]
    pub method: String,
    /// Path pattern.
    pub pattern: String,
    /// Authority or expression.
    pub requirement: String,
}

fn default_method() -> String {
    "*".to_string()
}

/// Format of a rule document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    /// TOML.
    Toml,
    /// JSON.
    Json,
}

impl DocumentFormat {
    /// Picks a format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()?.to_ascii_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

impl RuleDocument {
    /// Parses a document.
    ///
    /// # Errors
    ///
    /// Returns `AuthzError::Config` if the content does not parse.
    pub fn parse(content: &str, format: DocumentFormat) -> AuthzResult<Self> {
        match format {
            DocumentFormat::Toml => toml::from_str(content)
                .map_err(|e| AuthzError::Config(format!("invalid rule document: {e}"))),
            DocumentFormat::Json => serde_json::from_str(content)
                .map_err(|e| AuthzError::Config(format!("invalid rule document: {e}"))),
        }
    }

    /// Converts to raw rules, stably sorted by `order`.
    ///
    /// Order keys are `{order:08}-{index:04}` where `index` is the
    /// record's position in the document; match keys are
    /// `{method}{key_separator}{pattern}`.
    pub fn into_raw_rules(self, key_separator: &str) -> RawRules {
        let mut records: Vec<(usize, RuleRecord)> = self.rules.into_iter().enumerate().collect();
        records.sort_by_key(|(_, record)| record.order);

        records
            .into_iter()
            .map(|(index, record)| {
                (
                    format!("{:08}-{index:04}", record.order),
                    RawRule::new(
                        format!("{}{key_separator}{}", record.method, record.pattern),
                        record.requirement,
                    ),
                )
            })
            .collect()
    }
}

// ─── Static source ──────────────────────────────────────────────────────

/// Rules held in memory.
///
/// # Example
///
/// ```rust
/// use warden_authz::{RuleSource, StaticRuleSource};
///
/// let source = StaticRuleSource::new()
///     .with_rule("1", "GET|/admin/**", "ROLE_ADMIN")
///     .with_rule("2", "/user/{id}", "isAuthenticated()");
///
/// let rules = tokio_test::block_on(source.fetch_all()).unwrap();
/// assert_eq!(rules.len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct StaticRuleSource {
    rules: RwLock<RawRules>,
}

impl StaticRuleSource {
    /// An empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// A source holding `rules`.
    pub fn from_rules(rules: RawRules) -> Self {
        Self {
            rules: RwLock::new(rules),
        }
    }

    /// Appends a rule.
    pub fn with_rule(
        mut self,
        order_key: impl Into<String>,
        match_key: impl Into<String>,
        requirement: impl Into<String>,
    ) -> Self {
        self.rules
            .get_mut()
            .insert(order_key.into(), RawRule::new(match_key, requirement));
        self
    }

    /// Replaces every rule. Takes effect on the next reload.
    pub fn replace(&self, rules: RawRules) {
        *self.rules.write() = rules;
    }

    /// Number of rules currently held.
    pub fn len(&self) -> usize {
        self.rules.read().len()
    }

    /// Returns true if no rules are held.
    pub fn is_empty(&self) -> bool {
        self.rules.read().is_empty()
    }
}

#[async_trait]
impl RuleSource for StaticRuleSource {
    async fn fetch_all(&self) -> AuthzResult<RawRules> {
        Ok(self.rules.read().clone())
    }

    fn describe(&self) -> String {
        "static".to_string()
    }
}

// ─── File source ────────────────────────────────────────────────────────

/// Reads a [`RuleDocument`] from disk on every fetch.
///
/// The format follows the file extension (`.toml` or `.json`).
#[derive(Debug, Clone)]
pub struct FileRuleSource {
    path: PathBuf,
    key_separator: String,
}

impl FileRuleSource {
    /// Creates a source for `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            key_separator: DEFAULT_KEY_SEPARATOR.to_string(),
        }
    }

    /// Joins method and pattern with `separator`; must match the engine's.
    pub fn with_key_separator(mut self, separator: impl Into<String>) -> Self {
        self.key_separator = separator.into();
        self
    }

    /// The document path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl RuleSource for FileRuleSource {
    async fn fetch_all(&self) -> AuthzResult<RawRules> {
        let format = DocumentFormat::from_path(&self.path).ok_or_else(|| {
            AuthzError::Config(format!(
                "unsupported rule file extension: {} (expected .toml or .json)",
                self.path.display()
            ))
        })?;

        info!(path = %self.path.display(), "loading rules from file");
        let content = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            AuthzError::source_unavailable(
                self.path.display().to_string(),
                format!("failed to read file: {e}"),
            )
        })?;

        let rules = RuleDocument::parse(&content, format)?.into_raw_rules(&self.key_separator);
        debug!(path = %self.path.display(), rules = rules.len(), "rule file parsed");
        Ok(rules)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

// ─── HTTP source ────────────────────────────────────────────────────────

/// Fetches a JSON [`RuleDocument`] from a URL on every fetch.
#[derive(Debug, Clone)]
pub struct HttpRuleSource {
    url: String,
    client: reqwest::Client,
    key_separator: String,
}

impl HttpRuleSource {
    /// Creates a source for `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
            key_separator: DEFAULT_KEY_SEPARATOR.to_string(),
        }
    }

    /// Joins method and pattern with `separator`; must match the engine's.
    pub fn with_key_separator(mut self, separator: impl Into<String>) -> Self {
        self.key_separator = separator.into();
        self
    }

    /// Uses a preconfigured client (proxies, TLS roots, default headers).
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// The document URL.
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl RuleSource for HttpRuleSource {
    async fn fetch_all(&self) -> AuthzResult<RawRules> {
        info!(url = %self.url, "loading rules from remote source");

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| AuthzError::source_unavailable(&self.url, format!("request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(AuthzError::source_unavailable(
                &self.url,
                format!("server returned status {}", response.status()),
            ));
        }

        let body = response.text().await.map_err(|e| {
            AuthzError::source_unavailable(&self.url, format!("failed to read response: {e}"))
        })?;

        let rules = RuleDocument::parse(&body, DocumentFormat::Json)?
            .into_raw_rules(&self.key_separator);
        debug!(url = %self.url, rules = rules.len(), "remote rules parsed");
        Ok(rules)
    }

    fn describe(&self) -> String {
        self.url.clone()
    }
}
