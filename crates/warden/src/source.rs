//! Rule sources built from configuration.

use std::sync::Arc;

use warden_authz::{FileRuleSource, HttpRuleSource, RuleDocument, RuleSource, StaticRuleSource};
use warden_config::{ConfigError, EngineSection, SourceKind, SourceSection};

use crate::WardenResult;

/// Builds the rule source a configuration names.
///
/// Document sources join method and pattern with the engine's key
/// separator so their match keys split the way the compiler expects.
///
/// # Errors
///
/// Returns `ConfigError::MissingField` if a `file` source has no path or
/// an `http` source has no URL.
pub fn build_source(
    source: &SourceSection,
    engine: &EngineSection,
) -> WardenResult<Arc<dyn RuleSource>> {
    let separator = engine.key_separator.as_str();

    let built: Arc<dyn RuleSource> = match source.kind {
        SourceKind::File => {
            let path = source
                .path
                .as_deref()
                .ok_or_else(|| ConfigError::missing_field("source.path"))?;
            Arc::new(FileRuleSource::new(path).with_key_separator(separator))
        }
        SourceKind::Http => {
            let url = source
                .url
                .as_deref()
                .ok_or_else(|| ConfigError::missing_field("source.url"))?;
            Arc::new(HttpRuleSource::new(url).with_key_separator(separator))
        }
        SourceKind::Inline => {
            let document = RuleDocument {
                rules: source.rules.clone(),
            };
            Arc::new(StaticRuleSource::from_rules(
                document.into_raw_rules(separator),
            ))
        }
    };

    Ok(built)
}
