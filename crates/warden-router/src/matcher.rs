//! The matcher seam used by rule tables.

use std::fmt::Debug;

use crate::normalize::RequestPath;
use crate::pattern::PathPattern;
use crate::variables::PathVariables;

/// Decides whether a request path matches and extracts its variables.
///
/// Rule tables hold matchers as trait objects so that alternative pattern
/// syntaxes can be plugged in without touching the decision loop.
pub trait PathMatcher: Send + Sync + Debug {
    /// Matches a normalized request path.
    fn match_path(&self, path: &RequestPath<'_>) -> Option<PathVariables>;

    /// The pattern text, for diagnostics.
    fn pattern(&self) -> &str;
}

impl PathMatcher for PathPattern {
    fn match_path(&self, path: &RequestPath<'_>) -> Option<PathVariables> {
        self.match_request(path)
    }

    fn pattern(&self) -> &str {
        self.as_str()
    }
}
