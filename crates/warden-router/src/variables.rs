//! Captured path variables.
//!
//! Variables are stored in capture order using a small-vector so that the
//! common case (a handful of `{name}` segments) never touches the heap for
//! the container itself.

use std::collections::BTreeMap;

use smallvec::SmallVec;

/// Number of variables stored inline before spilling to the heap.
const INLINE_VARIABLES: usize = 4;

/// Variables captured while matching a [`PathPattern`](crate::PathPattern).
///
/// # Example
///
/// ```rust
/// use warden_router::PathVariables;
///
/// let mut vars = PathVariables::new();
/// vars.push("orgId", "acme");
/// vars.push("userId", "42");
///
/// assert_eq!(vars.get("userId"), Some("42"));
/// assert_eq!(vars.get("missing"), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PathVariables {
    entries: SmallVec<[(String, String); INLINE_VARIABLES]>,
}

impl PathVariables {
    /// Creates an empty variable set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a captured variable.
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Returns the value captured for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Returns true if a variable named `name` was captured.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.iter().any(|(n, _)| n == name)
    }

    /// Returns true if nothing was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of captured variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Iterates over `(name, value)` pairs in capture order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Drops every variable captured after the first `len`.
    ///
    /// Used by the matcher to undo captures when a `**` branch backtracks.
    pub fn truncate(&mut self, len: usize) {
        self.entries.truncate(len);
    }

    /// Copies the variables into an ordered map.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<String, String> {
        self.entries.iter().cloned().collect()
    }
}

impl FromIterator<(String, String)> for PathVariables {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}
