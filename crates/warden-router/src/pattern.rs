//! Ordered-segment path patterns.
//!
//! A pattern is a `/`-separated list of segments:
//!
//! | Segment | Matches |
//! |---------|---------|
//! | `users` | exactly the literal segment |
//! | `*` | exactly one segment |
//! | `**` | zero or more segments |
//! | `{id}` | one segment, captured as `id` |
//! | `{*rest}` | the remainder of the path, captured as `rest` (last only) |
//!
//! Unlike a routing tree there is no priority between segment kinds: a
//! pattern either matches a path or it does not, and callers decide which
//! of several matching patterns wins.

use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use crate::error::PatternError;
use crate::normalize::RequestPath;
use crate::variables::PathVariables;

/// A single parsed pattern segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    /// Literal segment, compared case-sensitively.
    Literal(String),
    /// `*`
    AnySegment,
    /// `**`
    AnyPath,
    /// `{name}`
    Capture(String),
    /// `{*name}`
    CaptureRest(String),
}

impl Segment {
    fn parse(raw: &str) -> Result<Self, PatternError> {
        match raw {
            "*" => return Ok(Self::AnySegment),
            "**" => return Ok(Self::AnyPath),
            _ => {}
        }

        if let Some(inner) = raw.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            if inner.contains(['{', '}']) {
                return Err(PatternError::UnbalancedBrace {
                    segment: raw.to_string(),
                });
            }
            return match inner.strip_prefix('*') {
                Some(name) => Ok(Self::CaptureRest(validate_name(name)?)),
                None => Ok(Self::Capture(validate_name(inner)?)),
            };
        }

        if raw.contains(['{', '}']) {
            return Err(PatternError::UnbalancedBrace {
                segment: raw.to_string(),
            });
        }
        if raw.contains('*') {
            return Err(PatternError::EmbeddedWildcard {
                segment: raw.to_string(),
            });
        }
        Ok(Self::Literal(raw.to_string()))
    }

    fn variable_name(&self) -> Option<&str> {
        match self {
            Self::Capture(name) | Self::CaptureRest(name) => Some(name),
            _ => None,
        }
    }
}

fn validate_name(name: &str) -> Result<String, PatternError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    if valid {
        Ok(name.to_string())
    } else {
        Err(PatternError::InvalidVariable {
            name: name.to_string(),
        })
    }
}

/// A compiled path pattern.
///
/// # Example
///
/// ```rust
/// use warden_router::PathPattern;
///
/// let pattern = PathPattern::parse("/orgs/{org}/**").unwrap();
///
/// let vars = pattern.matches("/orgs/acme/projects/7").unwrap();
/// assert_eq!(vars.get("org"), Some("acme"));
///
/// assert!(pattern.matches("/teams/acme").is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Parses and validates a pattern.
    ///
    /// # Errors
    ///
    /// Returns [`PatternError`] when the pattern is blank, does not start
    /// with `/`, has malformed or repeated variables, embeds wildcards or
    /// braces inside a literal, or places `{*name}` anywhere but last.
    pub fn parse(pattern: &str) -> Result<Self, PatternError> {
        let trimmed = pattern.trim();
        if trimmed.is_empty() {
            return Err(PatternError::Empty);
        }
        if !trimmed.starts_with('/') {
            return Err(PatternError::MissingLeadingSlash {
                pattern: trimmed.to_string(),
            });
        }

        let segments = trimmed
            .split('/')
            .filter(|s| !s.is_empty())
            .map(Segment::parse)
            .collect::<Result<Vec<_>, _>>()?;

        let mut seen = HashSet::new();
        for (index, segment) in segments.iter().enumerate() {
            let Some(name) = segment.variable_name() else {
                continue;
            };
            if !seen.insert(name) {
                return Err(PatternError::DuplicateVariable {
                    name: name.to_string(),
                });
            }
            if matches!(segment, Segment::CaptureRest(_)) && index + 1 != segments.len() {
                return Err(PatternError::RestNotLast {
                    name: name.to_string(),
                });
            }
        }

        Ok(Self {
            raw: trimmed.to_string(),
            segments,
        })
    }

    /// The pattern text as written.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The parsed segments.
    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Names of the variables this pattern captures, in order.
    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(Segment::variable_name)
    }

    /// Matches a raw request path, normalizing it first.
    #[must_use]
    pub fn matches(&self, path: &str) -> Option<PathVariables> {
        self.match_request(&RequestPath::new(path))
    }

    /// Matches an already-normalized request path.
    ///
    /// Runs in time polynomial in the pattern and path lengths no matter
    /// how many `**` segments the pattern has.
    #[must_use]
    pub fn match_request(&self, path: &RequestPath<'_>) -> Option<PathVariables> {
        let mut matcher = SegmentMatcher::new(&self.segments, path.segments());
        matcher.matches(0, 0).then_some(matcher.variables)
    }
}

/// Matches pattern segments against path segments.
///
/// `**` tries every split. States `(pattern index, path index)` that
/// already failed are remembered so each is explored at most once; a
/// failed state never leaves captures behind, so the memo is independent
/// of what has been captured so far.
struct SegmentMatcher<'m, 'a> {
    pattern: &'m [Segment],
    path: &'m [Cow<'a, str>],
    /// Failed states, indexed `pattern * (path.len() + 1) + path`. Empty
    /// when the pattern cannot backtrack.
    failed: Vec<bool>,
    variables: PathVariables,
}

impl<'m, 'a> SegmentMatcher<'m, 'a> {
    fn new(pattern: &'m [Segment], path: &'m [Cow<'a, str>]) -> Self {
        let backtracks = pattern
            .iter()
            .take(pattern.len().saturating_sub(1))
            .any(|s| matches!(s, Segment::AnyPath));
        let failed = if backtracks {
            vec![false; (pattern.len() + 1) * (path.len() + 1)]
        } else {
            Vec::new()
        };

        Self {
            pattern,
            path,
            failed,
            variables: PathVariables::new(),
        }
    }

    fn matches(&mut self, at: usize, pos: usize) -> bool {
        let state = at * (self.path.len() + 1) + pos;
        if self.failed.get(state).copied().unwrap_or(false) {
            return false;
        }

        let matched = self.step(at, pos);
        if !matched {
            if let Some(failed) = self.failed.get_mut(state) {
                *failed = true;
            }
        }
        matched
    }

    fn step(&mut self, at: usize, pos: usize) -> bool {
        let (pattern, path) = (self.pattern, self.path);
        let Some(head) = pattern.get(at) else {
            return pos == path.len();
        };
        let current = path.get(pos);

        match head {
            Segment::Literal(literal) => {
                current.is_some_and(|s| s.as_ref() == literal.as_str()) && self.matches(at + 1, pos + 1)
            }
            Segment::AnySegment => current.is_some() && self.matches(at + 1, pos + 1),
            Segment::Capture(name) => {
                let Some(value) = current else {
                    return false;
                };
                let mark = self.variables.len();
                self.variables.push(name.as_str(), value.as_ref());
                if self.matches(at + 1, pos + 1) {
                    return true;
                }
                self.variables.truncate(mark);
                false
            }
            Segment::AnyPath => {
                if at + 1 == pattern.len() {
                    return true;
                }
                (pos..=path.len()).any(|next| self.matches(at + 1, next))
            }
            Segment::CaptureRest(name) => {
                self.variables.push(name.as_str(), path[pos..].join("/"));
                true
            }
        }
    }
}

impl fmt::Display for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for PathPattern {
    type Err = PatternError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
