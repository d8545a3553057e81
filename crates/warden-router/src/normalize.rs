//! Request path normalization.
//!
//! Patterns are always matched against a normalized path:
//! - query string and fragment removed
//! - `;` path parameters removed from every segment (`/admin;jsessionid=x`)
//! - each segment percent-decoded once; a decoded `/` (`%2F`) separates
//!   segments like a literal one
//! - empty and `.` segments dropped, `..` resolved (never above the root),
//!   including dot segments that were percent-encoded
//! - leading `/` guaranteed, no trailing `/` except for the root itself
//!
//! Decoding happens exactly once, so a double-encoded segment such as
//! `%2561dmin` is matched as the literal `%61dmin`.

use std::borrow::Cow;

use smallvec::SmallVec;

/// Segments stored inline for typical request paths.
const INLINE_SEGMENTS: usize = 8;

/// Segments of a normalized path.
type PathSegments<'a> = SmallVec<[Cow<'a, str>; INLINE_SEGMENTS]>;

/// Normalizes a raw request path.
///
/// Returns the input unchanged (borrowed) when it is already normalized.
///
/// # Example
///
/// ```rust
/// use warden_router::normalize_path;
///
/// assert_eq!(normalize_path("/users/42"), "/users/42");
/// assert_eq!(normalize_path("/users//42/?x=1"), "/users/42");
/// assert_eq!(normalize_path("/a/./b/../c"), "/a/c");
/// assert_eq!(normalize_path("/%61dmin;jsessionid=x/settings"), "/admin/settings");
/// assert_eq!(normalize_path(""), "/");
/// ```
#[must_use]
pub fn normalize_path(raw: &str) -> Cow<'_, str> {
    if is_normalized(raw) {
        return Cow::Borrowed(raw);
    }
    Cow::Owned(join(&resolve(raw)))
}

/// Decodes and resolves `raw` into its final segments.
fn resolve(raw: &str) -> SmallVec<[String; INLINE_SEGMENTS]> {
    let path = raw.split(['?', '#']).next().unwrap_or_default();

    let mut stack: SmallVec<[String; INLINE_SEGMENTS]> = SmallVec::new();
    for encoded in path.split('/') {
        let decoded = decode_segment(strip_parameters(encoded));
        for segment in decoded.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    stack.pop();
                }
                s => stack.push(s.to_string()),
            }
        }
    }
    stack
}

fn join(segments: &[String]) -> String {
    if segments.is_empty() {
        return "/".to_string();
    }
    let mut normalized = String::with_capacity(segments.iter().map(|s| s.len() + 1).sum());
    for segment in segments {
        normalized.push('/');
        normalized.push_str(segment);
    }
    normalized
}

/// `users;v=1` -> `users`
fn strip_parameters(segment: &str) -> &str {
    segment.split_once(';').map_or(segment, |(head, _)| head)
}

/// Percent-decodes one segment. Malformed escapes are kept as written and
/// invalid UTF-8 is replaced.
fn decode_segment(segment: &str) -> Cow<'_, str> {
    if !segment.contains('%') {
        return Cow::Borrowed(segment);
    }
    let bytes = urlencoding::decode_binary(segment.as_bytes());
    Cow::Owned(String::from_utf8_lossy(&bytes).into_owned())
}

fn is_normalized(path: &str) -> bool {
    if path == "/" {
        return true;
    }
    if !path.starts_with('/') || path.ends_with('/') || path.contains(['?', '#', '%', ';']) {
        return false;
    }
    path[1..]
        .split('/')
        .all(|segment| !segment.is_empty() && segment != "." && segment != "..")
}

/// A normalized request path, split into segments once.
///
/// Every rule in a table is tried against the same `RequestPath`, so
/// normalization and splitting are paid once per decision rather than per
/// rule.
#[derive(Debug, Clone)]
pub struct RequestPath<'a> {
    path: Cow<'a, str>,
    segments: PathSegments<'a>,
}

impl<'a> RequestPath<'a> {
    /// Normalizes `raw` and prepares it for matching.
    #[must_use]
    pub fn new(raw: &'a str) -> Self {
        if is_normalized(raw) {
            return Self {
                path: Cow::Borrowed(raw),
                segments: raw
                    .split('/')
                    .filter(|s| !s.is_empty())
                    .map(Cow::Borrowed)
                    .collect(),
            };
        }

        let resolved = resolve(raw);
        Self {
            path: Cow::Owned(join(&resolved)),
            segments: resolved.into_iter().map(Cow::Owned).collect(),
        }
    }

    /// The normalized path.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.path
    }

    /// The decoded path segments, without separators.
    #[must_use]
    pub fn segments(&self) -> &[Cow<'a, str>] {
        &self.segments
    }
}
