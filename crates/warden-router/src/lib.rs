//! Path patterns for Warden.
//!
//! This crate turns the pattern half of a rule key into a matcher and
//! extracts named variables from request paths. It knows nothing about
//! authorization: the engine asks "does this path match, and with which
//! variables?" and nothing else.
//!
//! # Features
//!
//! - **Ordered-segment patterns**: literals, `*`, `**`, `{name}` and `{*name}`
//! - **Strict validation**: malformed patterns are rejected when a table is built
//! - **Path normalization**: query strings, `;` parameters, percent-encoding,
//!   duplicate slashes and dot segments never change a decision
//! - **Bounded matching**: any number of `**` segments matches in polynomial time
//! - **Few allocations**: variables and segments live in small vectors
//!
//! # Example
//!
//! ```rust
//! use warden_router::{PathMatcher, PathPattern, RequestPath};
//!
//! let pattern = PathPattern::parse("/orgs/{orgId}/users/{userId}").unwrap();
//! let path = RequestPath::new("/orgs/acme//users/123/?tab=roles");
//!
//! let vars = pattern.match_path(&path).unwrap();
//! assert_eq!(vars.get("orgId"), Some("acme"));
//! assert_eq!(vars.get("userId"), Some("123"));
//! ```

mod error;
mod matcher;
mod normalize;
mod pattern;
mod variables;

pub use error::PatternError;
pub use matcher::PathMatcher;
pub use normalize::{normalize_path, RequestPath};
pub use pattern::{PathPattern, Segment};
pub use variables::PathVariables;
