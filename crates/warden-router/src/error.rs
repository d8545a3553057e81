//! Pattern parsing errors.

use thiserror::Error;

/// Errors raised while parsing a [`PathPattern`](crate::PathPattern).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum PatternError {
    /// The pattern was empty or blank.
    #[error("pattern is empty")]
    Empty,

    /// The pattern did not start with `/`.
    #[error("pattern `{pattern}` must start with '/'")]
    MissingLeadingSlash {
        /// The offending pattern.
        pattern: String,
    },

    /// A `{` or `}` appeared outside a whole-segment variable.
    #[error("unbalanced or embedded brace in segment `{segment}`")]
    UnbalancedBrace {
        /// The offending segment.
        segment: String,
    },

    /// A `*` appeared inside a literal segment.
    #[error("wildcard must occupy a whole segment, found `{segment}`")]
    EmbeddedWildcard {
        /// The offending segment.
        segment: String,
    },

    /// A variable name was empty or contained invalid characters.
    #[error("invalid variable name `{name}`")]
    InvalidVariable {
        /// The offending name.
        name: String,
    },

    /// The same variable name was captured twice.
    #[error("variable `{name}` appears more than once")]
    DuplicateVariable {
        /// The repeated name.
        name: String,
    },

    /// `{*name}` was not the final segment.
    #[error("capture-rest variable `{name}` must be the last segment")]
    RestNotLast {
        /// The variable name.
        name: String,
    },
}
