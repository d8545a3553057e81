//! Authorities and the identity presented at decision time.

use std::borrow::Borrow;
use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// An opaque permission or role identifier, e.g. `ROLE_ADMIN` or `VERIFIED`.
///
/// Roles are recognized by a prefix convention (`ROLE` by default); every
/// other string is a free-form permission.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Authority(String);

impl Authority {
    /// Wraps an authority string.
    pub fn new(authority: impl Into<String>) -> Self {
        Self(authority.into())
    }

    /// The authority text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if this authority carries the role prefix.
    pub fn is_role(&self, role_prefix: &str) -> bool {
        self.0.starts_with(role_prefix)
    }
}

impl fmt::Display for Authority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Authority {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Authority {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for Authority {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A set of authorities, queryable by `&str`.
pub type AuthoritySet = HashSet<Authority>;

/// The caller as seen by the engine: a principal name, whether they
/// authenticated, and the authorities they were granted.
///
/// Authentication happens elsewhere; the engine only reads this.
///
/// # Example
///
/// ```rust
/// use warden_authz::Identity;
///
/// let alice = Identity::authenticated("alice")
///     .with_authorities(["ROLE_USER", "VERIFIED"]);
///
/// assert!(alice.is_authenticated());
/// assert!(alice.has_authority("VERIFIED"));
/// assert!(!Identity::anonymous().is_authenticated());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    name: Option<String>,
    authenticated: bool,
    #[serde(default)]
    authorities: AuthoritySet,
}

impl Identity {
    /// An authenticated principal with no authorities yet.
    pub fn authenticated(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            authenticated: true,
            authorities: AuthoritySet::new(),
        }
    }

    /// An unauthenticated caller with no authorities.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Adds one granted authority.
    pub fn with_authority(mut self, authority: impl Into<Authority>) -> Self {
        self.authorities.insert(authority.into());
        self
    }

    /// Adds several granted authorities.
    pub fn with_authorities<I, A>(mut self, authorities: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<Authority>,
    {
        self.authorities
            .extend(authorities.into_iter().map(Into::into));
        self
    }

    /// The principal name, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Whether the caller authenticated.
    pub const fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// The directly granted authorities, before hierarchy expansion.
    pub const fn authorities(&self) -> &AuthoritySet {
        &self.authorities
    }

    /// Direct membership test, without hierarchy expansion.
    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.contains(authority)
    }
}
