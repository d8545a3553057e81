//! Per-request inputs to a decision.

use std::borrow::Cow;

use http::Method;
use warden_router::{PathVariables, RequestPath};

use crate::authority::Identity;

/// The request being authorized: method and normalized path.
///
/// The method is carried for logging and expressions; rule matching
/// ignores it.
#[derive(Debug, Clone)]
pub struct RequestContext<'a> {
    method: Method,
    path: RequestPath<'a>,
}

impl<'a> RequestContext<'a> {
    /// Creates a context, normalizing `path`.
    pub fn new(method: Method, path: &'a str) -> Self {
        Self {
            method,
            path: RequestPath::new(path),
        }
    }

    /// Shorthand for a `GET` request.
    pub fn get(path: &'a str) -> Self {
        Self::new(Method::GET, path)
    }

    /// The request method.
    pub const fn method(&self) -> &Method {
        &self.method
    }

    /// The normalized request path.
    pub const fn path(&self) -> &RequestPath<'a> {
        &self.path
    }
}

/// A request plus the variables captured by the rule that matched it.
#[derive(Debug, Clone, Copy)]
pub struct MatchContext<'r, 'a> {
    request: &'r RequestContext<'a>,
    variables: &'r PathVariables,
}

impl<'r, 'a> MatchContext<'r, 'a> {
    /// Pairs a request with its match variables.
    pub const fn new(request: &'r RequestContext<'a>, variables: &'r PathVariables) -> Self {
        Self { request, variables }
    }

    /// The request.
    pub const fn request(&self) -> &'r RequestContext<'a> {
        self.request
    }

    /// A captured path variable.
    pub fn variable(&self, name: &str) -> Option<&'r str> {
        self.variables.get(name)
    }

    /// All captured variables.
    pub const fn variables(&self) -> &'r PathVariables {
        self.variables
    }
}

/// An identity that is produced on first use.
///
/// Resolving an identity may be expensive (session lookup, token
/// introspection), so the supplier runs at most once and only when the
/// matched rule actually consults the caller.
///
/// # Example
///
/// ```rust
/// use std::cell::Cell;
/// use warden_authz::{Identity, LazyIdentity};
///
/// let calls = Cell::new(0);
/// let mut identity = LazyIdentity::new(|| {
///     calls.set(calls.get() + 1);
///     Identity::authenticated("alice")
/// });
///
/// assert!(!identity.is_resolved());
/// assert_eq!(identity.get().name(), Some("alice"));
/// assert_eq!(identity.get().name(), Some("alice"));
/// assert_eq!(calls.get(), 1);
/// ```
pub struct LazyIdentity<'a, F = fn() -> Identity> {
    supplier: Option<F>,
    resolved: Option<Cow<'a, Identity>>,
}

impl<'a, F> LazyIdentity<'a, F>
where
    F: FnOnce() -> Identity,
{
    /// Wraps a supplier that has not run yet.
    pub const fn new(supplier: F) -> Self {
        Self {
            supplier: Some(supplier),
            resolved: None,
        }
    }

    /// Returns the identity, invoking the supplier on first call.
    pub fn get(&mut self) -> &Identity {
        let supplier = &mut self.supplier;
        let resolved = self.resolved.get_or_insert_with(|| {
            Cow::Owned(supplier.take().map_or_else(Identity::anonymous, |f| f()))
        });
        &**resolved
    }

    /// Whether the identity has been produced.
    pub const fn is_resolved(&self) -> bool {
        self.resolved.is_some()
    }
}

impl<'a> LazyIdentity<'a> {
    /// Wraps an identity that is already available.
    pub const fn resolved(identity: &'a Identity) -> Self {
        Self {
            supplier: None,
            resolved: Some(Cow::Borrowed(identity)),
        }
    }
}

impl<F> std::fmt::Debug for LazyIdentity<'_, F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LazyIdentity")
            .field("resolved", &self.resolved)
            .finish_non_exhaustive()
    }
}
