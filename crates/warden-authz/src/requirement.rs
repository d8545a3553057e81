//! The access condition attached to a rule.

use std::fmt;
use std::sync::Arc;

use crate::authority::{Authority, Identity};
use crate::context::{LazyIdentity, MatchContext};
use crate::expression::CompiledExpression;
use crate::hierarchy::RoleHierarchy;

/// A resolved requirement: plain authority membership or a boolean
/// expression.
///
/// Which kind a raw requirement becomes is decided once, when the rule is
/// compiled, by [`RuleCompiler`](crate::RuleCompiler).
#[derive(Debug, Clone)]
pub enum Requirement {
    /// The caller must hold this authority, after hierarchy expansion.
    Authority(AuthorityRequirement),
    /// The expression must evaluate to true.
    Expression(CompiledExpression),
}

impl Requirement {
    /// Decides the requirement for one request.
    pub fn decide<F>(&self, identity: &mut LazyIdentity<'_, F>, ctx: &MatchContext<'_, '_>) -> bool
    where
        F: FnOnce() -> Identity,
    {
        match self {
            Self::Authority(requirement) => requirement.decide(identity),
            Self::Expression(expression) => expression.evaluate(identity, ctx),
        }
    }

    /// Returns true for an authority requirement.
    pub const fn is_authority(&self) -> bool {
        matches!(self, Self::Authority(_))
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Authority(requirement) => fmt::Display::fmt(&requirement.authority, f),
            Self::Expression(expression) => fmt::Display::fmt(expression, f),
        }
    }
}

/// Requires one authority, honoring the role hierarchy.
#[derive(Debug, Clone)]
pub struct AuthorityRequirement {
    authority: Authority,
    hierarchy: Arc<RoleHierarchy>,
}

impl AuthorityRequirement {
    /// Creates the requirement.
    pub fn new(authority: impl Into<Authority>, hierarchy: Arc<RoleHierarchy>) -> Self {
        Self {
            authority: authority.into(),
            hierarchy,
        }
    }

    /// The required authority.
    pub const fn authority(&self) -> &Authority {
        &self.authority
    }

    /// Checks membership in the caller's expanded authorities.
    pub fn decide<F>(&self, identity: &mut LazyIdentity<'_, F>) -> bool
    where
        F: FnOnce() -> Identity,
    {
        self.hierarchy
            .grants(identity.get().authorities(), self.authority.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RequestContext;
    use crate::expression::ExpressionEvaluator;
    use warden_router::PathVariables;

    fn hierarchy() -> Arc<RoleHierarchy> {
        Arc::new(RoleHierarchy::from_hierarchy("ROLE_ADMIN > ROLE_USER").unwrap())
    }

    #[test]
    fn test_authority_requirement_uses_hierarchy() {
        let requirement = AuthorityRequirement::new("ROLE_USER", hierarchy());

        let admin = Identity::authenticated("root").with_authority("ROLE_ADMIN");
        assert!(requirement.decide(&mut LazyIdentity::resolved(&admin)));

        let nobody = Identity::authenticated("nobody");
        assert!(!requirement.decide(&mut LazyIdentity::resolved(&nobody)));
    }

    #[test]
    fn test_requirement_dispatch() {
        let hierarchy = hierarchy();
        let request = RequestContext::get("/user/42");
        let vars = PathVariables::new();
        let ctx = MatchContext::new(&request, &vars);

        let authority = Requirement::Authority(AuthorityRequirement::new(
            "ROLE_ADMIN",
            Arc::clone(&hierarchy),
        ));
        let expression = Requirement::Expression(
            ExpressionEvaluator::new(hierarchy, "ROLE")
                .compile("isAuthenticated()")
                .unwrap(),
        );

        let user = Identity::authenticated("alice").with_authority("ROLE_USER");
        assert!(!authority.decide(&mut LazyIdentity::resolved(&user), &ctx));
        assert!(expression.decide(&mut LazyIdentity::resolved(&user), &ctx));

        assert!(authority.is_authority());
        assert!(!expression.is_authority());
        assert_eq!(authority.to_string(), "ROLE_ADMIN");
        assert_eq!(expression.to_string(), "isAuthenticated()");
    }
}
