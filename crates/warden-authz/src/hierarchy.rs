//! Role hierarchy: transitive implication between authorities.
//!
//! `ROLE_ADMIN > ROLE_USER` means anyone granted `ROLE_ADMIN` is treated
//! as also holding `ROLE_USER`. Implications chain, and cycles are
//! tolerated: expansion tracks visited authorities and always terminates.

use std::collections::{HashMap, VecDeque};

use crate::authority::{Authority, AuthoritySet};
use crate::error::{AuthzError, AuthzResult};

/// Directed implication graph over authorities.
///
/// Read-only once built; shared between compiled rules.
///
/// # Example
///
/// ```rust
/// use warden_authz::{Authority, AuthoritySet, RoleHierarchy};
///
/// let hierarchy = RoleHierarchy::from_hierarchy(
///     "ROLE_ADMIN > ROLE_MANAGER > ROLE_USER",
/// ).unwrap();
///
/// let granted: AuthoritySet = [Authority::from("ROLE_ADMIN")].into_iter().collect();
/// let expanded = hierarchy.expand(&granted);
///
/// assert!(expanded.contains("ROLE_USER"));
/// assert_eq!(expanded.len(), 3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RoleHierarchy {
    implied: HashMap<Authority, Vec<Authority>>,
}

impl RoleHierarchy {
    /// An empty hierarchy; `expand` returns its input unchanged.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts building a hierarchy edge by edge.
    pub fn builder() -> RoleHierarchyBuilder {
        RoleHierarchyBuilder::default()
    }

    /// Parses the textual chain form.
    ///
    /// One chain per line, `A > B > C` meaning A implies B and B implies C.
    /// Blank lines are ignored.
    ///
    /// # Errors
    ///
    /// Returns `AuthzError::Config` for a line with an empty role name or
    /// with a single role and no implication.
    pub fn from_hierarchy(text: &str) -> AuthzResult<Self> {
        let mut builder = Self::builder();

        for (index, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let roles: Vec<&str> = line.split('>').map(str::trim).collect();
            if roles.len() < 2 {
                return Err(AuthzError::Config(format!(
                    "role hierarchy line {}: `{line}` has no implication",
                    index + 1
                )));
            }
            if roles.iter().any(|r| r.is_empty()) {
                return Err(AuthzError::Config(format!(
                    "role hierarchy line {}: `{line}` has an empty role name",
                    index + 1
                )));
            }

            for pair in roles.windows(2) {
                builder = builder.implies(pair[0], pair[1]);
            }
        }

        Ok(builder.build())
    }

    /// Returns true if no implications are defined.
    pub fn is_empty(&self) -> bool {
        self.implied.is_empty()
    }

    /// Authorities directly implied by `authority`.
    pub fn implied_by(&self, authority: &str) -> &[Authority] {
        self.implied.get(authority).map(Vec::as_slice).unwrap_or_default()
    }

    /// Every authority reachable from `authority`.
    ///
    /// The starting authority is only included if a cycle leads back to it.
    pub fn reachable(&self, authority: &str) -> AuthoritySet {
        let mut reached = AuthoritySet::new();
        let mut queue: VecDeque<&Authority> = self.implied_by(authority).iter().collect();

        while let Some(next) = queue.pop_front() {
            if reached.insert(next.clone()) {
                queue.extend(self.implied_by(next.as_str()));
            }
        }

        reached
    }

    /// `granted` plus everything it transitively implies.
    ///
    /// Idempotent: `expand(&expand(s)) == expand(s)`.
    pub fn expand(&self, granted: &AuthoritySet) -> AuthoritySet {
        let mut expanded = granted.clone();
        if self.is_empty() {
            return expanded;
        }

        let mut queue: VecDeque<&Authority> = granted.iter().collect();
        while let Some(current) = queue.pop_front() {
            for implied in self.implied_by(current.as_str()) {
                if expanded.insert(implied.clone()) {
                    queue.push_back(implied);
                }
            }
        }

        expanded
    }

    /// Returns true if `granted`, after expansion, contains `required`.
    ///
    /// Stops as soon as `required` is found instead of materializing the
    /// full expansion.
    pub fn grants(&self, granted: &AuthoritySet, required: &str) -> bool {
        if granted.contains(required) {
            return true;
        }
        if self.is_empty() {
            return false;
        }

        let mut visited = AuthoritySet::new();
        let mut queue: VecDeque<&Authority> = granted.iter().collect();
        while let Some(current) = queue.pop_front() {
            for implied in self.implied_by(current.as_str()) {
                if implied.as_str() == required {
                    return true;
                }
                if !granted.contains(implied.as_str()) && visited.insert(implied.clone()) {
                    queue.push_back(implied);
                }
            }
        }

        false
    }
}

/// Builder for [`RoleHierarchy`].
#[derive(Debug, Default)]
pub struct RoleHierarchyBuilder {
    implied: HashMap<Authority, Vec<Authority>>,
}

impl RoleHierarchyBuilder {
    /// Declares that `higher` implies `lower`.
    pub fn implies(mut self, higher: impl Into<Authority>, lower: impl Into<Authority>) -> Self {
        let lower = lower.into();
        let edges = self.implied.entry(higher.into()).or_default();
        if !edges.contains(&lower) {
            edges.push(lower);
        }
        self
    }

    /// Finishes the hierarchy.
    pub fn build(self) -> RoleHierarchy {
        RoleHierarchy {
            implied: self.implied,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn set(items: &[&str]) -> AuthoritySet {
        items.iter().map(|s| Authority::from(*s)).collect()
    }

    #[test]
    fn test_empty_hierarchy_is_identity() {
        let hierarchy = RoleHierarchy::new();
        let granted = set(&["ROLE_USER", "VERIFIED"]);
        assert_eq!(hierarchy.expand(&granted), granted);
        assert!(hierarchy.expand(&AuthoritySet::new()).is_empty());
    }

    #[test]
    fn test_expand_is_transitive() {
        let hierarchy = RoleHierarchy::builder()
            .implies("ROLE_ADMIN", "ROLE_MANAGER")
            .implies("ROLE_MANAGER", "ROLE_USER")
            .build();

        let expanded = hierarchy.expand(&set(&["ROLE_ADMIN"]));
        assert_eq!(expanded, set(&["ROLE_ADMIN", "ROLE_MANAGER", "ROLE_USER"]));

        let expanded = hierarchy.expand(&set(&["ROLE_USER"]));
        assert_eq!(expanded, set(&["ROLE_USER"]));
    }

    #[test]
    fn test_cycle_terminates() {
        let hierarchy = RoleHierarchy::builder()
            .implies("A", "B")
            .implies("B", "C")
            .implies("C", "A")
            .build();

        assert_eq!(hierarchy.expand(&set(&["A"])), set(&["A", "B", "C"]));
        assert_eq!(hierarchy.reachable("A"), set(&["A", "B", "C"]));
        assert!(hierarchy.grants(&set(&["B"]), "A"));
        assert!(!hierarchy.grants(&set(&["B"]), "D"));
    }

    #[test]
    fn test_reachable_excludes_start_without_cycle() {
        let hierarchy = RoleHierarchy::from_hierarchy("ROLE_ADMIN > ROLE_USER").unwrap();
        assert_eq!(hierarchy.reachable("ROLE_ADMIN"), set(&["ROLE_USER"]));
        assert!(hierarchy.reachable("ROLE_USER").is_empty());
    }

    #[test]
    fn test_grants_matches_expand() {
        let hierarchy = RoleHierarchy::from_hierarchy(
            "ROLE_ADMIN > ROLE_MANAGER\nROLE_MANAGER > ROLE_USER\nROLE_AUDITOR > ROLE_USER",
        )
        .unwrap();

        let granted = set(&["ROLE_ADMIN"]);
        assert!(hierarchy.grants(&granted, "ROLE_ADMIN"));
        assert!(hierarchy.grants(&granted, "ROLE_USER"));
        assert!(!hierarchy.grants(&granted, "ROLE_AUDITOR"));
        assert!(!hierarchy.grants(&AuthoritySet::new(), "ROLE_USER"));
    }

    #[test]
    fn test_from_hierarchy_chains_and_blank_lines() {
        let hierarchy = RoleHierarchy::from_hierarchy(
            "\n  ROLE_ADMIN > ROLE_MANAGER > ROLE_USER  \n\n ROLE_OPS>ROLE_USER\n",
        )
        .unwrap();

        assert_eq!(hierarchy.implied_by("ROLE_ADMIN"), &[Authority::from("ROLE_MANAGER")]);
        assert_eq!(hierarchy.implied_by("ROLE_OPS"), &[Authority::from("ROLE_USER")]);
        assert!(hierarchy.implied_by("ROLE_USER").is_empty());
    }

    #[test]
    fn test_from_hierarchy_errors() {
        let err = RoleHierarchy::from_hierarchy("ROLE_ADMIN").unwrap_err();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("no implication"));

        let err = RoleHierarchy::from_hierarchy("ROLE_ADMIN > > ROLE_USER").unwrap_err();
        assert!(err.to_string().contains("empty role name"));

        let err = RoleHierarchy::from_hierarchy("ok > fine\n> ROLE_USER").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_builder_deduplicates_edges() {
        let hierarchy = RoleHierarchy::builder()
            .implies("A", "B")
            .implies("A", "B")
            .build();
        assert_eq!(hierarchy.implied_by("A").len(), 1);
    }

    fn arb_hierarchy() -> impl Strategy<Value = RoleHierarchy> {
        prop::collection::vec((0u8..8, 0u8..8), 0..16).prop_map(|edges| {
            edges
                .into_iter()
                .fold(RoleHierarchy::builder(), |b, (hi, lo)| {
                    b.implies(format!("R{hi}"), format!("R{lo}"))
                })
                .build()
        })
    }

    fn arb_granted() -> impl Strategy<Value = AuthoritySet> {
        prop::collection::hash_set(0u8..8, 0..4)
            .prop_map(|ids| ids.into_iter().map(|i| Authority::new(format!("R{i}"))).collect())
    }

    proptest! {
        #[test]
        fn expansion_is_idempotent(hierarchy in arb_hierarchy(), granted in arb_granted()) {
            let once = hierarchy.expand(&granted);
            let twice = hierarchy.expand(&once);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn expansion_contains_input(hierarchy in arb_hierarchy(), granted in arb_granted()) {
            let expanded = hierarchy.expand(&granted);
            prop_assert!(granted.iter().all(|a| expanded.contains(a)));
        }

        #[test]
        fn grants_agrees_with_expand(
            hierarchy in arb_hierarchy(),
            granted in arb_granted(),
            target in 0u8..8,
        ) {
            let target = format!("R{target}");
            prop_assert_eq!(
                hierarchy.grants(&granted, &target),
                hierarchy.expand(&granted).contains(target.as_str())
            );
        }
    }
}
