//! Warden Authorization - ordered path rules with role hierarchies
//!
//! This crate decides whether a caller may perform a request, using an
//! ordered table of rules fetched from a pluggable [`RuleSource`].
//!
//! # Overview
//!
//! Each rule pairs a path pattern with a requirement:
//! - an authority name such as `ROLE_ADMIN`, satisfied directly or through
//!   the [`RoleHierarchy`]
//! - an expression such as `hasRole('USER') and hasAuthority('VERIFIED')`
//!
//! The first rule whose pattern matches the request path decides.
//!
//! **If no rule matches, the request is ALLOWED.** End the table with a
//! `/**` → `denyAll` rule to deny by default.
//!
//! # Architecture
//!
//! ```text
//!                      ┌────────────────────────────┐
//!                      │   RuleSource               │
//!                      │   (static / file / http)   │
//!                      └──────────┬─────────────────┘
//!                                 │ fetch_all (bounded by timeout)
//!                      ┌──────────▼─────────────────┐
//!                      │   RuleCompiler             │
//!                      │   (patterns + requirements)│
//!                      └──────────┬─────────────────┘
//!                                 │ RuleTable, swapped atomically
//!   identity supplier  ┌──────────▼─────────────────┐
//!          │           │   AuthorizationEngine      │
//!          ▼           └──────────┬─────────────────┘
//!     ┌────────────┐              │ first match
//!     │  Request   │──────────────▼
//!     └────────────┘   Decision (allow/deny)
//! ```
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use warden_authz::{
//!     AuthorizationEngine, EngineConfig, Identity, RequestContext, RoleHierarchy,
//!     StaticRuleSource,
//! };
//!
//! # tokio_test::block_on(async {
//! let source = StaticRuleSource::new()
//!     .with_rule("010", "GET|/reports/**", "hasAnyRole('ANALYST', 'ADMIN')")
//!     .with_rule("020", "*|/**", "denyAll");
//!
//! let engine = AuthorizationEngine::new(
//!     Arc::new(source),
//!     RoleHierarchy::new(),
//!     EngineConfig::default(),
//! )
//! .await
//! .unwrap();
//!
//! let analyst = Identity::authenticated("ana").with_authority("ROLE_ANALYST");
//! let request = RequestContext::get("/reports/q3");
//! assert!(engine.verify(|| analyst, &request).is_ok());
//!
//! let request = RequestContext::get("/anything-else");
//! assert!(!engine.check(Identity::anonymous, &request).allowed);
//! # });
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod authority;
pub mod compiler;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod expression;
pub mod hierarchy;
pub mod requirement;
pub mod source;
pub mod table;

// Re-exports for convenience
pub use authority::{Authority, AuthoritySet, Identity};
pub use compiler::RuleCompiler;
pub use config::EngineConfig;
pub use context::{LazyIdentity, MatchContext, RequestContext};
pub use engine::{AuthorizationEngine, Decision};
pub use error::{AuthzError, AuthzResult};
pub use expression::{CompiledExpression, ExpressionError, ExpressionEvaluator};
pub use hierarchy::{RoleHierarchy, RoleHierarchyBuilder};
pub use requirement::{AuthorityRequirement, Requirement};
pub use source::{
    DocumentFormat, FileRuleSource, HttpRuleSource, RawRule, RawRules, RuleDocument, RuleRecord,
    RuleSource, StaticRuleSource,
};
pub use table::{Rule, RuleSummary, RuleTable};
