//! # Warden
//!
//! **Path-rule authorization with role hierarchies and hot reload**
//!
//! Warden decides whether a caller may perform a request by matching the
//! request path against an ordered table of rules:
//!
//! - 🔒 **First match wins** – rules are evaluated in table order, no specificity sorting
//! - 🧬 **Role hierarchies** – `ROLE_ADMIN > ROLE_USER` grants admins everything users get
//! - 🧮 **Expressions** – `hasRole('USER') and hasAuthority('VERIFIED')`, `#id == principal`
//! - 🔄 **Hot reload** – a new table is built aside and swapped atomically
//! - 📊 **Observability** – structured `tracing` logs and Prometheus metrics
//!
//! **A request that matches no rule is allowed.** End the table with
//! `/**` → `denyAll` to deny by default.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use warden::{Identity, RequestContext, Warden};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let warden = Warden::bootstrap("warden.toml").await?;
//!
//!     let caller = Identity::authenticated("alice").with_authority("ROLE_USER");
//!     let decision = warden.check(|| caller, &RequestContext::get("/reports/q3"));
//!     println!("allowed: {}", decision.allowed);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! warden.toml ─► ConfigLoader ─► Warden::from_config
//!                                   │
//!            ┌──────────────────────┼───────────────────────┐
//!            ▼                      ▼                       ▼
//!      RuleSource            RoleHierarchy           FileWatcher
//!   (file/http/inline)                          (reload on change)
//!            └──────────► AuthorizationEngine ◄─────────────┘
//!                                   │
//!                 check(identity, request) → Decision
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod source;
mod warden;
mod watch;

pub use error::{WardenError, WardenResult};
pub use source::build_source;
pub use warden::Warden;
pub use watch::spawn_rule_watcher;

// Re-export authorization types
pub use warden_authz as authz;

// Re-export configuration types
pub use warden_config as config;

// Re-export path matching types
pub use warden_router as router;

// Re-export telemetry setup
pub use warden_telemetry as telemetry;

pub use warden_authz::{
    AuthorizationEngine, AuthzError, Decision, Identity, RequestContext, RoleHierarchy,
};

/// Prelude module for convenient imports.
///
/// ```rust
/// use warden::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{Warden, WardenError, WardenResult};

    pub use warden_authz::{
        Authority, AuthorizationEngine, AuthzError, AuthzResult, Decision, EngineConfig, Identity,
        RequestContext, RoleHierarchy, RuleSource, StaticRuleSource,
    };

    pub use warden_config::{ConfigLoader, WardenConfig};
}
