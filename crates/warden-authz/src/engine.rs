//! The authorization engine.

use std::sync::Arc;
use std::time::Instant;

use parking_lot::RwLock;
use tracing::{debug, info, instrument, warn};
use warden_telemetry::metrics::{record_decision, record_reload, set_rule_table_size};

use crate::authority::Identity;
use crate::compiler::RuleCompiler;
use crate::config::EngineConfig;
use crate::context::{LazyIdentity, MatchContext, RequestContext};
use crate::error::{AuthzError, AuthzResult};
use crate::hierarchy::RoleHierarchy;
use crate::source::RuleSource;
use crate::table::RuleTable;

/// The outcome of a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// Whether the request may proceed.
    pub allowed: bool,
}

impl Decision {
    /// An allowing decision.
    pub const ALLOW: Self = Self { allowed: true };
    /// A denying decision.
    pub const DENY: Self = Self { allowed: false };

    /// Returns true if the request may proceed.
    pub const fn is_allowed(self) -> bool {
        self.allowed
    }
}

/// Decides requests against an ordered, hot-reloadable rule table.
///
/// # Default allow
///
/// **A request that matches no rule is allowed.** Deployments that want
/// deny-by-default must end their table with a catch-all rule such as
/// `/**` → `denyAll`.
///
/// # Concurrency
///
/// `check` only holds a read lock long enough to clone the current table
/// pointer, then decides against that snapshot. `reload` builds a new
/// table without any lock held, then swaps the pointer under a brief
/// write lock, so in-flight checks finish on the table they started with
/// and never observe a half-built one. Reloads are serialized.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use warden_authz::{
///     AuthorizationEngine, EngineConfig, Identity, RequestContext, RoleHierarchy,
///     StaticRuleSource,
/// };
///
/// # tokio_test::block_on(async {
/// let source = StaticRuleSource::new()
///     .with_rule("1", "GET|/admin/**", "ROLE_ADMIN")
///     .with_rule("2", "GET|/user/{id}", "hasRole('USER') and hasAuthority('VERIFIED')");
/// let hierarchy = RoleHierarchy::from_hierarchy("ROLE_ADMIN > ROLE_USER").unwrap();
///
/// let engine = AuthorizationEngine::new(Arc::new(source), hierarchy, EngineConfig::default())
///     .await
///     .unwrap();
///
/// let admin = Identity::authenticated("root").with_authority("ROLE_ADMIN");
/// assert!(engine.check(|| admin.clone(), &RequestContext::get("/admin/settings")).allowed);
/// assert!(!engine.check(|| admin.clone(), &RequestContext::get("/user/42")).allowed);
/// assert!(engine.check(Identity::anonymous, &RequestContext::get("/public/info")).allowed);
/// # });
/// ```
#[derive(Debug)]
pub struct AuthorizationEngine {
    source: Arc<dyn RuleSource>,
    compiler: RuleCompiler,
    current: RwLock<Arc<RuleTable>>,
    reload_lock: tokio::sync::Mutex<()>,
    config: EngineConfig,
}

impl AuthorizationEngine {
    /// Builds the engine and loads the startup table (generation 1).
    ///
    /// # Errors
    ///
    /// Configuration errors are always returned. `SourceUnavailable` is
    /// returned unless `config.empty_table_on_startup_failure` is set, in
    /// which case the engine starts with an empty table.
    pub async fn new(
        source: Arc<dyn RuleSource>,
        hierarchy: RoleHierarchy,
        config: EngineConfig,
    ) -> AuthzResult<Self> {
        let compiler = RuleCompiler::new(Arc::new(hierarchy), &config);
        let mut engine = Self {
            source,
            compiler,
            current: RwLock::new(Arc::new(RuleTable::empty())),
            reload_lock: tokio::sync::Mutex::new(()),
            config,
        };

        let startup = engine.build(1).await;
        match startup {
            Ok(table) => {
                info!(
                    source = %engine.source.describe(),
                    rules = table.len(),
                    generation = table.generation(),
                    "rule table loaded"
                );
                set_rule_table_size(table.len());
                *engine.current.get_mut() = Arc::new(table);
            }
            Err(e) if e.is_retryable() && engine.config.empty_table_on_startup_failure => {
                warn!(
                    source = %engine.source.describe(),
                    error = %e,
                    "rule source unavailable at startup; starting with an empty table (all requests allowed)"
                );
                set_rule_table_size(0);
            }
            Err(e) => return Err(e),
        }

        Ok(engine)
    }

    /// Decides a request, resolving the identity only if the matched rule
    /// needs it.
    ///
    /// Returns ALLOW when no rule matches.
    pub fn check<F>(&self, identity: F, request: &RequestContext<'_>) -> Decision
    where
        F: FnOnce() -> Identity,
    {
        self.decide(LazyIdentity::new(identity), request)
    }

    /// Decides a request for an identity that is already available.
    pub fn check_identity(&self, identity: &Identity, request: &RequestContext<'_>) -> Decision {
        self.decide(LazyIdentity::resolved(identity), request)
    }

    /// Like [`check`](Self::check), but a denial is an error.
    ///
    /// # Errors
    ///
    /// Returns `AuthzError::AccessDenied` when the decision is DENY.
    pub fn verify<F>(&self, identity: F, request: &RequestContext<'_>) -> AuthzResult<Decision>
    where
        F: FnOnce() -> Identity,
    {
        let decision = self.check(identity, request);
        if decision.allowed {
            Ok(decision)
        } else {
            Err(AuthzError::access_denied(format!(
                "{} {}",
                request.method(),
                request.path().as_str()
            )))
        }
    }

    fn decide<F>(&self, mut identity: LazyIdentity<'_, F>, request: &RequestContext<'_>) -> Decision
    where
        F: FnOnce() -> Identity,
    {
        let table = self.snapshot();

        let Some((rule, variables)) = table.find(request.path()) else {
            debug!(
                method = %request.method(),
                path = request.path().as_str(),
                generation = table.generation(),
                "no rule matched; allowing by default"
            );
            record_decision(true, false);
            return Decision::ALLOW;
        };

        let ctx = MatchContext::new(request, &variables);
        let allowed = rule.requirement().decide(&mut identity, &ctx);

        debug!(
            method = %request.method(),
            path = request.path().as_str(),
            rule = rule.order_key(),
            pattern = rule.pattern(),
            requirement = %rule.requirement(),
            allowed,
            "rule matched"
        );
        record_decision(allowed, true);

        Decision { allowed }
    }

    /// Fetches, compiles and atomically publishes a new table.
    ///
    /// On any error the current table stays active and the error is
    /// returned. Concurrent calls run one after another.
    ///
    /// # Errors
    ///
    /// `SourceUnavailable` if the fetch fails or exceeds the configured
    /// timeout; a configuration error if any rule is malformed.
    #[instrument(skip(self))]
    pub async fn reload(&self) -> AuthzResult<Arc<RuleTable>> {
        let _serialized = self.reload_lock.lock().await;
        let started = Instant::now();
        let current_generation = self.current.read().generation();

        match self.build(current_generation + 1).await {
            Ok(table) => {
                let table = Arc::new(table);
                let previous = std::mem::replace(&mut *self.current.write(), Arc::clone(&table));

                let elapsed = started.elapsed();
                record_reload("success", elapsed);
                set_rule_table_size(table.len());
                info!(
                    generation = table.generation(),
                    rules = table.len(),
                    previous_rules = previous.len(),
                    duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
                    "rule table reloaded"
                );
                Ok(table)
            }
            Err(e) => {
                let outcome = if e.is_configuration() {
                    "invalid"
                } else {
                    "unavailable"
                };
                record_reload(outcome, started.elapsed());
                warn!(
                    error = %e,
                    generation = current_generation,
                    "rule table reload failed; keeping current table"
                );
                Err(e)
            }
        }
    }

    async fn build(&self, generation: u64) -> AuthzResult<RuleTable> {
        let timeout = self.config.fetch_timeout;
        let raw = tokio::time::timeout(timeout, self.source.fetch_all())
            .await
            .map_err(|_| {
                AuthzError::source_unavailable(
                    self.source.describe(),
                    format!("fetch timed out after {}ms", timeout.as_millis()),
                )
            })??;

        self.compiler.compile(&raw, generation)
    }

    /// The table currently used for decisions.
    pub fn snapshot(&self) -> Arc<RuleTable> {
        Arc::clone(&self.current.read())
    }

    /// The role hierarchy, fixed for the engine's lifetime.
    pub fn hierarchy(&self) -> &RoleHierarchy {
        self.compiler.hierarchy()
    }

    /// The engine configuration.
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The rule source.
    pub fn source(&self) -> &Arc<dyn RuleSource> {
        &self.source
    }
}
