//! The assembled authorization service.

use std::path::Path;
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::info;
use warden_authz::{
    AuthorizationEngine, AuthzResult, Decision, Identity, RequestContext, RoleHierarchy,
    RuleTable,
};
use warden_config::{ConfigLoader, SourceKind, WardenConfig, DEFAULT_ENV_PREFIX};

use crate::source::build_source;
use crate::watch::spawn_rule_watcher;
use crate::WardenResult;

/// An engine built from a [`WardenConfig`], plus its rule-file watcher.
///
/// Requests that match no rule are allowed; see
/// [`AuthorizationEngine`] for details.
///
/// # Example
///
/// ```rust
/// use warden::{Identity, RequestContext, Warden};
/// use warden::config::ConfigLoader;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), warden::WardenError> {
/// let config = ConfigLoader::new()
///     .with_string(
///         r#"
///         [engine]
///         role_hierarchy = "ROLE_ADMIN > ROLE_USER"
///
///         [source]
///         kind = "inline"
///
///         [[source.rules]]
///         order = 1
///         pattern = "/admin/**"
///         requirement = "ROLE_ADMIN"
///         "#,
///         "toml",
///     )?
///     .load()?;
///
/// let warden = Warden::from_config(config).await?;
///
/// let admin = Identity::authenticated("root").with_authority("ROLE_ADMIN");
/// assert!(warden.check(|| admin, &RequestContext::get("/admin/users")).allowed);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct Warden {
    engine: Arc<AuthorizationEngine>,
    config: WardenConfig,
    watcher: Option<JoinHandle<()>>,
}

impl Warden {
    /// Loads `.env`, the configuration file and `WARDEN__*` overrides,
    /// initializes telemetry, then builds the service.
    ///
    /// Telemetry is process-global; call this once.
    ///
    /// # Errors
    ///
    /// Any configuration, telemetry or startup error.
    pub async fn bootstrap(path: impl AsRef<Path>) -> WardenResult<Self> {
        let config = ConfigLoader::new()
            .with_dotenv()?
            .with_file(path)?
            .with_env_prefix(DEFAULT_ENV_PREFIX)
            .load()?;

        warden_telemetry::init_telemetry(&config.telemetry.to_telemetry_config())?;
        Self::from_config(config).await
    }

    /// Builds the engine from `config`, loading the startup table and
    /// starting the rule watcher when `reload.watch` is set.
    ///
    /// Must be called from within a Tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the role
    /// hierarchy does not parse, the startup table cannot be built, or the
    /// rule file cannot be watched.
    pub async fn from_config(config: WardenConfig) -> WardenResult<Self> {
        config.validate()?;

        let hierarchy = RoleHierarchy::from_hierarchy(&config.engine.role_hierarchy)?;
        let source = build_source(&config.source, &config.engine)?;
        let engine = Arc::new(
            AuthorizationEngine::new(source, hierarchy, config.engine.to_engine_config()).await?,
        );

        let watcher = match (&config.source.kind, &config.source.path) {
            (SourceKind::File, Some(path)) if config.reload.watch => Some(spawn_rule_watcher(
                Arc::clone(&engine),
                Path::new(path),
                config.reload.debounce(),
            )?),
            _ => None,
        };

        info!(
            source = config.source.kind.as_str(),
            rules = engine.snapshot().len(),
            watching = watcher.is_some(),
            "warden ready"
        );

        Ok(Self {
            engine,
            config,
            watcher,
        })
    }

    /// Decides a request; see [`AuthorizationEngine::check`].
    pub fn check<F>(&self, identity: F, request: &RequestContext<'_>) -> Decision
    where
        F: FnOnce() -> Identity,
    {
        self.engine.check(identity, request)
    }

    /// Decides a request, failing on denial; see
    /// [`AuthorizationEngine::verify`].
    ///
    /// # Errors
    ///
    /// Returns `AuthzError::AccessDenied` when the decision is DENY.
    pub fn verify<F>(&self, identity: F, request: &RequestContext<'_>) -> AuthzResult<Decision>
    where
        F: FnOnce() -> Identity,
    {
        self.engine.verify(identity, request)
    }

    /// Rebuilds the rule table from the source now.
    ///
    /// # Errors
    ///
    /// See [`AuthorizationEngine::reload`]; the current table is kept.
    pub async fn reload(&self) -> AuthzResult<Arc<RuleTable>> {
        self.engine.reload().await
    }

    /// The shared engine, for handing to request handlers.
    pub const fn engine(&self) -> &Arc<AuthorizationEngine> {
        &self.engine
    }

    /// The configuration this service was built from.
    pub const fn config(&self) -> &WardenConfig {
        &self.config
    }

    /// Whether the rule-file watcher is running.
    pub fn is_watching(&self) -> bool {
        self.watcher.as_ref().is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for Warden {
    fn drop(&mut self) {
        if let Some(handle) = self.watcher.take() {
            handle.abort();
        }
    }
}
