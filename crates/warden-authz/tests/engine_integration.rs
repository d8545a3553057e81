//! Integration tests for the authorization engine.
//!
//! These exercise the engine end to end: rule sources, compilation,
//! first-match decisions and hot reload under concurrent load.

use std::cell::Cell;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use warden_authz::{
    AuthorizationEngine, AuthzError, AuthzResult, EngineConfig, FileRuleSource, HttpRuleSource,
    Identity, RawRule, RawRules, RequestContext, RoleHierarchy, RuleSource, StaticRuleSource,
};

/// A source that can be switched into a failing state.
#[derive(Debug, Default)]
struct FlakySource {
    inner: StaticRuleSource,
    failing: AtomicBool,
    fetches: AtomicUsize,
}

impl FlakySource {
    fn new(inner: StaticRuleSource) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl RuleSource for FlakySource {
    async fn fetch_all(&self) -> AuthzResult<RawRules> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(AuthzError::source_unavailable("flaky", "backend offline"));
        }
        self.inner.fetch_all().await
    }

    fn describe(&self) -> String {
        "flaky".to_string()
    }
}

/// A source that never answers in time.
#[derive(Debug)]
struct StalledSource;

#[async_trait]
impl RuleSource for StalledSource {
    async fn fetch_all(&self) -> AuthzResult<RawRules> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(RawRules::new())
    }

    fn describe(&self) -> String {
        "stalled".to_string()
    }
}

fn demo_rules() -> StaticRuleSource {
    StaticRuleSource::new()
        .with_rule("1", "GET|/admin/**", "ROLE_ADMIN")
        .with_rule("2", "GET|/user/{id}", "hasRole('USER') and hasAuthority('VERIFIED')")
}

fn demo_hierarchy() -> RoleHierarchy {
    RoleHierarchy::from_hierarchy("ROLE_ADMIN > ROLE_USER").unwrap()
}

async fn demo_engine() -> AuthorizationEngine {
    AuthorizationEngine::new(Arc::new(demo_rules()), demo_hierarchy(), EngineConfig::default())
        .await
        .unwrap()
}

fn admin() -> Identity {
    Identity::authenticated("root").with_authority("ROLE_ADMIN")
}

fn verified_user() -> Identity {
    Identity::authenticated("alice").with_authorities(["ROLE_USER", "VERIFIED"])
}

// ─── Decisions ──────────────────────────────────────────────────────────

#[tokio::test]
async fn test_admin_denied_on_user_route_without_verified() {
    let engine = demo_engine().await;
    let decision = engine.check(admin, &RequestContext::get("/user/42"));
    assert!(!decision.allowed);
}

#[tokio::test]
async fn test_verified_user_allowed_on_user_route() {
    let engine = demo_engine().await;
    let decision = engine.check(verified_user, &RequestContext::get("/user/42"));
    assert!(decision.allowed);
}

#[tokio::test]
async fn test_admin_allowed_on_admin_route() {
    let engine = demo_engine().await;
    assert!(engine.check(admin, &RequestContext::get("/admin/settings")).allowed);
    assert!(!engine.check(verified_user, &RequestContext::get("/admin/settings")).allowed);
}

#[tokio::test]
async fn test_unmatched_path_allowed_by_default() {
    let engine = demo_engine().await;
    let decision = engine.check(Identity::anonymous, &RequestContext::get("/public/info"));
    assert!(decision.allowed);
}

#[tokio::test]
async fn test_method_is_not_part_of_matching() {
    let engine = demo_engine().await;
    let request = RequestContext::new(http::Method::DELETE, "/admin/settings");
    assert!(!engine.check(Identity::anonymous, &request).allowed);
}

#[tokio::test]
async fn test_first_matching_rule_decides() {
    let source = StaticRuleSource::new()
        .with_rule("a", "/docs/public/**", "permitAll")
        .with_rule("b", "/docs/**", "denyAll");
    let engine = AuthorizationEngine::new(Arc::new(source), RoleHierarchy::new(), EngineConfig::default())
        .await
        .unwrap();

    assert!(engine.check(Identity::anonymous, &RequestContext::get("/docs/public/intro")).allowed);
    assert!(!engine.check(admin, &RequestContext::get("/docs/internal")).allowed);
}

#[tokio::test]
async fn test_catch_all_deny_flips_default() {
    let source = demo_rules().with_rule("9", "*|/**", "denyAll");
    let engine = AuthorizationEngine::new(Arc::new(source), demo_hierarchy(), EngineConfig::default())
        .await
        .unwrap();
    assert!(!engine.check(admin, &RequestContext::get("/public/info")).allowed);
}

#[tokio::test]
async fn test_verify_reports_denied_request() {
    let engine = demo_engine().await;
    let err = engine
        .verify(Identity::anonymous, &RequestContext::get("/admin/users"))
        .unwrap_err();
    assert!(err.is_access_denied());
    assert!(!err.is_retryable());
    assert!(err.to_string().contains("/admin/users"));
}

#[tokio::test]
async fn test_identity_supplier_skipped_when_not_needed() {
    let source = StaticRuleSource::new().with_rule("1", "/public/**", "permitAll");
    let engine = AuthorizationEngine::new(Arc::new(source), RoleHierarchy::new(), EngineConfig::default())
        .await
        .unwrap();

    let calls = Cell::new(0);
    let supplier = || {
        calls.set(calls.get() + 1);
        Identity::anonymous()
    };

    assert!(engine.check(supplier, &RequestContext::get("/public/a")).allowed);
    assert!(engine.check(supplier, &RequestContext::get("/elsewhere")).allowed);
    assert_eq!(calls.get(), 0);
}

#[tokio::test]
async fn test_identity_supplier_invoked_once_per_check() {
    let engine = demo_engine().await;
    let calls = Cell::new(0);
    let decision = engine.check(
        || {
            calls.set(calls.get() + 1);
            verified_user()
        },
        &RequestContext::get("/user/7"),
    );
    assert!(decision.allowed);
    assert_eq!(calls.get(), 1);
}

#[tokio::test]
async fn test_encoded_paths_cannot_bypass_admin_rule() {
    let engine = demo_engine().await;
    for path in [
        "/admin/settings",
        "/%61dmin/settings",
        "/public/%2e%2e/admin/settings",
        "/admin;jsessionid=x/settings",
        "/admin%2Fsettings",
        "/ADMIN/../admin/settings",
    ] {
        let decision = engine.check(Identity::anonymous, &RequestContext::get(path));
        assert!(!decision.allowed, "{path} must hit the admin rule");
        assert!(engine.check(admin, &RequestContext::get(path)).allowed, "{path}");
    }
}

#[tokio::test]
async fn test_literal_authority_conjunction() {
    let source = StaticRuleSource::new()
        .with_rule("1", "GET|/admin/**", "ROLE_ADMIN")
        .with_rule(
            "2",
            "GET|/user/{id}",
            "hasAuthority('ROLE_USER') and hasAuthority('VERIFIED')",
        );
    let engine = AuthorizationEngine::new(Arc::new(source), demo_hierarchy(), EngineConfig::default())
        .await
        .unwrap();

    // the hierarchy grants ROLE_USER to an admin but never VERIFIED
    assert!(!engine.check(admin, &RequestContext::get("/user/42")).allowed);
    assert!(engine.check(verified_user, &RequestContext::get("/user/42")).allowed);
    assert!(engine.check(admin, &RequestContext::get("/admin/settings")).allowed);
    assert!(engine.check(Identity::anonymous, &RequestContext::get("/public/info")).allowed);
}

// ─── Startup ────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_startup_source_failure_is_fatal_by_default() {
    let source = FlakySource::new(demo_rules());
    source.set_failing(true);

    let err = AuthorizationEngine::new(Arc::new(source), demo_hierarchy(), EngineConfig::production())
        .await
        .unwrap_err();
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_startup_source_failure_with_empty_table_fallback() {
    let source = FlakySource::new(demo_rules());
    source.set_failing(true);
    let config = EngineConfig::default().with_empty_table_on_startup_failure(true);

    let engine = AuthorizationEngine::new(Arc::new(source), demo_hierarchy(), config)
        .await
        .unwrap();

    let table = engine.snapshot();
    assert!(table.is_empty());
    assert_eq!(table.generation(), 0);
    assert!(engine.check(Identity::anonymous, &RequestContext::get("/admin/settings")).allowed);
}

#[tokio::test]
async fn test_startup_invalid_rules_always_fatal() {
    let source = StaticRuleSource::new().with_rule("1", "/admin/{id", "ROLE_ADMIN");
    let config = EngineConfig::default().with_empty_table_on_startup_failure(true);

    let err = AuthorizationEngine::new(Arc::new(source), RoleHierarchy::new(), config)
        .await
        .unwrap_err();
    assert!(err.is_configuration());
    assert!(matches!(err, AuthzError::InvalidPattern { .. }));
}

#[tokio::test]
async fn test_startup_rejects_deeply_nested_expression() {
    let deep = format!("{}permitAll", "!".repeat(200_000));
    let source = StaticRuleSource::new().with_rule("1", "/admin/**", deep);

    let err = AuthorizationEngine::new(Arc::new(source), RoleHierarchy::new(), EngineConfig::default())
        .await
        .unwrap_err();
    assert!(err.is_configuration());
    assert!(matches!(err, AuthzError::InvalidRequirement { ref order_key, .. } if order_key == "1"));
}

#[tokio::test]
async fn test_startup_unreachable_http_source_falls_back() {
    let source = HttpRuleSource::new("http://127.0.0.1:1/rules");
    let config = EngineConfig::default()
        .with_fetch_timeout(Duration::from_secs(2))
        .with_empty_table_on_startup_failure(true);

    let engine = AuthorizationEngine::new(Arc::new(source), RoleHierarchy::new(), config)
        .await
        .unwrap();
    assert!(engine.snapshot().is_empty());
}

// ─── Reload ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_reload_publishes_new_rules() {
    let source = Arc::new(demo_rules());
    let engine = AuthorizationEngine::new(
        Arc::clone(&source) as Arc<dyn RuleSource>,
        demo_hierarchy(),
        EngineConfig::default(),
    )
    .await
    .unwrap();

    assert!(engine.check(Identity::anonymous, &RequestContext::get("/reports/q3")).allowed);

    let mut rules = RawRules::new();
    rules.insert("1".to_string(), RawRule::new("GET|/reports/**", "isAuthenticated()"));
    source.replace(rules);

    let table = engine.reload().await.unwrap();
    assert_eq!(table.generation(), 2);
    assert_eq!(table.len(), 1);
    assert!(!engine.check(Identity::anonymous, &RequestContext::get("/reports/q3")).allowed);
    // The admin rule is gone, so the default applies.
    assert!(engine.check(Identity::anonymous, &RequestContext::get("/admin/x")).allowed);
}

#[tokio::test]
async fn test_malformed_reload_keeps_current_table() {
    let source = Arc::new(demo_rules());
    let engine = AuthorizationEngine::new(
        Arc::clone(&source) as Arc<dyn RuleSource>,
        demo_hierarchy(),
        EngineConfig::default(),
    )
    .await
    .unwrap();

    let mut rules = RawRules::new();
    rules.insert("1".to_string(), RawRule::new("/admin/**", "ROLE_ADMIN"));
    rules.insert("2".to_string(), RawRule::new("/user/{id}", "hasRole('USER' and"));
    source.replace(rules);

    let err = engine.reload().await.unwrap_err();
    assert!(matches!(err, AuthzError::InvalidRequirement { ref order_key, .. } if order_key == "2"));

    let table = engine.snapshot();
    assert_eq!(table.generation(), 1);
    assert_eq!(table.len(), 2);
    assert!(engine.check(verified_user, &RequestContext::get("/user/42")).allowed);
}

#[tokio::test]
async fn test_deeply_nested_reload_keeps_current_table() {
    let source = Arc::new(demo_rules());
    let engine = AuthorizationEngine::new(
        Arc::clone(&source) as Arc<dyn RuleSource>,
        demo_hierarchy(),
        EngineConfig::default(),
    )
    .await
    .unwrap();

    let mut rules = RawRules::new();
    rules.insert("1".to_string(), RawRule::new("/admin/**", "ROLE_ADMIN"));
    rules.insert(
        "2".to_string(),
        RawRule::new("/user/{id}", format!("{}permitAll", "(".repeat(10_000))),
    );
    rules.insert(
        "3".to_string(),
        RawRule::new("/public/**", format!("{}permitAll", "!".repeat(200_000))),
    );
    source.replace(rules);

    let err = engine.reload().await.unwrap_err();
    assert!(err.is_configuration());

    let table = engine.snapshot();
    assert_eq!(table.generation(), 1);
    assert_eq!(table.len(), 2);
    assert!(engine.check(verified_user, &RequestContext::get("/user/42")).allowed);
    assert!(!engine.check(admin, &RequestContext::get("/user/42")).allowed);
    assert!(!engine.check(Identity::anonymous, &RequestContext::get("/admin/settings")).allowed);
}

#[tokio::test]
async fn test_unavailable_source_keeps_current_table() {
    let source = Arc::new(FlakySource::new(demo_rules()));
    let engine = AuthorizationEngine::new(
        Arc::clone(&source) as Arc<dyn RuleSource>,
        demo_hierarchy(),
        EngineConfig::default(),
    )
    .await
    .unwrap();

    source.set_failing(true);
    let err = engine.reload().await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(engine.snapshot().generation(), 1);
    assert!(!engine.check(Identity::anonymous, &RequestContext::get("/admin/x")).allowed);

    source.set_failing(false);
    assert_eq!(engine.reload().await.unwrap().generation(), 2);
    assert_eq!(source.fetches.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_stalled_fetch_times_out() {
    let config = EngineConfig::default()
        .with_fetch_timeout(Duration::from_millis(50))
        .with_empty_table_on_startup_failure(true);
    let engine = AuthorizationEngine::new(Arc::new(StalledSource), RoleHierarchy::new(), config)
        .await
        .unwrap();

    let err = engine.reload().await.unwrap_err();
    assert!(err.is_retryable());
    assert!(err.to_string().contains("timed out"));
    assert_eq!(engine.snapshot().generation(), 0);
}

#[tokio::test]
async fn test_snapshot_survives_reload() {
    let source = Arc::new(demo_rules());
    let engine = AuthorizationEngine::new(
        Arc::clone(&source) as Arc<dyn RuleSource>,
        demo_hierarchy(),
        EngineConfig::default(),
    )
    .await
    .unwrap();

    let before = engine.snapshot();
    source.replace(RawRules::new());
    engine.reload().await.unwrap();

    assert_eq!(before.len(), 2);
    assert!(engine.snapshot().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reloads_are_serialized() {
    let engine = Arc::new(demo_engine().await);

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.reload().await.unwrap().generation() })
        })
        .collect();

    let mut generations = Vec::new();
    for handle in handles {
        generations.push(handle.await.unwrap());
    }
    generations.sort_unstable();

    assert_eq!(generations, (2..=11).collect::<Vec<u64>>());
    assert_eq!(engine.snapshot().generation(), 11);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_checks_never_observe_partial_table() {
    let source = Arc::new(demo_rules());
    let engine = Arc::new(
        AuthorizationEngine::new(
            Arc::clone(&source) as Arc<dyn RuleSource>,
            demo_hierarchy(),
            EngineConfig::default(),
        )
        .await
        .unwrap(),
    );

    let checkers: Vec<_> = (0..4)
        .map(|_| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move {
                for _ in 0..500 {
                    let decision =
                        engine.check(Identity::anonymous, &RequestContext::get("/admin/settings"));
                    assert!(!decision.allowed, "admin route must never fall through");
                    tokio::task::yield_now().await;
                }
            })
        })
        .collect();

    for round in 0..50 {
        let mut rules = RawRules::new();
        rules.insert("1".to_string(), RawRule::new("/admin/**", "ROLE_ADMIN"));
        for extra in 0..round {
            rules.insert(
                format!("2-{extra:03}"),
                RawRule::new(format!("/extra/{extra}"), "permitAll"),
            );
        }
        source.replace(rules);
        engine.reload().await.unwrap();
    }

    for checker in checkers {
        checker.await.unwrap();
    }
    assert_eq!(engine.snapshot().generation(), 51);
}

// ─── File source ────────────────────────────────────────────────────────

#[tokio::test]
async fn test_file_source_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rules.toml");
    std::fs::write(
        &path,
        r#"
[[rules]]
order = 10
method = "GET"
pattern = "/admin/**"
requirement = "ROLE_ADMIN"
"#,
    )
    .unwrap();

    let engine = AuthorizationEngine::new(
        Arc::new(FileRuleSource::new(&path)),
        demo_hierarchy(),
        EngineConfig::default(),
    )
    .await
    .unwrap();
    assert!(!engine.check(Identity::anonymous, &RequestContext::get("/admin/x")).allowed);
    assert!(engine.check(Identity::anonymous, &RequestContext::get("/billing")).allowed);

    std::fs::write(
        &path,
        r#"
[[rules]]
order = 20
pattern = "/**"
requirement = "isAuthenticated()"

[[rules]]
order = 10
pattern = "/admin/**"
requirement = "ROLE_ADMIN"
"#,
    )
    .unwrap();
    engine.reload().await.unwrap();

    let table = engine.snapshot();
    assert_eq!(table.len(), 2);
    assert_eq!(table.iter().next().unwrap().pattern(), "/admin/**");
    assert!(!engine.check(Identity::anonymous, &RequestContext::get("/billing")).allowed);
    assert!(engine.check(verified_user, &RequestContext::get("/billing")).allowed);
    assert!(!engine.check(verified_user, &RequestContext::get("/admin/x")).allowed);
}

#[tokio::test]
async fn test_file_source_missing_file_keeps_table() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rules.json");
    std::fs::write(
        &path,
        r#"{"rules": [{"order": 1, "pattern": "/admin/**", "requirement": "ROLE_ADMIN"}]}"#,
    )
    .unwrap();

    let engine = AuthorizationEngine::new(
        Arc::new(FileRuleSource::new(&path)),
        RoleHierarchy::new(),
        EngineConfig::default(),
    )
    .await
    .unwrap();

    std::fs::remove_file(&path).unwrap();
    let err = engine.reload().await.unwrap_err();
    assert!(err.is_retryable());
    assert_eq!(engine.snapshot().len(), 1);
}
