//! End-to-end tests: configuration in, decisions out.

use std::path::Path;
use std::time::Duration;

use tempfile::TempDir;
use warden::config::{ConfigLoader, SourceKind, SourceSection, WardenConfig};
use warden::{Identity, RequestContext, Warden, WardenError};

const RULES_V1: &str = r#"
[[rules]]
order = 10
method = "GET"
pattern = "/admin/**"
requirement = "ROLE_ADMIN"

[[rules]]
order = 20
method = "GET"
pattern = "/user/{id}"
requirement = "hasRole('USER') and hasAuthority('VERIFIED')"
"#;

const RULES_V2: &str = r#"
[[rules]]
order = 10
pattern = "/**"
requirement = "denyAll"
"#;

fn file_config(path: &Path, watch: bool) -> WardenConfig {
    let toml = format!(
        r#"
[engine]
role_hierarchy = "ROLE_ADMIN > ROLE_USER"

[source]
kind = "file"
path = "{}"

[reload]
watch = {watch}
debounce_ms = 50
"#,
        path.display()
    );

    ConfigLoader::new()
        .with_string(&toml, "toml")
        .unwrap()
        .load()
        .unwrap()
}

fn admin() -> Identity {
    Identity::authenticated("root").with_authority("ROLE_ADMIN")
}

fn verified_user() -> Identity {
    Identity::authenticated("alice").with_authorities(["ROLE_USER", "VERIFIED"])
}

#[tokio::test]
async fn test_file_backed_decisions() {
    let dir = TempDir::new().unwrap();
    let rules = dir.path().join("rules.toml");
    std::fs::write(&rules, RULES_V1).unwrap();

    let warden = Warden::from_config(file_config(&rules, false)).await.unwrap();
    assert!(!warden.is_watching());

    assert!(!warden.check(admin, &RequestContext::get("/user/42")).allowed);
    assert!(warden.check(verified_user, &RequestContext::get("/user/42")).allowed);
    assert!(warden.check(admin, &RequestContext::get("/admin/settings")).allowed);
    assert!(warden.check(Identity::anonymous, &RequestContext::get("/public/info")).allowed);

    let err = warden
        .verify(verified_user, &RequestContext::get("/admin/settings"))
        .unwrap_err();
    assert!(err.is_access_denied());
}

#[tokio::test]
async fn test_manual_reload_picks_up_edits() {
    let dir = TempDir::new().unwrap();
    let rules = dir.path().join("rules.toml");
    std::fs::write(&rules, RULES_V1).unwrap();

    let warden = Warden::from_config(file_config(&rules, false)).await.unwrap();
    std::fs::write(&rules, RULES_V2).unwrap();

    let table = warden.reload().await.unwrap();
    assert_eq!(table.generation(), 2);
    assert!(!warden.check(Identity::anonymous, &RequestContext::get("/public/info")).allowed);
}

#[tokio::test]
async fn test_missing_rule_file_at_startup() {
    let dir = TempDir::new().unwrap();
    let rules = dir.path().join("absent.toml");

    let err = Warden::from_config(file_config(&rules, false))
        .await
        .unwrap_err();
    assert!(err.is_retryable());

    let mut config = file_config(&rules, false);
    config.engine.empty_table_on_startup_failure = true;
    let warden = Warden::from_config(config).await.unwrap();
    assert!(warden.engine().snapshot().is_empty());
}

#[tokio::test]
async fn test_bad_hierarchy_is_rejected() {
    let mut config = WardenConfig::default();
    config.source = SourceSection {
        kind: SourceKind::Inline,
        ..Default::default()
    };
    config.engine.role_hierarchy = "ROLE_ADMIN >".to_string();

    let err = Warden::from_config(config).await.unwrap_err();
    assert!(matches!(err, WardenError::Authz(ref e) if e.is_configuration()));
}

#[tokio::test]
async fn test_invalid_config_is_rejected_before_fetch() {
    let config = WardenConfig::default();
    let err = Warden::from_config(config).await.unwrap_err();
    assert!(matches!(err, WardenError::Config(_)));
}

#[tokio::test]
async fn test_custom_key_separator_flows_to_file_source() {
    let dir = TempDir::new().unwrap();
    let rules = dir.path().join("rules.toml");
    std::fs::write(&rules, RULES_V1).unwrap();

    let mut config = file_config(&rules, false);
    config.engine.key_separator = "::".to_string();

    let warden = Warden::from_config(config).await.unwrap();
    let table = warden.engine().snapshot();
    let first = table.iter().next().unwrap();
    assert_eq!(first.discriminator(), Some("GET"));
    assert_eq!(first.pattern(), "/admin/**");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_watcher_reloads_on_change() {
    let dir = TempDir::new().unwrap();
    let rules = dir.path().join("rules.toml");
    std::fs::write(&rules, RULES_V1).unwrap();

    let warden = Warden::from_config(file_config(&rules, true)).await.unwrap();
    assert!(warden.is_watching());

    tokio::time::sleep(Duration::from_millis(100)).await;
    std::fs::write(&rules, RULES_V2).unwrap();

    // File system events can be unreliable in CI; only assert once a
    // reload has been observed.
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while tokio::time::Instant::now() < deadline {
        if warden.engine().snapshot().generation() > 1 {
            assert!(!warden
                .check(Identity::anonymous, &RequestContext::get("/public/info"))
                .allowed);
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}
