//! Reload-on-change for file rule sources.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};
use warden_authz::AuthorizationEngine;
use warden_config::FileWatcher;

use crate::WardenResult;

/// Reloads `engine` whenever the file at `path` settles after a change.
///
/// The watch is registered before this returns; the returned task runs
/// until aborted. A failed reload keeps the current table and the task
/// keeps watching.
///
/// # Errors
///
/// Returns a configuration error if the file's directory cannot be
/// watched.
pub fn spawn_rule_watcher(
    engine: Arc<AuthorizationEngine>,
    path: &Path,
    debounce: Duration,
) -> WardenResult<JoinHandle<()>> {
    let mut watcher = FileWatcher::builder()
        .with_debounce(debounce)
        .watch_file(path)?
        .build()?;

    info!(
        path = %path.display(),
        debounce_ms = u64::try_from(debounce.as_millis()).unwrap_or(u64::MAX),
        "watching rule file for changes"
    );

    Ok(tokio::spawn(async move {
        while let Some(change) = watcher.next().await {
            debug!(path = %change.path.display(), kind = ?change.kind, "rule file changed");
            // Outcome is logged by the engine.
            let _ = engine.reload().await;
        }
        debug!("rule watcher stopped");
    }))
}
