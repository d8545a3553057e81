//! File watching for rule hot-reload.
//!
//! The [`FileWatcher`] wraps `notify` and turns raw file-system events
//! into debounced [`FileChangeEvent`]s. A burst of writes (editors often
//! truncate, write, then rename) produces one event once the file has been
//! quiet for the debounce period.
//!
//! Watching a single file watches its parent directory and filters by
//! file name, so the watch survives the file being replaced by rename.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use warden_config::FileWatcher;
//!
//! # async fn example() -> Result<(), warden_config::ConfigError> {
//! let mut watcher = FileWatcher::builder()
//!     .with_debounce(Duration::from_millis(250))
//!     .watch_file("rules.toml")?
//!     .build()?;
//!
//! while let Some(event) = watcher.next().await {
//!     println!("{} changed ({:?})", event.path.display(), event.kind);
//! }
//! # Ok(())
//! # }
//! ```

use std::collections::HashSet;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::ConfigError;

/// A debounced change to a watched file.
#[derive(Debug, Clone)]
pub struct FileChangeEvent {
    /// Path to the changed file.
    pub path: PathBuf,
    /// Kind of the last change in the burst.
    pub kind: FileChangeKind,
    /// When the last change in the burst was seen.
    pub timestamp: Instant,
}

/// Kind of file change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileChangeKind {
    /// File was created (including renamed into place).
    Created,
    /// File was modified.
    Modified,
    /// File was deleted.
    Deleted,
}

impl FileChangeKind {
    fn from_event_kind(kind: &EventKind) -> Option<Self> {
        match kind {
            EventKind::Create(_) => Some(Self::Created),
            EventKind::Modify(_) => Some(Self::Modified),
            EventKind::Remove(_) => Some(Self::Deleted),
            EventKind::Access(_) | EventKind::Other | EventKind::Any => None,
        }
    }
}

/// Configuration for the file watcher.
#[derive(Debug, Clone)]
pub struct FileWatcherConfig {
    /// Paths handed to `notify` (files or directories).
    pub paths: Vec<PathBuf>,
    /// Quiet period that ends a burst of changes.
    pub debounce: Duration,
    /// Whether directories are watched recursively.
    pub recursive: bool,
    /// Only report files with these names (empty = any name).
    pub file_names: HashSet<OsString>,
    /// Only report files with these extensions (empty = any extension).
    pub extensions: HashSet<String>,
}

impl Default for FileWatcherConfig {
    fn default() -> Self {
        Self {
            paths: Vec::new(),
            debounce: Duration::from_millis(500),
            recursive: false,
            file_names: HashSet::new(),
            extensions: HashSet::new(),
        }
    }
}

impl FileWatcherConfig {
    fn accepts(&self, path: &Path) -> bool {
        if !self.file_names.is_empty()
            && !path
                .file_name()
                .is_some_and(|name| self.file_names.contains(name))
        {
            return false;
        }
        if !self.extensions.is_empty()
            && !path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|ext| self.extensions.contains(ext))
        {
            return false;
        }
        true
    }
}

type ChangeCallback = Arc<dyn Fn(FileChangeEvent) + Send + Sync>;

/// Builder for a [`FileWatcher`].
pub struct FileWatcherBuilder {
    config: FileWatcherConfig,
    callback: Option<ChangeCallback>,
}

impl std::fmt::Debug for FileWatcherBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatcherBuilder")
            .field("config", &self.config)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

impl Default for FileWatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl FileWatcherBuilder {
    /// Create a new file watcher builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: FileWatcherConfig::default(),
            callback: None,
        }
    }

    /// Set the debounce period. Default is 500ms.
    #[must_use]
    pub fn with_debounce(mut self, duration: Duration) -> Self {
        self.config.debounce = duration;
        self
    }

    /// Watch a path (file or directory) as-is.
    ///
    /// # Errors
    ///
    /// Returns an error if the path does not exist.
    pub fn watch_path<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("path does not exist: {}", path.display()),
            )));
        }
        self.config.paths.push(path.to_path_buf());
        Ok(self)
    }

    /// Watch a single file through its parent directory.
    ///
    /// The file itself need not exist yet, but its directory must.
    ///
    /// # Errors
    ///
    /// Returns an error if the path has no file name or its directory does
    /// not exist.
    pub fn watch_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .ok_or_else(|| ConfigError::watcher(format!("not a file path: {}", path.display())))?;
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        self.config.file_names.insert(name.to_os_string());
        self.watch_path(dir)
    }

    /// Set whether directories are watched recursively. Default is false.
    #[must_use]
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.config.recursive = recursive;
        self
    }

    /// Only report files with these extensions.
    #[must_use]
    pub fn watch_extensions(mut self, extensions: &[&str]) -> Self {
        self.config.extensions = extensions.iter().map(|s| (*s).to_string()).collect();
        self
    }

    /// Set a callback invoked by [`FileWatcher::run`] for each event.
    ///
    /// It runs on the watcher's task and should not block.
    #[must_use]
    pub fn on_change<F>(mut self, callback: F) -> Self
    where
        F: Fn(FileChangeEvent) + Send + Sync + 'static,
    {
        self.callback = Some(Arc::new(callback));
        self
    }

    /// Start watching.
    ///
    /// # Errors
    ///
    /// Returns an error if no paths are configured or `notify` cannot
    /// register a watch.
    pub fn build(self) -> Result<FileWatcher, ConfigError> {
        if self.config.paths.is_empty() {
            return Err(ConfigError::watcher("no paths configured"));
        }

        let (tx, rx) = mpsc::channel(100);

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            match res {
                // Receiver dropped means the FileWatcher is gone.
                Ok(event) => {
                    let _ = tx.blocking_send(event);
                }
                Err(e) => warn!(error = %e, "file watch error"),
            }
        })
        .map_err(|e| ConfigError::watcher(format!("failed to create watcher: {e}")))?;

        let mode = if self.config.recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };

        for path in &self.config.paths {
            watcher.watch(path, mode).map_err(|e| {
                ConfigError::watcher(format!("failed to watch {}: {e}", path.display()))
            })?;
            debug!(path = %path.display(), "watching");
        }

        Ok(FileWatcher {
            _watcher: watcher,
            rx,
            config: self.config,
            callback: self.callback,
        })
    }
}

/// Debounced file watcher.
///
/// Stops producing events when dropped.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<Event>,
    config: FileWatcherConfig,
    callback: Option<ChangeCallback>,
}

impl std::fmt::Debug for FileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatcher")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl FileWatcher {
    /// Create a new file watcher builder.
    #[must_use]
    pub fn builder() -> FileWatcherBuilder {
        FileWatcherBuilder::new()
    }

    /// The active configuration.
    #[must_use]
    pub const fn config(&self) -> &FileWatcherConfig {
        &self.config
    }

    /// Wait for the next debounced change.
    ///
    /// Returns `None` once the underlying watcher has shut down.
    pub async fn next(&mut self) -> Option<FileChangeEvent> {
        let mut pending = loop {
            let event = self.rx.recv().await?;
            if let Some(change) = self.accept(&event) {
                break change;
            }
        };

        // Extend the burst until the file has been quiet for `debounce`.
        loop {
            match tokio::time::timeout(self.config.debounce, self.rx.recv()).await {
                Ok(Some(event)) => {
                    if let Some(change) = self.accept(&event) {
                        pending = change;
                    }
                }
                Ok(None) | Err(_) => return Some(pending),
            }
        }
    }

    /// Deliver every change to the `on_change` callback until the watcher
    /// shuts down.
    pub async fn run(&mut self) {
        while let Some(event) = self.next().await {
            if let Some(callback) = &self.callback {
                callback(event);
            }
        }
    }

    fn accept(&self, event: &Event) -> Option<FileChangeEvent> {
        let kind = FileChangeKind::from_event_kind(&event.kind)?;
        let path = event.paths.iter().find(|p| self.config.accepts(p))?;

        Some(FileChangeEvent {
            path: path.clone(),
            kind,
            timestamp: Instant::now(),
        })
    }
}
