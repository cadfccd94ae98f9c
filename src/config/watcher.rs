//! Configuration file watcher for hot reload.
//!
//! The watch is placed on the directory holding the config file, not on the
//! file itself: editors and deploy tools commonly save by writing a temp file
//! and renaming it over the original, which replaces the inode a file-level
//! watch is attached to. Directory events are filtered down to the config
//! file's name.

use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::RelayConfig;

/// Reloads the relay configuration whenever its file changes.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<RelayConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and a receiver for validated configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<RelayConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let watcher = Self {
            path: path.to_path_buf(),
            update_tx,
        };
        (watcher, update_rx)
    }

    /// Directory containing the config file; `.` for a bare file name.
    fn directory(&self) -> &Path {
        match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        }
    }

    /// Start watching on notify's background thread.
    ///
    /// The returned handle must be kept alive for as long as updates are wanted.
    /// Fails if the containing directory cannot be watched.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let directory = self.directory().to_path_buf();
        let file_name = self.path.file_name().map(OsString::from);
        let path = self.path;
        let tx = self.update_tx;

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if touches(&event, file_name.as_deref()) => reload(&path, &tx),
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&directory, RecursiveMode::NonRecursive)?;

        tracing::info!(directory = ?directory, "Config watcher started");
        Ok(watcher)
    }
}

/// Whether `event` wrote, created or renamed a file called `file_name`.
fn touches(event: &Event, file_name: Option<&OsStr>) -> bool {
    let Some(file_name) = file_name else {
        return false;
    };
    (event.kind.is_modify() || event.kind.is_create())
        && event.paths.iter().any(|p| p.file_name() == Some(file_name))
}

fn reload(path: &Path, tx: &mpsc::UnboundedSender<RelayConfig>) {
    match load_config(path) {
        Ok(config) => {
            tracing::info!(path = ?path, endpoints = config.endpoints.len(), "Config reloaded");
            let _ = tx.send(config);
        }
        // a half-written file fails here and the next event retries
        Err(e) => tracing::warn!(path = ?path, error = %e, "Config reload rejected, keeping current"),
    }
}
