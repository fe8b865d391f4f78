use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, warn};

use super::storage::{TOKEN_KEY, USER_KEY};

/// Runs a reload callback whenever the session files change on disk.
///
/// Usually driven through `Marketplace::watch_session`, which also resets
/// the domain stores when the account changes. Dropping the watcher stops it.
pub struct SessionWatcher {
    _watcher: RecommendedWatcher,
    root: PathBuf,
}

impl SessionWatcher {
    /// Watch `root` (the [`FileStore`](super::FileStore) directory), calling `reload` on changes.
    pub fn spawn<F>(root: impl AsRef<Path>, reload: F) -> Result<Self>
    where
        F: Fn() + Send + 'static,
    {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)
            .with_context(|| format!("failed to create {}", root.display()))?;

        let mut watcher = notify::recommended_watcher(move |result: notify::Result<Event>| {
            match result {
                Ok(event) if touches_session(&event) => {
                    debug!(kind = ?event.kind, "session files changed");
                    reload();
                }
                Ok(_) => {}
                Err(err) => warn!(?err, "session watcher error"),
            }
        })
        .context("failed to create session watcher")?;
        watcher
            .watch(&root, RecursiveMode::NonRecursive)
            .with_context(|| format!("failed to watch {}", root.display()))?;

        Ok(Self {
            _watcher: watcher,
            root,
        })
    }

    /// Directory being watched.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn touches_session(event: &Event) -> bool {
    if matches!(event.kind, EventKind::Access(_)) {
        return false;
    }
    event.paths.iter().any(|path| {
        path.file_name()
            .and_then(|name| name.to_str())
            .map(|name| name == USER_KEY || name == TOKEN_KEY)
            .unwrap_or(false)
    })
}
