//! Filesystem watcher feeding the config listener.

use crate::listener::ConfigFileListener;
use misebridge_core::{Error, Result};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct ConfigWatcher {
    watcher: Mutex<RecommendedWatcher>,
    watched: Mutex<HashSet<PathBuf>>,
}

impl ConfigWatcher {
    /// Watch `base_dir` recursively, forwarding content changes to `listener`.
    pub fn start(base_dir: &Path, listener: Arc<ConfigFileListener>) -> Result<Self> {
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| match res {
            Ok(event) if is_content_change(&event.kind) => {
                for path in &event.paths {
                    listener.on_file_change(path);
                }
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "File watcher error"),
        })
        .map_err(|e| Error::watcher(format!("failed to create file watcher: {e}")))?;

        watcher
            .watch(base_dir, RecursiveMode::Recursive)
            .map_err(|e| Error::watcher(format!("failed to watch {}: {e}", base_dir.display())))?;
        info!(path = %base_dir.display(), "Watching project for mise config changes");

        Ok(Self {
            watcher: Mutex::new(watcher),
            watched: Mutex::new(HashSet::from([base_dir.to_path_buf()])),
        })
    }

    /// Also watch the directory holding `file`, once.
    pub fn watch_parent_of(&self, file: &Path) -> Result<()> {
        let Some(parent) = file.parent().filter(|dir| dir.is_dir()) else {
            return Ok(());
        };
        if self.watched.lock().iter().any(|dir| parent.starts_with(dir)) {
            return Ok(());
        }
        self.watcher
            .lock()
            .watch(parent, RecursiveMode::NonRecursive)
            .map_err(|e| Error::watcher(format!("failed to watch {}: {e}", parent.display())))?;
        debug!(path = %parent.display(), "Watching executable directory");
        self.watched.lock().insert(parent.to_path_buf());
        Ok(())
    }

    pub fn watched_count(&self) -> usize {
        self.watched.lock().len()
    }
}

fn is_content_change(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}
