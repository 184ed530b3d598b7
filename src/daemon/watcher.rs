//! Recursive directory watch for arriving email files.

use anyhow::Result;
use notify::event::{CreateKind, ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::Duration;

use crate::mail::is_email_path;

pub struct EmailWatcher {
    // Dropping the watcher stops event delivery.
    _watcher: RecommendedWatcher,
    rx: mpsc::Receiver<notify::Result<Event>>,
}

impl EmailWatcher {
    pub fn new(root: &Path) -> Result<Self> {
        let (tx, rx) = mpsc::channel();
        let mut watcher = notify::recommended_watcher(tx)?;
        watcher.watch(root, RecursiveMode::Recursive)?;
        Ok(Self {
            _watcher: watcher,
            rx,
        })
    }

    /// Waits up to `timeout` for the next raw event and returns the email
    /// paths it announces. Empty on timeout or for uninteresting events.
    pub fn next_paths(&self, timeout: Duration) -> Result<Vec<PathBuf>> {
        match self.rx.recv_timeout(timeout) {
            Ok(Ok(event)) => Ok(arrived_email_paths(&event)),
            Ok(Err(e)) => {
                log::warn!("Watch error: {e}");
                Ok(Vec::new())
            }
            Err(mpsc::RecvTimeoutError::Timeout) => Ok(Vec::new()),
            Err(mpsc::RecvTimeoutError::Disconnected) => {
                Err(anyhow::anyhow!("watch channel closed"))
            }
        }
    }
}

/// Paths of email files that were created in, or moved into, the tree.
pub fn arrived_email_paths(event: &Event) -> Vec<PathBuf> {
    let candidates: Vec<&PathBuf> = match event.kind {
        EventKind::Create(CreateKind::Folder) => Vec::new(),
        EventKind::Create(_) => event.paths.iter().collect(),
        // Both: paths are [from, to].
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => {
            event.paths.get(1).into_iter().collect()
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => event.paths.iter().collect(),
        // Unpaired renames (macOS FSEvents) only say that a name changed.
        EventKind::Modify(ModifyKind::Name(RenameMode::Any)) => {
            event.paths.iter().filter(|p| p.is_file()).collect()
        }
        _ => Vec::new(),
    };

    candidates
        .into_iter()
        .filter(|p| is_email_path(p))
        .cloned()
        .collect()
}
