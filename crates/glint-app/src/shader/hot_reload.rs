use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, Sender};
use notify::{RecursiveMode, Watcher};
use notify_debouncer_mini::{new_debouncer, DebouncedEventKind, Debouncer};

/// Watches a single shader file.
///
/// Editors often save by replacing the file, which drops a watch placed on
/// the file itself, so the parent directory is watched and events are
/// filtered by file name.
pub struct ShaderWatcher {
    debouncer: Debouncer<notify::RecommendedWatcher>,
    receiver: Receiver<PathBuf>,
    dir: PathBuf,
    paused: bool,
}

impl ShaderWatcher {
    pub fn new(path: &Path, debounce: Duration) -> Result<Self> {
        let (tx, rx): (Sender<PathBuf>, Receiver<PathBuf>) = crossbeam_channel::unbounded();

        let file_name = path
            .file_name()
            .map(OsString::from)
            .with_context(|| format!("{} does not name a file", path.display()))?;
        let dir = watch_dir(path);

        let mut debouncer = new_debouncer(
            debounce,
            move |res: Result<Vec<notify_debouncer_mini::DebouncedEvent>, notify::Error>| {
                match res {
                    Ok(events) => {
                        for event in events {
                            if event.kind == DebouncedEventKind::Any
                                && event.path.file_name() == Some(file_name.as_os_str())
                            {
                                let _ = tx.send(event.path);
                            }
                        }
                    }
                    Err(e) => log::warn!("File watch error: {e}"),
                }
            },
        )?;

        debouncer
            .watcher()
            .watch(&dir, RecursiveMode::NonRecursive)
            .with_context(|| format!("watching {}", dir.display()))?;
        log::info!("Watching {} for changes", path.display());

        Ok(Self {
            debouncer,
            receiver: rx,
            dir,
            paused: false,
        })
    }

    /// Drain pending change events. True if the file changed at least once.
    pub fn drain_changes(&self) -> bool {
        let mut changed = false;
        while self.receiver.try_recv().is_ok() {
            changed = true;
        }
        changed
    }

    /// Stop observing while the file is being read, so the read itself
    /// cannot queue another reload.
    pub fn pause(&mut self) {
        if self.paused {
            return;
        }
        if let Err(e) = self.debouncer.watcher().unwatch(&self.dir) {
            log::warn!("Failed to pause watch on {}: {e}", self.dir.display());
        }
        self.paused = true;
    }

    pub fn resume(&mut self) {
        if !self.paused {
            return;
        }
        if let Err(e) = self
            .debouncer
            .watcher()
            .watch(&self.dir, RecursiveMode::NonRecursive)
        {
            log::warn!("Failed to resume watch on {}: {e}", self.dir.display());
        }
        self.paused = false;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }
}

fn watch_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}
