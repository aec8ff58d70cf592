// src/watch/backend.rs

use std::cell::RefCell;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::warn;

use crate::engine::RuntimeEvent;
use crate::errors::Result;
use crate::watch::event::classify;

/// An open watch on one path.
pub trait WatchHandle {
    fn close(self: Box<Self>) -> Result<()>;
}

/// Opens per-file watches for the watch manager.
pub trait WatchBackend {
    fn watch(&mut self, path: &Path) -> Result<Box<dyn WatchHandle>>;
}

/// Production backend: one shared notify watcher, every dependency
/// registered non-recursively. Events are classified on notify's thread and
/// forwarded as [`RuntimeEvent::DependencyFs`].
pub struct NotifyWatchBackend {
    watcher: Rc<RefCell<RecommendedWatcher>>,
}

impl fmt::Debug for NotifyWatchBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotifyWatchBackend").finish()
    }
}

impl NotifyWatchBackend {
    pub fn new(runtime_tx: mpsc::UnboundedSender<RuntimeEvent>) -> Result<Self> {
        let watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    for fs_event in classify(&event, Path::exists) {
                        // Receiver gone means the runtime is shutting down.
                        let _ = runtime_tx.send(RuntimeEvent::DependencyFs(fs_event));
                    }
                }
                Err(err) => warn!(error = %err, "dependency watch error"),
            },
            Config::default(),
        )?;
        Ok(Self {
            watcher: Rc::new(RefCell::new(watcher)),
        })
    }
}

impl WatchBackend for NotifyWatchBackend {
    fn watch(&mut self, path: &Path) -> Result<Box<dyn WatchHandle>> {
        self.watcher
            .borrow_mut()
            .watch(path, RecursiveMode::NonRecursive)?;
        Ok(Box::new(NotifyWatchHandle {
            watcher: Rc::clone(&self.watcher),
            path: path.to_path_buf(),
        }))
    }
}

struct NotifyWatchHandle {
    watcher: Rc<RefCell<RecommendedWatcher>>,
    path: PathBuf,
}

impl WatchHandle for NotifyWatchHandle {
    fn close(self: Box<Self>) -> Result<()> {
        self.watcher.borrow_mut().unwatch(&self.path)?;
        Ok(())
    }
}
