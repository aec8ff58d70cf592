// src/watch/manager.rs

//! Watch lifecycle: exactly one open watch per dependency path the store
//! knows about.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::errors::Result;
use crate::fs::FileSystem;
use crate::graph::Dependency;
use crate::hub::{Hub, HubEvent, Topic};
use crate::watch::backend::{WatchBackend, WatchHandle};
use crate::watch::cache::ContentHashes;
use crate::watch::event::{FsEvent, FsEventKind};

struct WatchEntry {
    /// Snapshot taken when the watch was opened.
    dependency: Dependency,
    handle: Box<dyn WatchHandle>,
}

pub struct WatchManager {
    hub: Rc<Hub>,
    backend: Box<dyn WatchBackend>,
    fs: Arc<dyn FileSystem>,
    hashes: Option<ContentHashes>,
    watches: BTreeMap<PathBuf, WatchEntry>,
}

impl fmt::Debug for WatchManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchManager")
            .field("watches", &self.watches.keys().collect::<Vec<_>>())
            .field("use_hash", &self.hashes.is_some())
            .finish()
    }
}

impl WatchManager {
    pub fn new(
        hub: Rc<Hub>,
        backend: Box<dyn WatchBackend>,
        fs: Arc<dyn FileSystem>,
        use_hash: bool,
    ) -> Self {
        let hashes = use_hash.then(|| ContentHashes::new(Arc::clone(&fs)));
        Self {
            hub,
            backend,
            fs,
            hashes,
            watches: BTreeMap::new(),
        }
    }

    /// Subscribe `manager` to the topics that open and close watches.
    pub fn register(manager: &Rc<RefCell<Self>>) {
        let hub = Rc::clone(&manager.borrow().hub);

        hub.subscribe_with(Topic::MultipleDependencyAdded, manager, |m, event| {
            match event {
                HubEvent::MultipleDependencyAdded(deps) => m.add_multiple_if_needed(deps),
                _ => Ok(()),
            }
        });
        hub.subscribe_with(Topic::MultipleDependencyChanged, manager, |m, event| {
            match event {
                HubEvent::MultipleDependencyChanged(deps) => m.add_multiple_if_needed(deps),
                _ => Ok(()),
            }
        });
        hub.subscribe_with(Topic::DependencyUnwatch, manager, |m, event| match event {
            HubEvent::DependencyUnwatch(path) => m.unwatch(path),
            _ => Ok(()),
        });
        hub.subscribe_with(Topic::MultipleDependencyUnwatch, manager, |m, event| {
            match event {
                HubEvent::MultipleDependencyUnwatch(paths) => m.multiple_unwatch(paths),
                _ => Ok(()),
            }
        });
    }

    /// Open a watch for every dependency not watched yet.
    pub fn add_multiple_if_needed(&mut self, dependencies: &[Dependency]) -> Result<()> {
        for dependency in dependencies {
            if self.watches.contains_key(dependency.path()) {
                continue;
            }
            match self.backend.watch(dependency.path()) {
                Ok(handle) => {
                    trace!(dependency = ?dependency.path(), "watch opened");
                    if let Some(hashes) = self.hashes.as_mut() {
                        hashes.record(dependency.path());
                    }
                    self.watches.insert(
                        dependency.path().to_path_buf(),
                        WatchEntry {
                            dependency: dependency.clone(),
                            handle,
                        },
                    );
                }
                Err(e) => {
                    warn!(dependency = ?dependency.path(), error = %e, "could not watch dependency");
                }
            }
        }
        Ok(())
    }

    /// Close and forget the watch on `path`. Unknown paths are ignored.
    pub fn unwatch(&mut self, path: &Path) -> Result<()> {
        if let Some(entry) = self.watches.remove(path) {
            close(path, entry.handle);
            if let Some(hashes) = self.hashes.as_mut() {
                hashes.forget(path);
            }
            trace!(dependency = ?path, "watch closed");
        }
        Ok(())
    }

    pub fn multiple_unwatch(&mut self, paths: &[PathBuf]) -> Result<()> {
        for path in paths {
            self.unwatch(path)?;
        }
        debug!(count = paths.len(), remaining = self.watches.len(), "dependencies unwatched");
        Ok(())
    }

    /// Translate a filesystem notification into the event the store should
    /// see, if any.
    ///
    /// The caller publishes the result once it no longer holds the manager.
    pub fn on_fs_event(&mut self, event: &FsEvent) -> Option<HubEvent> {
        let path = event.path.as_path();
        let Some(entry) = self.watches.get(path) else {
            trace!(file = ?path, "event for untracked path");
            return None;
        };
        let snapshot = entry.dependency.clone();

        match event.kind {
            FsEventKind::Changed => self.content_changed(snapshot),
            FsEventKind::Removed | FsEventKind::Created if self.fs.exists(path) => {
                // Replaced in place (atomic save): the old watch is gone
                // with the old inode.
                self.rearm(path);
                self.content_changed(snapshot)
            }
            FsEventKind::Removed => {
                debug!(dependency = ?path, "dependency file removed");
                self.unwatch(path).ok()?;
                Some(HubEvent::DependencyFileUnlink(snapshot))
            }
            FsEventKind::Created => None,
        }
    }

    fn content_changed(&mut self, snapshot: Dependency) -> Option<HubEvent> {
        if let Some(hashes) = self.hashes.as_mut() {
            if !hashes.changed(snapshot.path()) {
                debug!(dependency = ?snapshot.path(), "content unchanged, ignoring");
                return None;
            }
        }
        debug!(dependency = ?snapshot.path(), "dependency changed");
        Some(HubEvent::DependencyFileChanged(snapshot))
    }

    fn rearm(&mut self, path: &Path) {
        let Some(entry) = self.watches.remove(path) else {
            return;
        };
        close(path, entry.handle);
        match self.backend.watch(path) {
            Ok(handle) => {
                self.watches.insert(
                    path.to_path_buf(),
                    WatchEntry {
                        dependency: entry.dependency,
                        handle,
                    },
                );
            }
            Err(e) => warn!(dependency = ?path, error = %e, "could not re-watch replaced file"),
        }
    }

    pub fn watched_paths(&self) -> impl Iterator<Item = &Path> {
        self.watches.keys().map(PathBuf::as_path)
    }

    pub fn is_watching(&self, path: &Path) -> bool {
        self.watches.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.watches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.watches.is_empty()
    }
}

fn close(path: &Path, handle: Box<dyn WatchHandle>) {
    if let Err(e) = handle.close() {
        debug!(dependency = ?path, error = %e, "closing watch failed");
    }
}
