// src/graph/store.rs

//! The bipartite graph between dependency files and the targets that reach
//! them.
//!
//! The store is the only writer of referencing sets. It reacts to target and
//! dependency-file events from the hub and publishes what the watch manager
//! and controller need to know: which paths to watch, which to stop
//! watching, and which targets must re-run.

use std::cell::RefCell;
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tracing::{debug, info};

use crate::errors::{QuickscopeError, Result};
use crate::graph::{Dependency, Target};
use crate::hub::{Hub, HubEvent, Topic};
use crate::resolve::DependencyResolver;

pub struct DependencyStore {
    hub: Rc<Hub>,
    resolver: Box<dyn DependencyResolver>,
    /// Dependency path -> node.
    dependencies: BTreeMap<PathBuf, Dependency>,
    /// Target full path -> last resolved list, without the target itself.
    cache: HashMap<PathBuf, Vec<PathBuf>>,
}

impl fmt::Debug for DependencyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyStore")
            .field("dependencies", &self.dependencies.len())
            .field("targets", &self.cache.len())
            .finish()
    }
}

impl DependencyStore {
    pub fn new(hub: Rc<Hub>, resolver: Box<dyn DependencyResolver>) -> Self {
        Self {
            hub,
            resolver,
            dependencies: BTreeMap::new(),
            cache: HashMap::new(),
        }
    }

    /// Subscribe `store` to the target and dependency-file topics.
    pub fn register(store: &Rc<RefCell<Self>>) {
        let hub = Rc::clone(&store.borrow().hub);

        hub.subscribe_with(Topic::TargetAdded, store, |store, event| match event {
            HubEvent::TargetAdded(target) => store.add_target(target),
            _ => Ok(()),
        });
        hub.subscribe_with(Topic::TargetRemoved, store, |store, event| match event {
            HubEvent::TargetRemoved(path) => store.remove_target(path),
            _ => Ok(()),
        });
        hub.subscribe_with(Topic::DependencyFileChanged, store, |store, event| {
            match event {
                HubEvent::DependencyFileChanged(dep) => store.change_dependency(dep),
                _ => Ok(()),
            }
        });
        hub.subscribe_with(Topic::DependencyFileUnlink, store, |store, event| {
            match event {
                HubEvent::DependencyFileUnlink(dep) => store.remove_dependency(dep),
                _ => Ok(()),
            }
        });
    }

    /// Register a target and everything it reaches.
    pub fn add_target(&mut self, target: &Target) -> Result<()> {
        target.validate()?;
        let full = target.full_path();

        let resolved = self.resolve(&target.cwd, &full)?;
        self.check_conflicts(&full, &resolved)?;

        let known = self.cache.contains_key(&full);
        let orphans = self.detach_dropped(&full, &resolved);
        self.evict(orphans)?;

        let added = self.link_target(&full, &target.cwd, &resolved)?;
        if known {
            debug!(target_file = ?full, dependencies = added.len(), "target re-added");
        } else {
            info!(target_file = ?target.path, dependencies = added.len(), "watching target");
        }
        self.hub.publish(HubEvent::MultipleDependencyAdded(added))
    }

    /// Drop a target's edges; nodes left without targets are deleted.
    pub fn remove_target(&mut self, path: &Path) -> Result<()> {
        if path.as_os_str().is_empty() {
            return Err(QuickscopeError::InvalidArgument(
                "target path must not be empty".to_string(),
            ));
        }

        let mut deleted = Vec::new();
        self.dependencies.retain(|dep_path, dep| {
            if dep.remove_target(path) && dep.targets().is_empty() {
                deleted.push(dep_path.clone());
                return false;
            }
            true
        });
        self.cache.remove(path);

        info!(target_file = ?path, deleted = deleted.len(), "target removed");
        for dep_path in deleted {
            self.hub.publish(HubEvent::DependencyUnwatch(dep_path))?;
        }
        Ok(())
    }

    /// Re-resolve after a dependency's contents changed.
    pub fn change_dependency(&mut self, dependency: &Dependency) -> Result<()> {
        let path = dependency.path();
        if path.as_os_str().is_empty() {
            return Err(QuickscopeError::InvalidArgument(
                "dependency path must not be empty".to_string(),
            ));
        }

        let live = self.dependencies.get(path).unwrap_or(dependency);
        let cwd = live.cwd().to_path_buf();
        let targets = live.targets().to_vec();

        // Parse everything up front, the changed file first as an early
        // parse check: a failure here leaves the graph as is.
        let own = self.resolve(&cwd, path)?;
        debug!(dependency = ?path, imports = own.len().saturating_sub(1), "dependency re-parsed");

        let mut fresh = Vec::with_capacity(targets.len());
        for target in targets {
            let list = self.resolve(&cwd, &target)?;
            fresh.push((target, list));
        }
        for (target, list) in &fresh {
            self.check_conflicts(target, list)?;
        }

        let mut orphans: Vec<PathBuf> = Vec::new();
        for (target, list) in &fresh {
            for orphan in self.detach_dropped(target, list) {
                if !orphans.contains(&orphan) {
                    orphans.push(orphan);
                }
            }
        }
        self.evict(orphans)?;

        // Snapshots only carry the edges rebuilt here, so a shared node does
        // not drag in targets that never reached `path`.
        let rebuilt: HashSet<&Path> = fresh.iter().map(|(t, _)| t.as_path()).collect();
        let mut changed: BTreeMap<PathBuf, Dependency> = BTreeMap::new();
        for (target, list) in &fresh {
            for mut dep in self.link_target(target, &cwd, list)? {
                dep.retain_targets(|t| rebuilt.contains(t));
                changed.insert(dep.path().to_path_buf(), dep);
            }
        }

        debug!(dependency = ?path, affected = changed.len(), "dependency changed");
        self.hub.publish(HubEvent::MultipleDependencyChanged(
            changed.into_values().collect(),
        ))
    }

    /// React to a dependency file being deleted: its targets must re-run.
    ///
    /// The graph is left as is; the next change of a referencing file will
    /// drop the edge through orphan detection.
    pub fn remove_dependency(&mut self, dependency: &Dependency) -> Result<()> {
        let path = dependency.path();
        if path.as_os_str().is_empty() {
            return Err(QuickscopeError::InvalidArgument(
                "dependency path must not be empty".to_string(),
            ));
        }

        let live = self.dependencies.get(path).unwrap_or(dependency);
        if live.is_target() {
            debug!(dependency = ?path, "target file unlinked, left to the target watcher");
            return Ok(());
        }

        let dirty: Vec<Dependency> = live
            .targets()
            .iter()
            .filter_map(|target| self.dependencies.get(target))
            .filter(|node| node.is_target())
            .cloned()
            .collect();

        if dirty.is_empty() {
            return Ok(());
        }
        info!(dependency = ?path, targets = dirty.len(), "dependency removed");
        self.hub.publish(HubEvent::MultipleDependencyDirty(dirty))
    }

    pub fn dependencies(&self) -> impl Iterator<Item = &Dependency> {
        self.dependencies.values()
    }

    pub fn dependency(&self, path: &Path) -> Option<&Dependency> {
        self.dependencies.get(path)
    }

    /// Last resolved dependency list of `target`, without the target itself.
    pub fn cached_dependencies(&self, target: &Path) -> Option<&[PathBuf]> {
        self.cache.get(target).map(Vec::as_slice)
    }

    /// Full paths of all registered targets, sorted.
    pub fn targets(&self) -> Vec<PathBuf> {
        let mut targets: Vec<PathBuf> = self.cache.keys().cloned().collect();
        targets.sort();
        targets
    }

    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    fn resolve(&self, cwd: &Path, file: &Path) -> Result<Vec<PathBuf>> {
        let list = self.resolver.resolve(cwd, file)?;
        let mut seen = HashSet::with_capacity(list.len());
        Ok(list.into_iter().filter(|p| seen.insert(p.clone())).collect())
    }

    fn check_conflicts(&self, target: &Path, list: &[PathBuf]) -> Result<()> {
        for path in list {
            if let Some(node) = self.dependencies.get(path) {
                node.can_add_target(target)?;
            }
        }
        Ok(())
    }

    /// Compare `target`'s cached list with `fresh`. Dropped paths lose their
    /// edge to `target`; those that had no other target are returned as
    /// orphans, still in the map.
    fn detach_dropped(&mut self, target: &Path, fresh: &[PathBuf]) -> Vec<PathBuf> {
        let Some(cached) = self.cache.get(target) else {
            return Vec::new();
        };
        let keep: HashSet<&PathBuf> = fresh.iter().collect();
        let dropped: Vec<PathBuf> = cached
            .iter()
            .filter(|p| !keep.contains(p))
            .cloned()
            .collect();

        let mut orphans = Vec::new();
        for path in dropped {
            let Some(node) = self.dependencies.get_mut(&path) else {
                continue;
            };
            if node.targets().len() == 1 && node.targets()[0].as_path() == target {
                orphans.push(path);
            } else {
                node.remove_target(target);
                debug!(dependency = ?path, target_file = ?target, "edge dropped, node kept");
            }
        }
        orphans
    }

    fn evict(&mut self, orphans: Vec<PathBuf>) -> Result<()> {
        if orphans.is_empty() {
            return Ok(());
        }
        for path in &orphans {
            self.dependencies.remove(path);
        }
        debug!(count = orphans.len(), "orphaned dependencies evicted");
        self.hub.publish(HubEvent::MultipleDependencyUnwatch(orphans))
    }

    /// Point every node of `list` at `target`, creating nodes as needed, and
    /// cache the list. Returns snapshots of the linked nodes.
    fn link_target(
        &mut self,
        target: &Path,
        cwd: &Path,
        list: &[PathBuf],
    ) -> Result<Vec<Dependency>> {
        self.cache.insert(
            target.to_path_buf(),
            list.iter().filter(|p| p.as_path() != target).cloned().collect(),
        );

        let mut linked = Vec::with_capacity(list.len());
        for path in list {
            let node = match self.dependencies.entry(path.clone()) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => entry.insert(Dependency::new(path.clone(), cwd)?),
            };
            node.add_target(target)?;
            linked.push(node.clone());
        }
        Ok(linked)
    }
}
