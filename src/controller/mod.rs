// src/controller/mod.rs

//! The controller owns the set of targets, feeds target additions and
//! removals into the graph, and asks the command runner to re-run targets
//! once their dependencies have settled.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::errors::{QuickscopeError, Result};
use crate::exec::{CommandRunner, RunRequest};
use crate::fs::FileSystem;
use crate::graph::{Dependency, Target};
use crate::hub::{Hub, HubEvent, Topic};
use crate::types::RunOutcome;
use crate::watch::{FsEvent, FsEventKind, TargetMatcher};

/// Lifecycle of the controller. `Ready` is entered once, when the initial
/// scan of the target glob has finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Initializing,
    Ready,
}

/// Static settings of a controller.
#[derive(Debug, Clone)]
pub struct ControllerSettings {
    /// Command template (`{targets}` placeholder optional).
    pub cmd: String,
    /// Run every target once when becoming ready.
    pub run_on_ready: bool,
    /// Report "can stop" once ready and no run is in flight (`--once`).
    pub exit_when_idle: bool,
}

pub struct Controller {
    hub: Rc<Hub>,
    matcher: TargetMatcher,
    fs: Arc<dyn FileSystem>,
    runner: Box<dyn CommandRunner>,
    settings: ControllerSettings,
    state: ControllerState,
    /// Known targets, relative to the root.
    targets: BTreeSet<PathBuf>,
    next_run_id: u64,
    in_flight: BTreeSet<u64>,
    last_failure: Option<i32>,
}

impl fmt::Debug for Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("state", &self.state)
            .field("targets", &self.targets)
            .field("in_flight", &self.in_flight)
            .finish_non_exhaustive()
    }
}

impl Controller {
    pub fn new(
        hub: Rc<Hub>,
        matcher: TargetMatcher,
        fs: Arc<dyn FileSystem>,
        runner: Box<dyn CommandRunner>,
        settings: ControllerSettings,
    ) -> Self {
        Self {
            hub,
            matcher,
            fs,
            runner,
            settings,
            state: ControllerState::Initializing,
            targets: BTreeSet::new(),
            next_run_id: 1,
            in_flight: BTreeSet::new(),
            last_failure: None,
        }
    }

    /// Subscribe `controller` to the topics that trigger runs.
    pub fn register(controller: &Rc<RefCell<Self>>) {
        let hub = Rc::clone(&controller.borrow().hub);

        hub.subscribe_with(Topic::MultipleDependencyDirty, controller, |c, event| {
            match event {
                HubEvent::MultipleDependencyDirty(deps) => c.on_dependencies_settled(deps),
                _ => Ok(()),
            }
        });
        hub.subscribe_with(Topic::MultipleDependencyChanged, controller, |c, event| {
            match event {
                HubEvent::MultipleDependencyChanged(deps) => c.on_dependencies_settled(deps),
                _ => Ok(()),
            }
        });
    }

    pub fn root(&self) -> &Path {
        self.matcher.root()
    }

    /// React to an event from the recursive target watcher.
    pub fn handle_target_event(&mut self, event: &FsEvent) -> Result<()> {
        let Some(rel) = self.matcher.matches(&event.path) else {
            return Ok(());
        };
        match event.kind {
            FsEventKind::Created => self.add_target(&rel),
            // Replaced in place: the dependency watcher reports the change.
            FsEventKind::Removed if self.fs.exists(&self.root().join(&rel)) => Ok(()),
            FsEventKind::Removed => self.unlink_target(&rel),
            // Known targets are re-parsed through their dependency watch. An
            // unknown one failed to register earlier; try again on save.
            FsEventKind::Changed if self.targets.contains(&rel) => Ok(()),
            FsEventKind::Changed => {
                debug!(target_file = ?rel, "retrying unregistered target");
                self.add_target(&rel)
            }
        }
    }

    /// Start tracking a target, given relative to the root.
    pub fn add_target(&mut self, path: &Path) -> Result<()> {
        if path.as_os_str().is_empty() {
            return Err(QuickscopeError::InvalidArgument(
                "no target given".to_string(),
            ));
        }
        if !self.targets.insert(path.to_path_buf()) {
            debug!(target_file = ?path, "target already known");
            return Ok(());
        }

        let target = Target::new(path, self.root());
        if let Err(e) = self.hub.publish(HubEvent::TargetAdded(target)) {
            self.targets.remove(path);
            return Err(e);
        }
        debug!(target_file = ?path, "target added");

        if self.state == ControllerState::Ready {
            let full = self.root().join(path);
            self.run(vec![full])?;
        }
        Ok(())
    }

    /// Stop tracking a target, given relative to the root.
    pub fn unlink_target(&mut self, path: &Path) -> Result<()> {
        if path.as_os_str().is_empty() {
            return Err(QuickscopeError::InvalidArgument(
                "no target given".to_string(),
            ));
        }
        if !self.targets.remove(path) {
            debug!(target_file = ?path, "unlink of unknown target ignored");
            return Ok(());
        }
        info!(target_file = ?path, "target removed");
        let full = self.root().join(path);
        self.hub.publish(HubEvent::TargetRemoved(full))
    }

    /// Leave `Initializing`. Only the first call has an effect.
    pub fn mark_ready(&mut self) -> Result<()> {
        if self.state == ControllerState::Ready {
            return Ok(());
        }
        self.state = ControllerState::Ready;
        info!(targets = self.targets.len(), "ready, watching targets");
        for target in &self.targets {
            debug!(target_file = ?target, "watching");
        }

        if self.settings.run_on_ready && !self.targets.is_empty() {
            let all = self.targets.iter().map(|t| self.root().join(t)).collect();
            self.run(all)?;
        } else if self.in_flight.is_empty() {
            info!("waiting for changes");
        }
        Ok(())
    }

    /// Run the command for every target referenced by `dependencies`.
    pub fn on_dependencies_settled(&mut self, dependencies: &[Dependency]) -> Result<()> {
        if self.state == ControllerState::Initializing {
            debug!(count = dependencies.len(), "still initializing, not running");
            return Ok(());
        }

        let mut seen = HashSet::new();
        let targets: Vec<PathBuf> = dependencies
            .iter()
            .flat_map(|dep| dep.targets().iter())
            .filter(|t| seen.insert(*t))
            .cloned()
            .collect();

        if targets.is_empty() {
            return Ok(());
        }
        self.run(targets)
    }

    /// Book-keeping for a finished run. Returns true when the controller is
    /// done and the engine may stop (`exit_when_idle`).
    pub fn run_completed(&mut self, run_id: u64, outcome: RunOutcome) -> bool {
        if !self.in_flight.remove(&run_id) {
            debug!(run_id, "completion for unknown run");
        }
        match outcome {
            RunOutcome::Success => info!(run_id, "run succeeded"),
            RunOutcome::Failed(code) => {
                warn!(run_id, exit_code = code, "run failed");
                self.last_failure = Some(code);
            }
            RunOutcome::Cancelled => info!(run_id, "run cancelled"),
            RunOutcome::Skipped => debug!(run_id, "run skipped"),
        }

        if !self.in_flight.is_empty() {
            return false;
        }
        info!("waiting for changes");
        self.is_done()
    }

    /// Ready, nothing in flight and asked to exit when idle.
    pub fn is_done(&self) -> bool {
        self.settings.exit_when_idle
            && self.state == ControllerState::Ready
            && self.in_flight.is_empty()
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    /// Known targets, relative to the root, sorted.
    pub fn targets(&self) -> impl Iterator<Item = &Path> {
        self.targets.iter().map(PathBuf::as_path)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Exit code of the most recent failed run, if any.
    pub fn last_failure(&self) -> Option<i32> {
        self.last_failure
    }

    fn run(&mut self, targets: Vec<PathBuf>) -> Result<()> {
        let run_id = self.next_run_id;
        self.next_run_id += 1;

        let request = RunRequest::new(run_id, &self.settings.cmd, self.root(), targets);
        info!(run_id, targets = request.targets.len(), cmd = %request.cmd, "running");

        self.runner.run(request)?;
        self.in_flight.insert(run_id);
        Ok(())
    }
}
