//! Fake collaborators for driving the engine without a filesystem watcher,
//! a real import parser or child processes.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use tokio::sync::mpsc;

use quickscope::engine::RuntimeEvent;
use quickscope::errors::{QuickscopeError, Result};
use quickscope::exec::{CommandRunner, RunRequest};
use quickscope::hub::{Hub, HubEvent, Topic};
use quickscope::resolve::DependencyResolver;
use quickscope::types::RunOutcome;
use quickscope::watch::{WatchBackend, WatchHandle};

/// Resolver backed by a shared map of file -> direct and transitive
/// dependencies. Files never `set` fail with `ParseFailure`.
#[derive(Clone, Default)]
pub struct StaticResolver {
    lists: Rc<RefCell<HashMap<PathBuf, Vec<PathBuf>>>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// `file` resolves to `deps` followed by `file` itself.
    pub fn set(&self, file: impl AsRef<Path>, deps: &[&str]) {
        let file = file.as_ref().to_path_buf();
        let mut list: Vec<PathBuf> = deps.iter().map(PathBuf::from).collect();
        list.push(file.clone());
        self.lists.borrow_mut().insert(file, list);
    }

    /// Make `file` unparseable.
    pub fn forget(&self, file: impl AsRef<Path>) {
        self.lists.borrow_mut().remove(file.as_ref());
    }
}

impl DependencyResolver for StaticResolver {
    fn resolve(&self, _root: &Path, file: &Path) -> Result<Vec<PathBuf>> {
        self.lists
            .borrow()
            .get(file)
            .cloned()
            .ok_or_else(|| QuickscopeError::parse_failure(file, anyhow::anyhow!("no such file")))
    }
}

/// Open/close history of a [`RecordingWatchBackend`].
#[derive(Debug, Default)]
pub struct WatchLog {
    pub opened: Vec<PathBuf>,
    pub closed: Vec<PathBuf>,
}

impl WatchLog {
    /// Paths opened and not closed since, sorted.
    pub fn open_now(&self) -> Vec<PathBuf> {
        let mut open = self.opened.clone();
        for closed in &self.closed {
            if let Some(pos) = open.iter().position(|p| p == closed) {
                open.remove(pos);
            }
        }
        open.sort();
        open
    }
}

#[derive(Clone, Default)]
pub struct RecordingWatchBackend {
    pub log: Rc<RefCell<WatchLog>>,
}

struct RecordingHandle {
    log: Rc<RefCell<WatchLog>>,
    path: PathBuf,
}

impl WatchHandle for RecordingHandle {
    fn close(self: Box<Self>) -> Result<()> {
        self.log.borrow_mut().closed.push(self.path.clone());
        Ok(())
    }
}

impl WatchBackend for RecordingWatchBackend {
    fn watch(&mut self, path: &Path) -> Result<Box<dyn WatchHandle>> {
        self.log.borrow_mut().opened.push(path.to_path_buf());
        Ok(Box::new(RecordingHandle {
            log: Rc::clone(&self.log),
            path: path.to_path_buf(),
        }))
    }
}

/// Runner that only records requests; completions are fed back by hand.
#[derive(Clone, Default)]
pub struct RecordingRunner {
    pub runs: Rc<RefCell<Vec<RunRequest>>>,
}

impl CommandRunner for RecordingRunner {
    fn run(&mut self, request: RunRequest) -> Result<()> {
        self.runs.borrow_mut().push(request);
        Ok(())
    }
}

/// Runner that records each request and immediately reports the configured
/// outcome on the runtime channel.
pub struct CompletingRunner {
    runtime_tx: mpsc::UnboundedSender<RuntimeEvent>,
    outcome: RunOutcome,
    pub runs: Rc<RefCell<Vec<RunRequest>>>,
}

impl CompletingRunner {
    pub fn new(runtime_tx: mpsc::UnboundedSender<RuntimeEvent>, outcome: RunOutcome) -> Self {
        Self {
            runtime_tx,
            outcome,
            runs: Rc::default(),
        }
    }
}

impl CommandRunner for CompletingRunner {
    fn run(&mut self, request: RunRequest) -> Result<()> {
        let run_id = request.run_id;
        self.runs.borrow_mut().push(request);
        self.runtime_tx
            .send(RuntimeEvent::RunCompleted {
                run_id,
                outcome: self.outcome,
            })
            .map_err(anyhow::Error::from)?;
        Ok(())
    }
}

/// Records every event published on a hub, in delivery order.
#[derive(Clone, Default)]
pub struct HubRecorder {
    events: Rc<RefCell<Vec<HubEvent>>>,
}

impl HubRecorder {
    /// Subscribe to every topic of `hub`.
    ///
    /// Subscribers run in subscription order, so a recorder attached after
    /// the components sees each event after they have handled it.
    pub fn attach(hub: &Hub) -> Self {
        let recorder = Self::default();
        for topic in Topic::ALL {
            let events = Rc::clone(&recorder.events);
            hub.subscribe(topic, move |event| {
                events.borrow_mut().push(event.clone());
                Ok(())
            });
        }
        recorder
    }

    pub fn events(&self) -> Vec<HubEvent> {
        self.events.borrow().clone()
    }

    pub fn topics(&self) -> Vec<Topic> {
        self.events.borrow().iter().map(HubEvent::topic).collect()
    }

    /// Drain what was recorded so far.
    pub fn take(&self) -> Vec<HubEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    pub fn clear(&self) {
        self.events.borrow_mut().clear();
    }
}
