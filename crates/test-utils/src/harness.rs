//! A fully wired [`Engine`] over fakes, plus helpers that feed it the
//! events the watchers would.

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::Arc;

use quickscope::engine::{CoreStep, Engine, EngineParts, RuntimeEvent, RuntimeOptions};
use quickscope::errors::Result;
use quickscope::exec::RunRequest;
use quickscope::fs::mock::MockFileSystem;
use quickscope::types::RunOutcome;
use quickscope::watch::{FsEvent, TargetMatcher};

use crate::fakes::{HubRecorder, RecordingRunner, RecordingWatchBackend, StaticResolver, WatchLog};

pub struct HarnessBuilder {
    root: PathBuf,
    files: Vec<String>,
    cmd: String,
    use_hash: bool,
    run_on_ready: bool,
    exit_when_idle: bool,
}

impl HarnessBuilder {
    pub fn new(root: &str) -> Self {
        Self {
            root: PathBuf::from(root),
            files: vec!["test/**/*-test.js".to_string()],
            cmd: "mocha".to_string(),
            use_hash: false,
            run_on_ready: false,
            exit_when_idle: false,
        }
    }

    pub fn files(mut self, pattern: &str) -> Self {
        self.files = vec![pattern.to_string()];
        self
    }

    pub fn cmd(mut self, cmd: &str) -> Self {
        self.cmd = cmd.to_string();
        self
    }

    pub fn use_hash(mut self, val: bool) -> Self {
        self.use_hash = val;
        self
    }

    pub fn run_on_ready(mut self, val: bool) -> Self {
        self.run_on_ready = val;
        self
    }

    pub fn exit_when_idle(mut self, val: bool) -> Self {
        self.exit_when_idle = val;
        self
    }

    pub fn build(self) -> Harness {
        let fs = MockFileSystem::new();
        let resolver = StaticResolver::new();
        let backend = RecordingWatchBackend::default();
        let runner = RecordingRunner::default();
        let watch_log = Rc::clone(&backend.log);
        let runs = Rc::clone(&runner.runs);

        let matcher = TargetMatcher::new(&self.root, &self.files, &["node_modules".to_string()])
            .expect("valid test globs");

        let engine = Engine::new(EngineParts {
            resolver: Box::new(resolver.clone()),
            watch_backend: Box::new(backend),
            runner: Box::new(runner),
            fs: Arc::new(fs.clone()),
            matcher,
            cmd: self.cmd,
            use_hash: self.use_hash,
            run_on_ready: self.run_on_ready,
            options: RuntimeOptions {
                exit_when_idle: self.exit_when_idle,
            },
        });
        let recorder = HubRecorder::attach(engine.hub());

        Harness {
            root: self.root,
            engine,
            fs,
            resolver,
            watch_log,
            runs,
            recorder,
        }
    }
}

pub struct Harness {
    pub root: PathBuf,
    pub engine: Engine,
    pub fs: MockFileSystem,
    pub resolver: StaticResolver,
    pub watch_log: Rc<RefCell<WatchLog>>,
    pub runs: Rc<RefCell<Vec<RunRequest>>>,
    pub recorder: HubRecorder,
}

impl Harness {
    /// Absolute path of `rel` under the root.
    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    /// Write a file into the mock filesystem and give it resolved
    /// dependencies (relative to the root).
    pub fn file(&self, rel: &str, deps: &[&str]) {
        let full = self.path(rel);
        self.fs.add_file(&full, format!("// {rel}"));
        let deps: Vec<String> = deps
            .iter()
            .map(|d| self.path(d).to_string_lossy().into_owned())
            .collect();
        let deps: Vec<&str> = deps.iter().map(String::as_str).collect();
        self.resolver.set(&full, &deps);
    }

    pub fn send(&mut self, event: RuntimeEvent) -> Result<CoreStep> {
        self.engine.handle(event)
    }

    /// The target watcher (or initial scan) reports `rel`.
    pub fn target_created(&mut self, rel: &str) -> Result<CoreStep> {
        let path = self.path(rel);
        self.send(RuntimeEvent::TargetFs(FsEvent::created(path)))
    }

    /// The target watcher reports a content change of `rel`.
    pub fn target_changed(&mut self, rel: &str) -> Result<CoreStep> {
        let path = self.path(rel);
        self.send(RuntimeEvent::TargetFs(FsEvent::changed(path)))
    }

    /// `rel` is deleted from disk and the target watcher reports it.
    pub fn target_deleted(&mut self, rel: &str) -> Result<CoreStep> {
        let path = self.path(rel);
        self.fs.remove_file(&path);
        self.send(RuntimeEvent::TargetFs(FsEvent::removed(path)))
    }

    pub fn ready(&mut self) -> Result<CoreStep> {
        self.send(RuntimeEvent::InitialScanComplete)
    }

    /// A watched file's content changed.
    pub fn modified(&mut self, rel: &str) -> Result<CoreStep> {
        let path = self.path(rel);
        self.send(RuntimeEvent::DependencyFs(FsEvent::changed(path)))
    }

    /// A watched file is deleted from disk and its watch reports it.
    pub fn deleted(&mut self, rel: &str) -> Result<CoreStep> {
        let path = self.path(rel);
        self.fs.remove_file(&path);
        self.resolver.forget(&path);
        self.send(RuntimeEvent::DependencyFs(FsEvent::removed(path)))
    }

    pub fn complete(&mut self, run_id: u64, outcome: RunOutcome) -> Result<CoreStep> {
        self.send(RuntimeEvent::RunCompleted { run_id, outcome })
    }

    /// Targets of every recorded run, relative to the root.
    pub fn run_targets(&self) -> Vec<Vec<PathBuf>> {
        self.runs
            .borrow()
            .iter()
            .map(|r| r.targets.iter().map(|t| self.relative(t)).collect())
            .collect()
    }

    /// Currently watched dependency paths, relative to the root, sorted.
    pub fn watched(&self) -> Vec<PathBuf> {
        self.engine
            .watches()
            .watched_paths()
            .map(|p| self.relative(p))
            .collect()
    }

    /// Targets of the dependency node at `rel`, relative to the root.
    pub fn targets_of(&self, rel: &str) -> Option<Vec<PathBuf>> {
        let store = self.engine.store();
        let node = store.dependency(&self.path(rel))?;
        Some(node.targets().iter().map(|t| self.relative(t)).collect())
    }

    fn relative(&self, path: &Path) -> PathBuf {
        path.strip_prefix(&self.root).unwrap_or(path).to_path_buf()
    }
}
