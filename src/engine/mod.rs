// src/engine/mod.rs

//! Orchestration engine for quickscope.
//!
//! This module ties together the hub, the dependency store, the watch
//! manager and the controller, and drives them from one stream of
//! [`RuntimeEvent`]s:
//!   - target file events (recursive watcher, initial scan)
//!   - dependency file events (per-file watches)
//!   - run completions
//!   - shutdown signals
//!
//! The synchronous core lives in [`core`]; the async/IO shell is implemented
//! in [`runtime`].

use crate::types::RunOutcome;
use crate::watch::FsEvent;

/// Runtime options used by both the core and the async shell.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuntimeOptions {
    /// If true, exit the runtime once the controller is ready and no run is
    /// in flight (used for `--once`).
    pub exit_when_idle: bool,
}

/// Events flowing into the runtime from watchers, the executor, etc.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeEvent {
    /// Something happened under the project root (target watcher or
    /// initial scan).
    TargetFs(FsEvent),
    /// The initial scan has reported every existing target.
    InitialScanComplete,
    /// Something happened to a watched dependency file.
    DependencyFs(FsEvent),
    /// A command run finished, was cancelled or was dropped from the queue.
    RunCompleted { run_id: u64, outcome: RunOutcome },
    /// Graceful shutdown requested (e.g. Ctrl-C).
    ShutdownRequested,
}

/// Result of handling one event in the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoreStep {
    pub keep_running: bool,
}

impl CoreStep {
    pub const CONTINUE: CoreStep = CoreStep { keep_running: true };
    pub const STOP: CoreStep = CoreStep { keep_running: false };
}

pub mod core;
pub mod runtime;

pub use core::{Engine, EngineParts};
pub use runtime::Runtime;
