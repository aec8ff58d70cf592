// src/exec/backend.rs

//! Pluggable command runner abstraction.
//!
//! The controller talks to a `CommandRunner` instead of spawning processes
//! itself. This makes it easy to swap in a fake runner in tests while
//! keeping the production implementation in [`super::executor_loop`].
//!
//! - `ProcessRunner` is the default implementation used by `quickscope`. It
//!   wraps the executor loop and just forwards run requests over a channel.
//! - Tests can provide their own `CommandRunner` that, for example, records
//!   the requests and feeds `RunCompleted` events back by hand.

use tokio::sync::mpsc;

use crate::engine::RuntimeEvent;
use crate::errors::{QuickscopeError, Result};
use crate::exec::command::RunRequest;
use crate::types::RunPolicy;

use super::executor_loop::spawn_executor;

/// Trait abstracting how the command is run.
///
/// `run` must not block: completion is reported later as
/// [`RuntimeEvent::RunCompleted`] with the request's `run_id`.
pub trait CommandRunner {
    fn run(&mut self, request: RunRequest) -> Result<()>;
}

/// Real runner used in production.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    tx: mpsc::UnboundedSender<RunRequest>,
}

impl ProcessRunner {
    /// Create a runner wired to the given runtime event sender.
    ///
    /// This spawns the background executor loop immediately, so it must be
    /// called from within a Tokio runtime.
    pub fn new(
        policy: RunPolicy,
        queue_length: usize,
        runtime_tx: mpsc::UnboundedSender<RuntimeEvent>,
    ) -> Self {
        let tx = spawn_executor(policy, queue_length, runtime_tx);
        Self { tx }
    }
}

impl CommandRunner for ProcessRunner {
    fn run(&mut self, request: RunRequest) -> Result<()> {
        self.tx.send(request).map_err(|e| {
            QuickscopeError::Other(anyhow::anyhow!(
                "executor loop is gone, dropping run {}",
                e.0.run_id
            ))
        })
    }
}
