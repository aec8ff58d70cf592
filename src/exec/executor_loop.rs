// src/exec/executor_loop.rs

//! Background loop that owns the running command processes and applies the
//! [`RunPolicy`] to requests that arrive while a run is in flight.

use std::collections::{HashMap, VecDeque};

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::engine::RuntimeEvent;
use crate::exec::command::RunRequest;
use crate::exec::task_runner::run_command;
use crate::types::{RunOutcome, RunPolicy};

/// Internal handle for a currently-running command process.
///
/// Dropping `cancel` without sending also stops the process.
struct ActiveRun {
    cancel: Option<oneshot::Sender<()>>,
}

struct ExecutorState {
    policy: RunPolicy,
    queue_length: usize,
    active: HashMap<u64, ActiveRun>,
    pending: VecDeque<RunRequest>,
    runtime_tx: mpsc::UnboundedSender<RuntimeEvent>,
    done_tx: mpsc::UnboundedSender<u64>,
}

/// Spawn the background executor loop.
///
/// The returned sender is what [`crate::exec::ProcessRunner`] pushes
/// requests into. Every run ends with exactly one
/// [`RuntimeEvent::RunCompleted`], including runs that were cancelled or
/// dropped from the queue.
pub fn spawn_executor(
    policy: RunPolicy,
    queue_length: usize,
    runtime_tx: mpsc::UnboundedSender<RuntimeEvent>,
) -> mpsc::UnboundedSender<RunRequest> {
    let (tx, mut rx) = mpsc::unbounded_channel::<RunRequest>();
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<u64>();

    let mut state = ExecutorState {
        policy,
        queue_length: queue_length.max(1),
        active: HashMap::new(),
        pending: VecDeque::new(),
        runtime_tx,
        done_tx,
    };

    tokio::spawn(async move {
        info!(%policy, "executor loop started");
        loop {
            tokio::select! {
                request = rx.recv() => match request {
                    Some(request) => state.handle_request(request),
                    None => break,
                },
                Some(run_id) = done_rx.recv() => state.handle_done(run_id),
            }
        }
        info!("executor loop finished (channel closed)");
    });

    tx
}

impl ExecutorState {
    fn handle_request(&mut self, request: RunRequest) {
        if self.active.is_empty() {
            self.start(request);
            return;
        }

        match self.policy {
            RunPolicy::Concurrent => self.start(request),
            RunPolicy::Cancel => {
                for (run_id, run) in self.active.iter_mut() {
                    if let Some(cancel) = run.cancel.take() {
                        info!(run_id, replaced_by = request.run_id, "cancelling previous run");
                        if cancel.send(()).is_err() {
                            debug!(run_id, "previous run already finished while cancelling");
                        }
                    }
                }
                self.start(request);
            }
            RunPolicy::Queue => {
                debug!(run_id = request.run_id, "run in progress, queueing");
                self.pending.push_back(request);
                // The oldest pending run is skipped, its targets move into
                // the run queued after it.
                while self.pending.len() > self.queue_length {
                    let Some(dropped) = self.pending.pop_front() else {
                        break;
                    };
                    let run_id = dropped.run_id;
                    if let Some(next) = self.pending.front_mut() {
                        info!(run_id, merged_into = next.run_id, "queue full, merging oldest pending run");
                        next.absorb(dropped);
                    }
                    self.report(run_id, RunOutcome::Skipped);
                }
            }
        }
    }

    fn handle_done(&mut self, run_id: u64) {
        self.active.remove(&run_id);
        if self.policy == RunPolicy::Queue && self.active.is_empty() {
            if let Some(next) = self.pending.pop_front() {
                self.start(next);
            }
        }
    }

    fn start(&mut self, request: RunRequest) {
        let (cancel_tx, cancel_rx) = oneshot::channel::<()>();
        let runtime_tx = self.runtime_tx.clone();
        let done_tx = self.done_tx.clone();
        let run_id = request.run_id;

        tokio::spawn(async move {
            let outcome = run_command(&request, cancel_rx).await;
            let _ = runtime_tx.send(RuntimeEvent::RunCompleted { run_id, outcome });
            let _ = done_tx.send(run_id);
        });

        self.active.insert(
            run_id,
            ActiveRun {
                cancel: Some(cancel_tx),
            },
        );
    }

    fn report(&self, run_id: u64, outcome: RunOutcome) {
        let _ = self
            .runtime_tx
            .send(RuntimeEvent::RunCompleted { run_id, outcome });
    }
}
