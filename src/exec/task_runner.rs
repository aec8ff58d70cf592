// src/exec/task_runner.rs

//! Runs one command process.

use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::process::Command;
use tokio::sync::oneshot;
use tracing::{debug, error, info, warn};

use crate::exec::command::RunRequest;
use crate::types::RunOutcome;

/// Run `request` through the shell with inherited stdio.
///
/// If the cancel channel fires, the child process is killed and the run is
/// reported as [`RunOutcome::Cancelled`]. Spawn/wait errors are logged and
/// reported as `Failed(-1)`.
pub async fn run_command(request: &RunRequest, cancel_rx: oneshot::Receiver<()>) -> RunOutcome {
    match run_command_inner(request, cancel_rx).await {
        Ok(outcome) => outcome,
        Err(err) => {
            error!(run_id = request.run_id, error = %err, "command execution error");
            RunOutcome::Failed(-1)
        }
    }
}

async fn run_command_inner(
    request: &RunRequest,
    mut cancel_rx: oneshot::Receiver<()>,
) -> Result<RunOutcome> {
    info!(run_id = request.run_id, cmd = %request.cmd, "starting command");

    // Build a shell command appropriate for the platform.
    let mut cmd = if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(&request.cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(&request.cmd);
        c
    };

    cmd.current_dir(&request.cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .with_context(|| format!("spawning `{}`", request.cmd))?;

    // Either the process exits on its own (normal case), or a newer run
    // replaces it.
    tokio::select! {
        status_res = child.wait() => {
            let status = status_res
                .with_context(|| format!("waiting for `{}`", request.cmd))?;
            let code = status.code().unwrap_or(-1);
            info!(
                run_id = request.run_id,
                exit_code = code,
                success = status.success(),
                "command exited"
            );
            Ok(if status.success() {
                RunOutcome::Success
            } else {
                RunOutcome::Failed(code)
            })
        }

        cancel = &mut cancel_rx => {
            if let Err(e) = cancel {
                // Sender dropped without an explicit request; the child is
                // killed on drop either way.
                debug!(run_id = request.run_id, error = %e, "cancel channel closed");
            } else {
                info!(run_id = request.run_id, "cancelling running command");
            }
            if let Err(e) = child.kill().await {
                warn!(run_id = request.run_id, error = %e, "failed to kill command process");
            }
            Ok(RunOutcome::Cancelled)
        }
    }
}
