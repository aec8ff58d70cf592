// src/exec/mod.rs

//! Process execution layer.
//!
//! This module is responsible for actually running the configured command,
//! using `tokio::process::Command`, and reporting back to the runtime via
//! `RuntimeEvent::RunCompleted`.
//!
//! - [`command`] builds the command line and defines [`RunRequest`].
//! - [`executor_loop`] owns the running processes and applies the run
//!   policy.
//! - [`task_runner`] handles one process execution.
//! - [`backend`] provides the `CommandRunner` trait and the concrete
//!   `ProcessRunner` used in production, which tests replace with a fake.

pub mod backend;
pub mod command;
pub mod executor_loop;
pub mod task_runner;

pub use backend::{CommandRunner, ProcessRunner};
pub use command::{RunRequest, build_command};
pub use executor_loop::spawn_executor;
