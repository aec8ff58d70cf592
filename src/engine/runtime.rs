// src/engine/runtime.rs

use std::fmt;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::errors::{QuickscopeError, Result};

use super::core::Engine;
use super::{RuntimeEvent, RuntimeOptions};

/// Feeds `RuntimeEvent`s from the channel into the [`Engine`].
///
/// This is a pure IO shell: all semantics live in the engine. The runtime
/// is not `Send` (the engine uses `Rc`), so it runs on the task that awaits
/// it rather than being spawned.
pub struct Runtime {
    engine: Engine,
    event_rx: mpsc::UnboundedReceiver<RuntimeEvent>,
    options: RuntimeOptions,
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("engine", &self.engine)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Runtime {
    pub fn new(
        engine: Engine,
        event_rx: mpsc::UnboundedReceiver<RuntimeEvent>,
        options: RuntimeOptions,
    ) -> Self {
        Self {
            engine,
            event_rx,
            options,
        }
    }

    /// Main event loop.
    ///
    /// A failed event is logged and the loop moves on. With
    /// `exit_when_idle`, the loop ends once the engine reports it is done
    /// and a failed run turns into [`QuickscopeError::RunFailed`].
    pub async fn run(mut self) -> Result<()> {
        info!("quickscope runtime started");

        loop {
            let event = match self.event_rx.recv().await {
                Some(e) => e,
                None => {
                    info!("runtime event channel closed; exiting");
                    break;
                }
            };

            debug!(?event, "runtime received event");

            match self.engine.handle(event) {
                Ok(step) if !step.keep_running => {
                    info!("engine requested exit; stopping runtime");
                    break;
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "failed to process event"),
            }
        }

        info!("runtime exiting");
        if self.options.exit_when_idle {
            if let Some(code) = self.engine.controller().last_failure() {
                return Err(QuickscopeError::RunFailed(code));
            }
        }
        Ok(())
    }

    pub fn engine(&self) -> &Engine {
        &self.engine
    }
}
