// src/engine/core.rs

//! Synchronous core of the engine.
//!
//! [`Engine`] owns one hub and one instance of each component, subscribed
//! in a fixed order: the store first, then the watch manager, then the
//! controller. It consumes [`RuntimeEvent`]s one at a time; everything a
//! single event causes (graph updates, watch changes, run requests) has
//! happened by the time [`Engine::handle`] returns.
//!
//! The core has no channels and no Tokio types, so it is tested directly
//! with fake collaborators.

use std::cell::{Ref, RefCell};
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use tracing::debug;

use crate::controller::{Controller, ControllerSettings};
use crate::engine::{CoreStep, RuntimeEvent, RuntimeOptions};
use crate::errors::Result;
use crate::exec::CommandRunner;
use crate::fs::FileSystem;
use crate::graph::DependencyStore;
use crate::hub::Hub;
use crate::resolve::DependencyResolver;
use crate::watch::{TargetMatcher, WatchBackend, WatchManager};

/// Collaborators and settings an [`Engine`] is built from.
pub struct EngineParts {
    pub resolver: Box<dyn DependencyResolver>,
    pub watch_backend: Box<dyn WatchBackend>,
    pub runner: Box<dyn CommandRunner>,
    pub fs: Arc<dyn FileSystem>,
    pub matcher: TargetMatcher,
    pub cmd: String,
    pub use_hash: bool,
    pub run_on_ready: bool,
    pub options: RuntimeOptions,
}

pub struct Engine {
    hub: Rc<Hub>,
    store: Rc<RefCell<DependencyStore>>,
    watches: Rc<RefCell<WatchManager>>,
    controller: Rc<RefCell<Controller>>,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("hub", &self.hub)
            .field("store", &self.store)
            .field("watches", &self.watches)
            .field("controller", &self.controller)
            .finish()
    }
}

impl Engine {
    pub fn new(parts: EngineParts) -> Self {
        let hub = Rc::new(Hub::new());

        let store = Rc::new(RefCell::new(DependencyStore::new(
            Rc::clone(&hub),
            parts.resolver,
        )));
        let watches = Rc::new(RefCell::new(WatchManager::new(
            Rc::clone(&hub),
            parts.watch_backend,
            Arc::clone(&parts.fs),
            parts.use_hash,
        )));
        let controller = Rc::new(RefCell::new(Controller::new(
            Rc::clone(&hub),
            parts.matcher,
            parts.fs,
            parts.runner,
            ControllerSettings {
                cmd: parts.cmd,
                run_on_ready: parts.run_on_ready,
                exit_when_idle: parts.options.exit_when_idle,
            },
        )));

        DependencyStore::register(&store);
        WatchManager::register(&watches);
        Controller::register(&controller);

        Self {
            hub,
            store,
            watches,
            controller,
        }
    }

    /// Handle a single runtime event.
    ///
    /// An error aborts the processing of this one event only; the engine
    /// stays usable for the next.
    pub fn handle(&mut self, event: RuntimeEvent) -> Result<CoreStep> {
        match event {
            RuntimeEvent::TargetFs(fs_event) => {
                self.controller.borrow_mut().handle_target_event(&fs_event)?;
            }
            RuntimeEvent::InitialScanComplete => {
                let mut controller = self.controller.borrow_mut();
                controller.mark_ready()?;
                if controller.is_done() {
                    return Ok(CoreStep::STOP);
                }
            }
            RuntimeEvent::DependencyFs(fs_event) => {
                // Release the manager before publishing: the store's
                // reaction opens and closes watches.
                let follow_up = self.watches.borrow_mut().on_fs_event(&fs_event);
                if let Some(hub_event) = follow_up {
                    debug!(topic = %hub_event.topic(), "dependency event");
                    self.hub.publish(hub_event)?;
                }
            }
            RuntimeEvent::RunCompleted { run_id, outcome } => {
                if self.controller.borrow_mut().run_completed(run_id, outcome) {
                    return Ok(CoreStep::STOP);
                }
            }
            RuntimeEvent::ShutdownRequested => return Ok(CoreStep::STOP),
        }
        Ok(CoreStep::CONTINUE)
    }

    pub fn hub(&self) -> &Rc<Hub> {
        &self.hub
    }

    pub fn store(&self) -> Ref<'_, DependencyStore> {
        self.store.borrow()
    }

    pub fn watches(&self) -> Ref<'_, WatchManager> {
        self.watches.borrow()
    }

    pub fn controller(&self) -> Ref<'_, Controller> {
        self.controller.borrow()
    }
}
