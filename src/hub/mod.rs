// src/hub/mod.rs

//! Synchronous in-process event bus connecting the dependency store, the
//! watch manager and the controller.
//!
//! Delivery is a direct function-call fan-out: `publish` calls every handler
//! subscribed to the event's topic, in subscription order, before it returns.
//! Handlers may publish further events; those are delivered depth-first,
//! inside the outer `publish` call. The first handler error stops delivery
//! and is returned to the publisher.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::rc::{Rc, Weak};

use tracing::trace;

use crate::errors::{QuickscopeError, Result};
use crate::graph::{Dependency, Target};

/// Bus topics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Topic {
    TargetAdded,
    TargetRemoved,
    MultipleDependencyAdded,
    MultipleDependencyChanged,
    MultipleDependencyDirty,
    DependencyUnwatch,
    MultipleDependencyUnwatch,
    DependencyFileChanged,
    DependencyFileUnlink,
}

impl Topic {
    pub const ALL: [Topic; 9] = [
        Topic::TargetAdded,
        Topic::TargetRemoved,
        Topic::MultipleDependencyAdded,
        Topic::MultipleDependencyChanged,
        Topic::MultipleDependencyDirty,
        Topic::DependencyUnwatch,
        Topic::MultipleDependencyUnwatch,
        Topic::DependencyFileChanged,
        Topic::DependencyFileUnlink,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Topic::TargetAdded => "TARGET_ADDED",
            Topic::TargetRemoved => "TARGET_REMOVED",
            Topic::MultipleDependencyAdded => "MULTIPLE_DEPENDENCY_ADDED",
            Topic::MultipleDependencyChanged => "MULTIPLE_DEPENDENCY_CHANGED",
            Topic::MultipleDependencyDirty => "MULTIPLE_DEPENDENCY_DIRTY",
            Topic::DependencyUnwatch => "DEPENDENCY_UNWATCH",
            Topic::MultipleDependencyUnwatch => "MULTIPLE_DEPENDENCY_UNWATCH",
            Topic::DependencyFileChanged => "DEPENDENCY_FILE_CHANGED",
            Topic::DependencyFileUnlink => "DEPENDENCY_FILE_UNLINK",
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A published event: one variant per [`Topic`], carrying that topic's
/// payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HubEvent {
    /// A target file appeared under the watched glob.
    TargetAdded(Target),
    /// A target file was unlinked; carries its full path.
    TargetRemoved(PathBuf),
    MultipleDependencyAdded(Vec<Dependency>),
    MultipleDependencyChanged(Vec<Dependency>),
    /// Targets that must re-run although their dependency lists did not
    /// change (one of their dependencies was deleted).
    MultipleDependencyDirty(Vec<Dependency>),
    DependencyUnwatch(PathBuf),
    MultipleDependencyUnwatch(Vec<PathBuf>),
    DependencyFileChanged(Dependency),
    DependencyFileUnlink(Dependency),
}

impl HubEvent {
    pub fn topic(&self) -> Topic {
        match self {
            HubEvent::TargetAdded(_) => Topic::TargetAdded,
            HubEvent::TargetRemoved(_) => Topic::TargetRemoved,
            HubEvent::MultipleDependencyAdded(_) => Topic::MultipleDependencyAdded,
            HubEvent::MultipleDependencyChanged(_) => Topic::MultipleDependencyChanged,
            HubEvent::MultipleDependencyDirty(_) => Topic::MultipleDependencyDirty,
            HubEvent::DependencyUnwatch(_) => Topic::DependencyUnwatch,
            HubEvent::MultipleDependencyUnwatch(_) => Topic::MultipleDependencyUnwatch,
            HubEvent::DependencyFileChanged(_) => Topic::DependencyFileChanged,
            HubEvent::DependencyFileUnlink(_) => Topic::DependencyFileUnlink,
        }
    }
}

/// A subscribed handler.
pub type Handler = Rc<dyn Fn(&HubEvent) -> Result<()>>;

/// The event bus.
#[derive(Default)]
pub struct Hub {
    handlers: RefCell<HashMap<Topic, Vec<Handler>>>,
}

impl fmt::Debug for Hub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counts: Vec<(Topic, usize)> = {
            let handlers = self.handlers.borrow();
            let mut counts: Vec<_> = handlers.iter().map(|(t, h)| (*t, h.len())).collect();
            counts.sort();
            counts
        };
        f.debug_struct("Hub").field("handlers", &counts).finish()
    }
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `handler` to the subscribers of `topic`.
    pub fn subscribe<F>(&self, topic: Topic, handler: F)
    where
        F: Fn(&HubEvent) -> Result<()> + 'static,
    {
        self.handlers
            .borrow_mut()
            .entry(topic)
            .or_default()
            .push(Rc::new(handler));
    }

    /// Deliver `event` to every subscriber of its topic, in order.
    pub fn publish(&self, event: HubEvent) -> Result<()> {
        let topic = event.topic();
        // Snapshot so handlers can subscribe/publish while we iterate.
        let handlers: Vec<Handler> = self
            .handlers
            .borrow()
            .get(&topic)
            .cloned()
            .unwrap_or_default();

        trace!(%topic, subscribers = handlers.len(), "publishing");

        for handler in handlers {
            handler(&event)?;
        }
        Ok(())
    }

    /// Subscribe a method of a shared component.
    ///
    /// The hub only keeps a weak reference: once the component is dropped
    /// the handler does nothing. A delivery that finds the component already
    /// mutably borrowed (it is the one publishing) fails with
    /// [`QuickscopeError::Reentrant`] instead of panicking.
    pub fn subscribe_with<C, F>(&self, topic: Topic, component: &Rc<RefCell<C>>, handler: F)
    where
        C: 'static,
        F: Fn(&mut C, &HubEvent) -> Result<()> + 'static,
    {
        let weak: Weak<RefCell<C>> = Rc::downgrade(component);
        self.subscribe(topic, move |event| {
            let Some(component) = weak.upgrade() else {
                return Ok(());
            };
            let mut guard = component
                .try_borrow_mut()
                .map_err(|_| QuickscopeError::Reentrant(topic))?;
            handler(&mut guard, event)
        });
    }

    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.handlers.borrow().get(&topic).map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unwatch(path: &str) -> HubEvent {
        HubEvent::DependencyUnwatch(PathBuf::from(path))
    }

    #[test]
    fn delivers_in_subscription_order() {
        let hub = Hub::new();
        let calls = Rc::new(RefCell::new(Vec::new()));

        for id in 0..3 {
            let calls = Rc::clone(&calls);
            hub.subscribe(Topic::DependencyUnwatch, move |_| {
                calls.borrow_mut().push(id);
                Ok(())
            });
        }

        hub.publish(unwatch("/a")).unwrap();
        assert_eq!(*calls.borrow(), vec![0, 1, 2]);
    }

    #[test]
    fn only_matching_topic_is_delivered() {
        let hub = Hub::new();
        let hits = Rc::new(RefCell::new(0));
        {
            let hits = Rc::clone(&hits);
            hub.subscribe(Topic::TargetRemoved, move |_| {
                *hits.borrow_mut() += 1;
                Ok(())
            });
        }

        hub.publish(unwatch("/a")).unwrap();
        assert_eq!(*hits.borrow(), 0);
        hub.publish(HubEvent::TargetRemoved(PathBuf::from("/t"))).unwrap();
        assert_eq!(*hits.borrow(), 1);
    }

    #[test]
    fn nested_publish_is_delivered_depth_first() {
        let hub = Rc::new(Hub::new());
        let log = Rc::new(RefCell::new(Vec::<String>::new()));

        {
            let log = Rc::clone(&log);
            let inner_hub = Rc::downgrade(&hub);
            hub.subscribe(Topic::TargetRemoved, move |event| {
                log.borrow_mut().push(format!("first {:?}", event.topic()));
                if let Some(hub) = inner_hub.upgrade() {
                    hub.publish(HubEvent::DependencyUnwatch(PathBuf::from("/dep")))?;
                }
                Ok(())
            });
        }
        {
            let log = Rc::clone(&log);
            hub.subscribe(Topic::TargetRemoved, move |_| {
                log.borrow_mut().push("second".to_string());
                Ok(())
            });
        }
        {
            let log = Rc::clone(&log);
            hub.subscribe(Topic::DependencyUnwatch, move |_| {
                log.borrow_mut().push("unwatch".to_string());
                Ok(())
            });
        }

        hub.publish(HubEvent::TargetRemoved(PathBuf::from("/t"))).unwrap();
        assert_eq!(
            *log.borrow(),
            vec!["first TargetRemoved", "unwatch", "second"]
        );
    }

    #[test]
    fn handler_error_stops_delivery_and_reaches_publisher() {
        let hub = Hub::new();
        let reached = Rc::new(RefCell::new(false));

        hub.subscribe(Topic::DependencyUnwatch, |_| {
            Err(QuickscopeError::InvalidArgument("boom".to_string()))
        });
        {
            let reached = Rc::clone(&reached);
            hub.subscribe(Topic::DependencyUnwatch, move |_| {
                *reached.borrow_mut() = true;
                Ok(())
            });
        }

        let err = hub.publish(unwatch("/a")).unwrap_err();
        assert!(matches!(err, QuickscopeError::InvalidArgument(_)));
        assert!(!*reached.borrow());
    }

    #[test]
    fn subscribing_during_publish_takes_effect_next_time() {
        let hub = Rc::new(Hub::new());
        let weak = Rc::downgrade(&hub);
        hub.subscribe(Topic::DependencyUnwatch, move |_| {
            if let Some(hub) = weak.upgrade() {
                hub.subscribe(Topic::DependencyUnwatch, |_| Ok(()));
            }
            Ok(())
        });

        hub.publish(unwatch("/a")).unwrap();
        assert_eq!(hub.subscriber_count(Topic::DependencyUnwatch), 2);
    }
}
