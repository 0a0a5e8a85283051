//! Project lifecycle events and the synchronous bus that delivers them.
//!
//! Events are broadcast, never queued: `broadcast` calls every handler on the
//! caller's thread before returning. Handlers are snapshotted first, so a
//! handler may subscribe, unsubscribe or broadcast again without deadlocking.

use parking_lot::RwLock;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, trace};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProjectEventKind {
    /// Baseline context is ready. Triggers warming, never invalidation.
    Startup,
    SettingsChanged,
    ExecutableChanged,
    ConfigChanged,
    /// Task data changed and views should redraw.
    TaskCacheRefreshed,
}

impl ProjectEventKind {
    /// Kinds after which cached command results are stale.
    pub fn invalidates_commands(&self) -> bool {
        matches!(
            self,
            ProjectEventKind::SettingsChanged
                | ProjectEventKind::ExecutableChanged
                | ProjectEventKind::ConfigChanged
        )
    }
}

impl fmt::Display for ProjectEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProjectEventKind::Startup => "startup",
            ProjectEventKind::SettingsChanged => "settings-changed",
            ProjectEventKind::ExecutableChanged => "executable-changed",
            ProjectEventKind::ConfigChanged => "config-changed",
            ProjectEventKind::TaskCacheRefreshed => "task-cache-refreshed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectEvent {
    pub kind: ProjectEventKind,
    pub reason: String,
}

impl ProjectEvent {
    pub fn new(kind: ProjectEventKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
        }
    }
}

type Handler = Arc<dyn Fn(&ProjectEvent) + Send + Sync>;

struct BusInner {
    name: String,
    handlers: RwLock<Vec<(u64, Handler)>>,
    next_id: AtomicU64,
    disposed: AtomicBool,
}

/// Per-project event bus.
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    /// Create a bus for the named project
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(BusInner {
                name: name.into(),
                handlers: RwLock::new(Vec::new()),
                next_id: AtomicU64::new(0),
                disposed: AtomicBool::new(false),
            }),
        }
    }

    /// Register a handler. It stays registered while the returned
    /// [`Subscription`] is alive.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&ProjectEvent) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        if !self.is_disposed() {
            let mut handlers = self.inner.handlers.write();
            handlers.push((id, Arc::new(handler)));
            debug!(
                project = %self.inner.name,
                total_subscribers = handlers.len(),
                "Registered project event subscriber"
            );
        }
        Subscription {
            id,
            bus: Arc::downgrade(&self.inner),
        }
    }

    /// Deliver `event` to every handler, in subscription order.
    pub fn broadcast(&self, event: ProjectEvent) {
        if self.is_disposed() {
            trace!(
                project = %self.inner.name,
                kind = %event.kind,
                "Dropping event for disposed project"
            );
            return;
        }
        trace!(
            project = %self.inner.name,
            kind = %event.kind,
            reason = %event.reason,
            "Broadcasting project event"
        );
        let snapshot: Vec<Handler> = self
            .inner
            .handlers
            .read()
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();
        for handler in snapshot {
            if self.is_disposed() {
                break;
            }
            handler(&event);
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.handlers.read().len()
    }

    /// Drop all handlers and ignore further broadcasts.
    pub fn dispose(&self) {
        if !self.inner.disposed.swap(true, Ordering::SeqCst) {
            self.inner.handlers.write().clear();
            debug!(project = %self.inner.name, "Disposed project event bus");
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("name", &self.inner.name)
            .field("subscribers", &self.subscriber_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

/// Handle that unregisters its handler when dropped.
#[must_use = "dropping a subscription unregisters its handler"]
pub struct Subscription {
    id: u64,
    bus: Weak<BusInner>,
}

impl Subscription {
    /// Unregister now.
    pub fn dispose(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.handlers.write().retain(|(id, _)| *id != self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
