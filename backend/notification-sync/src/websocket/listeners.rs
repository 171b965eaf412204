/// Type-keyed listener registry for inbound push frames
///
/// Handlers are invoked in registration order. Delivery is at-least-once, so
/// handlers must tolerate seeing the same frame twice. A handler that errors
/// or panics is isolated: the remaining handlers for the frame still run.
use super::PushFrame;
use crate::error::Result;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Handler invoked for each frame of a subscribed event type
pub type FrameHandler = Arc<dyn Fn(&PushFrame) -> Result<()> + Send + Sync>;

/// Identity of a registered handler, used for removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(Uuid);

/// Outcome of dispatching one frame
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub delivered: usize,
    pub failed: usize,
}

#[derive(Clone, Default)]
pub struct ListenerRegistry {
    /// Map of event type -> handlers in registration order
    listeners: Arc<RwLock<HashMap<String, Vec<(ListenerId, FrameHandler)>>>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler for an event type
    pub fn on<F>(&self, event_type: impl Into<String>, handler: F) -> ListenerId
    where
        F: Fn(&PushFrame) -> Result<()> + Send + Sync + 'static,
    {
        let id = ListenerId(Uuid::new_v4());
        let event_type = event_type.into();
        debug!("Registering listener {:?} for '{}'", id, event_type);

        self.listeners
            .write()
            .entry(event_type)
            .or_default()
            .push((id, Arc::new(handler)));

        id
    }

    /// Remove a handler by identity. Returns false if it was not registered.
    pub fn off(&self, event_type: &str, id: ListenerId) -> bool {
        let mut listeners = self.listeners.write();
        let Some(handlers) = listeners.get_mut(event_type) else {
            return false;
        };

        let before = handlers.len();
        handlers.retain(|(existing, _)| *existing != id);
        let removed = handlers.len() != before;

        if handlers.is_empty() {
            listeners.remove(event_type);
        }
        removed
    }

    /// Deliver a frame to every handler registered for its event type
    pub fn dispatch(&self, frame: &PushFrame) -> DispatchReport {
        // Snapshot so handlers may call on/off without deadlocking
        let handlers: Vec<(ListenerId, FrameHandler)> = match self
            .listeners
            .read()
            .get(frame.event_type.as_str())
        {
            Some(handlers) => handlers.clone(),
            None => {
                debug!("No listeners for '{}'", frame.event_type);
                return DispatchReport::default();
            }
        };

        let mut report = DispatchReport::default();
        for (id, handler) in handlers {
            match catch_unwind(AssertUnwindSafe(|| handler(frame))) {
                Ok(Ok(())) => report.delivered += 1,
                Ok(Err(e)) => {
                    warn!("Listener {:?} for '{}' failed: {}", id, frame.event_type, e);
                    report.failed += 1;
                }
                Err(_) => {
                    error!("Listener {:?} for '{}' panicked", id, frame.event_type);
                    report.failed += 1;
                }
            }
        }

        report
    }

    /// Remove every handler
    pub fn clear(&self) {
        self.listeners.write().clear();
    }

    /// Whether `id` is still registered for `event_type`
    pub fn contains(&self, event_type: &str, id: ListenerId) -> bool {
        self.listeners
            .read()
            .get(event_type)
            .map(|handlers| handlers.iter().any(|(existing, _)| *existing == id))
            .unwrap_or(false)
    }

    pub fn listener_count(&self, event_type: &str) -> usize {
        self.listeners
            .read()
            .get(event_type)
            .map(|v| v.len())
            .unwrap_or(0)
    }

    pub fn total_listeners(&self) -> usize {
        self.listeners.read().values().map(|v| v.len()).sum()
    }
}

impl std::fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("total_listeners", &self.total_listeners())
            .finish()
    }
}
