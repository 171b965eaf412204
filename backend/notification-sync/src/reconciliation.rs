/// Reconciliation of REST snapshots, pushed records and local mutations
///
/// Every store change is a synchronous step under the store lock; the lock is
/// never held across an await. Mutations are optimistic: the local record
/// changes first and a failed remote acknowledgement is logged and returned
/// but never rolled back, so local and remote state may diverge until the
/// next full refresh.
use crate::api::{ListFilter, NotificationApi};
use crate::error::{RemoteAction, Result, SyncError};
use crate::metrics;
use crate::models::{Notification, NotificationId};
use crate::store::NotificationStore;
use crate::toast::{AlertSink, ToastAlert, ToastDedupGuard};
use crate::websocket::{ListenerId, ListenerRegistry, PushFrame};
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshMode {
    /// Replace the store with the fetched page
    Full,
    /// Prepend unseen records only; a full replace still happens on an empty store
    Background,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Replaced { total: usize },
    Merged { added: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushOutcome {
    /// New record prepended; `alerted` is false if a toast was already shown for it
    Added { alerted: bool },
    /// Id already present, nothing changed
    Duplicate,
}

#[derive(Clone)]
pub struct ReconciliationEngine {
    api: Arc<dyn NotificationApi>,
    store: Arc<Mutex<NotificationStore>>,
    toasts: Arc<Mutex<ToastDedupGuard>>,
    alerts: Arc<dyn AlertSink>,
    /// Cancelled on teardown and replaced by a fresh token
    session: Arc<Mutex<CancellationToken>>,
    notification_events: Arc<Vec<String>>,
}

impl ReconciliationEngine {
    pub fn new(
        api: Arc<dyn NotificationApi>,
        alerts: Arc<dyn AlertSink>,
        notification_events: Vec<String>,
    ) -> Self {
        Self {
            api,
            store: Arc::new(Mutex::new(NotificationStore::new())),
            toasts: Arc::new(Mutex::new(ToastDedupGuard::new())),
            alerts,
            session: Arc::new(Mutex::new(CancellationToken::new())),
            notification_events: Arc::new(notification_events),
        }
    }

    /// Await a REST call unless the session is torn down first
    ///
    /// A response that resolves after teardown is discarded.
    async fn guarded<T, F>(&self, action: RemoteAction, call: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let token = self.session.lock().clone();

        tokio::select! {
            biased;
            _ = token.cancelled() => Err(SyncError::Cancelled(action)),
            result = call => {
                if token.is_cancelled() {
                    debug!("Discarding late response for {}", action);
                    return Err(SyncError::Cancelled(action));
                }
                result
            }
        }
    }

    fn publish_unread(&self, store: &NotificationStore) {
        metrics::set_unread(store.unread_count());
    }

    /// Fetch the first page and fold it into the store
    pub async fn refresh(&self, mode: RefreshMode) -> Result<RefreshOutcome> {
        let action = RemoteAction::ListNotifications;
        let page = match self.guarded(action, self.api.list(1, ListFilter::default())).await {
            Ok(page) => page,
            Err(e) => {
                warn!("Notification refresh failed: {}", e);
                return Err(e);
            }
        };

        let mut store = self.store.lock();
        let outcome = if mode == RefreshMode::Full || store.is_empty() {
            store.replace_all(page);
            RefreshOutcome::Replaced { total: store.len() }
        } else {
            RefreshOutcome::Merged {
                added: store.merge_snapshot(page),
            }
        };
        self.publish_unread(&store);
        drop(store);

        debug!("Refresh ({:?}) -> {:?}", mode, outcome);
        Ok(outcome)
    }

    /// Query one page from the server without touching the store
    pub async fn fetch(&self, page: u32, filter: ListFilter) -> Result<Vec<Notification>> {
        self.guarded(RemoteAction::ListNotifications, self.api.list(page, filter))
            .await
    }

    /// Ingest a pushed record and alert at most once per id
    ///
    /// The alert sink runs after every lock is released, so it may read
    /// session state.
    pub fn apply_push(&self, notification: Notification) -> PushOutcome {
        let alert = {
            let mut store = self.store.lock();
            if store.contains(notification.id) {
                debug!("Ignoring duplicate push for notification {}", notification.id);
                return PushOutcome::Duplicate;
            }

            let alert = self
                .toasts
                .lock()
                .try_claim(notification.id)
                .then(|| ToastAlert::from(&notification));
            info!("New notification {} ({})", notification.id, notification.notification_type);
            store.insert_pushed(notification);
            self.publish_unread(&store);
            alert
        };

        match alert {
            Some(alert) => {
                self.alerts.show(&alert);
                metrics::observe_toast();
                PushOutcome::Added { alerted: true }
            }
            None => PushOutcome::Added { alerted: false },
        }
    }

    pub async fn mark_as_read(&self, id: NotificationId) -> Result<()> {
        {
            let mut store = self.store.lock();
            if !store.mark_read(id) {
                debug!("mark_as_read for unknown notification {}", id);
            }
            self.publish_unread(&store);
        }

        self.guarded(RemoteAction::MarkRead(id), self.api.mark_read(id))
            .await
            .map_err(|e| {
                warn!("Failed to mark notification {} read: {}", id, e);
                e
            })
    }

    pub async fn mark_all_as_read(&self) -> Result<()> {
        {
            let mut store = self.store.lock();
            let changed = store.mark_all_read();
            debug!("Marked {} notification(s) read locally", changed);
            self.publish_unread(&store);
        }

        self.guarded(RemoteAction::MarkAllRead, self.api.mark_all_read())
            .await
            .map_err(|e| {
                warn!("Failed to mark all notifications read: {}", e);
                e
            })
    }

    pub async fn dismiss(&self, id: NotificationId) -> Result<()> {
        {
            let mut store = self.store.lock();
            store.remove(id);
            self.publish_unread(&store);
        }

        self.guarded(RemoteAction::Dismiss(id), self.api.dismiss(id))
            .await
            .map_err(|e| {
                warn!("Failed to dismiss notification {}: {}", id, e);
                e
            })
    }

    pub fn unread_count(&self) -> usize {
        self.store.lock().unread_count()
    }

    /// Current records, newest first
    pub fn notifications(&self) -> Vec<Notification> {
        self.store.lock().iter().cloned().collect()
    }

    pub fn ids(&self) -> Vec<NotificationId> {
        self.store.lock().ids()
    }

    pub fn alerted_count(&self) -> usize {
        self.toasts.lock().len()
    }

    /// Event types routed into the store
    pub fn notification_events(&self) -> &[String] {
        &self.notification_events
    }

    /// Subscribe to one notification-bearing event type
    pub fn attach_to(&self, listeners: &ListenerRegistry, event_type: &str) -> ListenerId {
        let engine = self.clone();
        listeners.on(event_type, move |frame: &PushFrame| {
            match &frame.notification {
                Some(notification) => {
                    engine.apply_push(notification.clone());
                }
                None => debug!("'{}' frame without a notification", frame.event_type),
            }
            Ok(())
        })
    }

    /// Drop all session state and discard responses still in flight
    pub fn teardown(&self) {
        let stale = std::mem::replace(&mut *self.session.lock(), CancellationToken::new());
        stale.cancel();

        let mut store = self.store.lock();
        store.clear();
        self.publish_unread(&store);
        drop(store);

        self.toasts.lock().clear();
    }
}
