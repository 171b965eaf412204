/// Session-scoped notification sync
///
/// Owns one push connection, one store, one listener registry and one toast
/// guard. Nothing is shared across sessions; tearing a session down releases
/// all of them together.
use crate::api::{HttpNotificationApi, ListFilter, NotificationApi};
use crate::config::SyncConfig;
use crate::credentials::{ChainedCredentials, CredentialSource};
use crate::error::Result;
use crate::models::{Notification, NotificationId};
use crate::reconciliation::{ReconciliationEngine, RefreshMode, RefreshOutcome};
use crate::toast::{AlertSink, TracingAlertSink};
use crate::websocket::{
    ConnectOutcome, ConnectionEvent, ConnectionManager, ConnectionState, Connector, ListenerId,
    WebSocketConnector,
};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;

pub struct NotificationSession {
    manager: ConnectionManager,
    engine: ReconciliationEngine,
    attached: Mutex<Vec<(String, ListenerId)>>,
}

impl NotificationSession {
    pub fn new(
        config: &SyncConfig,
        connector: Arc<dyn Connector>,
        api: Arc<dyn NotificationApi>,
        credentials: Arc<dyn CredentialSource>,
        alerts: Arc<dyn AlertSink>,
    ) -> Self {
        Self {
            manager: ConnectionManager::new(config.push.clone(), connector, credentials),
            engine: ReconciliationEngine::new(api, alerts, config.push.notification_events.clone()),
            attached: Mutex::new(Vec::new()),
        }
    }

    /// WebSocket transport, HTTP API and environment/file credentials
    pub fn from_config(config: &SyncConfig) -> Result<Self> {
        config.validate()?;

        let credentials: Arc<dyn CredentialSource> =
            Arc::new(ChainedCredentials::from_config(&config.session));
        let connector = Arc::new(WebSocketConnector::new(
            config.api.auth_scheme.clone(),
            config.push.handshake_timeout,
        ));
        let api = Arc::new(HttpNotificationApi::new(config.api.clone(), credentials.clone()));

        Ok(Self::new(config, connector, api, credentials, Arc::new(TracingAlertSink)))
    }

    /// Route notification frames into the store and open the push connection
    ///
    /// Engine listeners missing from the registry are registered again, so
    /// connecting after any disconnect path resumes ingestion.
    pub fn connect(&self) -> ConnectOutcome {
        {
            let listeners = self.manager.listeners();
            let mut attached = self.attached.lock();
            attached.retain(|(event_type, id)| listeners.contains(event_type, *id));

            for event_type in self.engine.notification_events() {
                if !attached.iter().any(|(attached_type, _)| attached_type == event_type) {
                    let id = self.engine.attach_to(listeners, event_type);
                    attached.push((event_type.clone(), id));
                }
            }
        }
        self.manager.connect()
    }

    /// Full teardown: connection, listeners, store, alerted ids and in-flight calls
    ///
    /// The session can be connected again afterwards and starts empty.
    pub fn disconnect(&self) {
        self.manager.disconnect();
        self.attached.lock().clear();
        self.engine.teardown();
        info!("Notification session torn down");
    }

    pub async fn refresh(&self, mode: RefreshMode) -> Result<RefreshOutcome> {
        self.engine.refresh(mode).await
    }

    /// Server-side query of one page; the local store is not changed
    pub async fn fetch(&self, page: u32, filter: ListFilter) -> Result<Vec<Notification>> {
        self.engine.fetch(page, filter).await
    }

    pub async fn mark_as_read(&self, id: NotificationId) -> Result<()> {
        self.engine.mark_as_read(id).await
    }

    pub async fn mark_all_as_read(&self) -> Result<()> {
        self.engine.mark_all_as_read().await
    }

    pub async fn dismiss(&self, id: NotificationId) -> Result<()> {
        self.engine.dismiss(id).await
    }

    pub fn unread_count(&self) -> usize {
        self.engine.unread_count()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.engine.notifications()
    }

    pub fn state(&self) -> ConnectionState {
        self.manager.state()
    }

    pub fn events(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.manager.subscribe()
    }

    pub fn manager(&self) -> &ConnectionManager {
        &self.manager
    }

    pub fn engine(&self) -> &ReconciliationEngine {
        &self.engine
    }
}

impl Drop for NotificationSession {
    fn drop(&mut self) {
        self.disconnect();
    }
}
