/// End-to-end tests for a notification session
///
/// Covers:
/// - Push frames flowing from the transport into the store
/// - Toast deduplication across repeated pushes
/// - Teardown discarding REST responses still in flight
/// - Teardown resetting the alerted ids
/// - Re-attaching listeners after any disconnect path
use async_trait::async_trait;
use notification_sync::config::SyncConfig;
use notification_sync::websocket::{MemoryConnector, MemoryPeer};
use notification_sync::{
    AlertSink, ConnectOutcome, ConnectionEvent, ConnectionState, ListFilter, Notification,
    NotificationApi, NotificationId, NotificationSession, RefreshMode, RefreshOutcome, Result,
    StaticCredentials, SyncError, ToastAlert,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Default)]
struct RecordingSink {
    shown: Mutex<Vec<ToastAlert>>,
}

impl AlertSink for RecordingSink {
    fn show(&self, alert: &ToastAlert) {
        self.shown.lock().push(alert.clone());
    }
}

/// API whose list call waits until released
#[derive(Default)]
struct FakeApi {
    page: Mutex<Vec<Notification>>,
    gate: Option<Arc<Notify>>,
    read_calls: Mutex<Vec<NotificationId>>,
}

#[async_trait]
impl NotificationApi for FakeApi {
    async fn list(&self, _page: u32, _filter: ListFilter) -> Result<Vec<Notification>> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        Ok(self.page.lock().clone())
    }

    async fn mark_read(&self, id: NotificationId) -> Result<()> {
        self.read_calls.lock().push(id);
        Ok(())
    }

    async fn mark_all_read(&self) -> Result<()> {
        Ok(())
    }

    async fn dismiss(&self, _id: NotificationId) -> Result<()> {
        Ok(())
    }
}

fn note(id: i64) -> Notification {
    Notification::new(id, "contact_form", format!("Message {}", id), "Someone wrote in")
}

fn frame(event_type: &str, id: i64) -> String {
    serde_json::json!({
        "type": event_type,
        "notification": note(id),
        "timestamp": "2024-05-01T10:00:00Z",
    })
    .to_string()
}

struct Harness {
    session: Arc<NotificationSession>,
    connector: MemoryConnector,
    sink: Arc<RecordingSink>,
}

fn harness(api: FakeApi) -> Harness {
    let connector = MemoryConnector::new();
    let sink = Arc::new(RecordingSink::default());
    let session = NotificationSession::new(
        &SyncConfig::default(),
        Arc::new(connector.clone()),
        Arc::new(api),
        Arc::new(StaticCredentials::new("admin-session")),
        sink.clone(),
    );
    Harness {
        session: Arc::new(session),
        connector,
        sink,
    }
}

async fn connected_peer(harness: &Harness) -> MemoryPeer {
    assert_eq!(harness.session.connect(), ConnectOutcome::Started);
    harness.connector.accept().await
}

async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn test_repeated_push_alerts_once() {
    let harness = harness(FakeApi::default());
    let peer = connected_peer(&harness).await;

    peer.push_text(frame("admin_notification", 5));
    settle().await;
    assert_eq!(harness.session.engine().ids(), vec![NotificationId(5)]);
    assert_eq!(harness.sink.shown.lock().len(), 1);

    peer.push_text(frame("notification_created", 5));
    settle().await;
    assert_eq!(harness.session.engine().ids(), vec![NotificationId(5)]);
    assert_eq!(harness.sink.shown.lock().len(), 1);
    assert_eq!(harness.session.unread_count(), 1);

    harness.session.disconnect();
}

#[tokio::test(start_paused = true)]
async fn test_push_then_mark_read() {
    let harness = harness(FakeApi::default());
    let peer = connected_peer(&harness).await;

    peer.push_text(frame("admin_notification", 2));
    settle().await;
    assert_eq!(harness.session.unread_count(), 1);

    harness.session.mark_as_read(NotificationId(2)).await.unwrap();

    assert_eq!(harness.session.unread_count(), 0);
    assert!(harness.session.notifications()[0].is_read);
    harness.session.disconnect();
}

#[tokio::test(start_paused = true)]
async fn test_unrelated_event_types_are_ignored() {
    let harness = harness(FakeApi::default());
    let peer = connected_peer(&harness).await;

    peer.push_text(frame("user_message", 8));
    peer.push_text(r#"{"type":"pong","timestamp":"2024-05-01T10:00:00Z"}"#);
    settle().await;

    assert!(harness.session.notifications().is_empty());
    assert_eq!(harness.session.state(), ConnectionState::Connected);
    harness.session.disconnect();
}

#[tokio::test(start_paused = true)]
async fn test_refresh_and_push_do_not_duplicate() {
    let api = FakeApi::default();
    *api.page.lock() = vec![note(1), note(2)];
    let harness = harness(api);
    let peer = connected_peer(&harness).await;

    let outcome = harness.session.refresh(RefreshMode::Full).await.unwrap();
    assert_eq!(outcome, RefreshOutcome::Replaced { total: 2 });

    peer.push_text(frame("admin_notification", 2));
    peer.push_text(frame("admin_notification", 3));
    settle().await;

    assert_eq!(
        harness.session.engine().ids(),
        vec![NotificationId(3), NotificationId(1), NotificationId(2)]
    );
    // Only the genuinely new record raised an alert
    assert_eq!(harness.sink.shown.lock().len(), 1);
    harness.session.disconnect();
}

#[tokio::test]
async fn test_late_refresh_after_teardown_is_discarded() {
    let gate = Arc::new(Notify::new());
    let api = FakeApi {
        gate: Some(gate.clone()),
        ..FakeApi::default()
    };
    *api.page.lock() = vec![note(1)];
    let harness = harness(api);

    let session = harness.session.clone();
    let pending = tokio::spawn(async move { session.refresh(RefreshMode::Full).await });
    settle().await;

    harness.session.disconnect();
    gate.notify_one();

    let result = pending.await.unwrap();
    assert!(matches!(result, Err(SyncError::Cancelled(_))));
    assert!(harness.session.notifications().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_after_disconnect_reattaches_listeners() {
    let harness = harness(FakeApi::default());
    let _first = connected_peer(&harness).await;

    harness.session.disconnect();
    assert_eq!(harness.session.manager().listeners().total_listeners(), 0);

    let peer = connected_peer(&harness).await;
    peer.push_text(frame("admin_notification", 12));
    settle().await;

    assert_eq!(harness.session.engine().ids(), vec![NotificationId(12)]);
    harness.session.disconnect();
}

#[tokio::test(start_paused = true)]
async fn test_disconnect_forgets_alerted_ids() {
    let harness = harness(FakeApi::default());
    let peer = connected_peer(&harness).await;

    peer.push_text(frame("admin_notification", 5));
    settle().await;
    assert_eq!(harness.session.engine().alerted_count(), 1);

    harness.session.disconnect();
    assert!(harness.session.notifications().is_empty());
    assert_eq!(harness.session.engine().alerted_count(), 0);

    let peer = connected_peer(&harness).await;
    peer.push_text(frame("admin_notification", 5));
    settle().await;

    let shown: Vec<NotificationId> = harness.sink.shown.lock().iter().map(|a| a.id).collect();
    assert_eq!(shown, vec![NotificationId(5), NotificationId(5)]);
    assert_eq!(harness.session.engine().ids(), vec![NotificationId(5)]);
    harness.session.disconnect();
}

#[tokio::test(start_paused = true)]
async fn test_connect_after_manager_disconnect_resumes_ingestion() {
    let harness = harness(FakeApi::default());
    let _first = connected_peer(&harness).await;

    // Bypasses the session and wipes the registry
    harness.session.manager().disconnect();
    assert_eq!(harness.session.manager().listeners().total_listeners(), 0);

    let peer = connected_peer(&harness).await;
    assert_eq!(
        harness
            .session
            .manager()
            .listeners()
            .listener_count("admin_notification"),
        1
    );
    peer.push_text(frame("admin_notification", 9));
    settle().await;

    assert_eq!(harness.session.engine().ids(), vec![NotificationId(9)]);
    harness.session.disconnect();
}

#[tokio::test(start_paused = true)]
async fn test_repeated_connect_does_not_duplicate_listeners() {
    let harness = harness(FakeApi::default());
    let _peer = connected_peer(&harness).await;

    assert_eq!(harness.session.connect(), ConnectOutcome::AlreadyActive);

    let listeners = harness.session.manager().listeners();
    assert_eq!(listeners.listener_count("admin_notification"), 1);
    assert_eq!(listeners.listener_count("notification_created"), 1);
    harness.session.disconnect();
}

#[tokio::test(start_paused = true)]
async fn test_reconnect_attempts_never_exceed_limit() {
    let harness = harness(FakeApi::default());
    let mut events = harness.session.events();
    let peer = connected_peer(&harness).await;

    harness.connector.refuse_connections(true);
    peer.close(Some("backend restart"));

    let mut delays = Vec::new();
    loop {
        match events.recv().await.unwrap() {
            ConnectionEvent::ReconnectScheduled { delay, .. } => delays.push(delay),
            ConnectionEvent::ReconnectExhausted { .. } => break,
            _ => {}
        }
    }

    assert_eq!(delays.len(), 5);
    assert!(delays.windows(2).all(|pair| pair[0] <= pair[1]));

    tokio::time::sleep(Duration::from_secs(300)).await;
    assert_eq!(harness.connector.open_attempts(), 6);
    assert_eq!(harness.session.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_no_credential_means_no_connection() {
    let connector = MemoryConnector::new();
    let session = NotificationSession::new(
        &SyncConfig::default(),
        Arc::new(connector.clone()),
        Arc::new(FakeApi::default()),
        Arc::new(StaticCredentials::none()),
        Arc::new(RecordingSink::default()),
    );

    assert_eq!(session.connect(), ConnectOutcome::Unauthenticated);
    settle().await;
    assert_eq!(connector.open_attempts(), 0);
    assert_eq!(session.state(), ConnectionState::Disconnected);
}
