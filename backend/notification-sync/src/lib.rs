pub mod api;
pub mod config;
pub mod credentials;
pub mod error;
pub mod metrics;
pub mod models;
pub mod reconciliation;
pub mod session;
pub mod store;
pub mod toast;
pub mod websocket;

pub use api::{HttpNotificationApi, ListFilter, NotificationApi};
pub use config::SyncConfig;
pub use credentials::{CredentialSource, SessionToken, StaticCredentials};
pub use error::{RemoteAction, Result, SyncError};
pub use models::{Notification, NotificationIcon, NotificationId, NotificationPriority};
pub use reconciliation::{PushOutcome, ReconciliationEngine, RefreshMode, RefreshOutcome};
pub use session::NotificationSession;
pub use store::NotificationStore;
pub use toast::{AlertSink, ToastAlert, ToastDedupGuard, TracingAlertSink};
pub use websocket::{ConnectOutcome, ConnectionEvent, ConnectionManager, ConnectionState};
