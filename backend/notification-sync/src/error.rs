use thiserror::Error;

use crate::models::NotificationId;

pub type Result<T> = std::result::Result<T, SyncError>;

/// Notification sync error types
///
/// Only an exhausted reconnection budget is terminal; every other variant is
/// absorbed by the component that observes it.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Transport failed to open, closed, or errored
    #[error("Push connection error: {0}")]
    Connection(String),

    /// Inbound frame could not be decoded
    #[error("Malformed push frame: {0}")]
    Protocol(#[from] serde_json::Error),

    /// No usable session credential
    #[error("Session credential unavailable: {0}")]
    Auth(String),

    /// A REST call against the notification API failed
    #[error("Remote {action} failed: {reason}")]
    RemoteAction { action: RemoteAction, reason: String },

    #[error("Push connection is not open")]
    NotConnected,

    /// Response arrived after the session was torn down
    #[error("Session was torn down before {0} completed")]
    Cancelled(RemoteAction),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Listener failed: {0}")]
    Listener(String),
}

/// REST operations issued by the reconciliation engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteAction {
    ListNotifications,
    MarkRead(NotificationId),
    MarkAllRead,
    Dismiss(NotificationId),
}

impl std::fmt::Display for RemoteAction {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            RemoteAction::ListNotifications => write!(f, "list notifications"),
            RemoteAction::MarkRead(id) => write!(f, "mark notification {} read", id),
            RemoteAction::MarkAllRead => write!(f, "mark all notifications read"),
            RemoteAction::Dismiss(id) => write!(f, "dismiss notification {}", id),
        }
    }
}

impl SyncError {
    pub fn remote(action: RemoteAction, reason: impl Into<String>) -> Self {
        SyncError::RemoteAction {
            action,
            reason: reason.into(),
        }
    }
}
