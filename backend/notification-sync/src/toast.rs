/// Ephemeral alerts for newly pushed notifications
use crate::models::{Notification, NotificationIcon, NotificationId, NotificationPriority};
use std::collections::HashSet;
use tracing::info;

/// What the user is shown for one new notification
#[derive(Debug, Clone, PartialEq)]
pub struct ToastAlert {
    pub id: NotificationId,
    pub title: String,
    pub message: String,
    pub icon: NotificationIcon,
    pub priority: NotificationPriority,
}

impl From<&Notification> for ToastAlert {
    fn from(notification: &Notification) -> Self {
        ToastAlert {
            id: notification.id,
            title: notification.title.clone(),
            message: notification.message.clone(),
            icon: notification.icon,
            priority: notification.priority,
        }
    }
}

/// Where alerts are surfaced
pub trait AlertSink: Send + Sync {
    fn show(&self, alert: &ToastAlert);
}

/// Logs alerts through `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAlertSink;

impl AlertSink for TracingAlertSink {
    fn show(&self, alert: &ToastAlert) {
        info!(
            notification_id = %alert.id,
            icon = alert.icon.as_str(),
            priority = alert.priority.as_str(),
            "{}: {}",
            alert.title,
            alert.message
        );
    }
}

/// Remembers which ids were already alerted in this session
///
/// Never persisted; cleared only on teardown.
#[derive(Debug, Default)]
pub struct ToastDedupGuard {
    shown: HashSet<NotificationId>,
}

impl ToastDedupGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// True the first time an id is claimed, false afterwards
    pub fn try_claim(&mut self, id: NotificationId) -> bool {
        self.shown.insert(id)
    }

    pub fn len(&self) -> usize {
        self.shown.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shown.is_empty()
    }

    pub fn clear(&mut self) {
        self.shown.clear();
    }
}
