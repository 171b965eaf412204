/// REST surface of the notification backend
pub mod client;

pub use client::HttpNotificationApi;

use crate::error::Result;
use crate::models::{Notification, NotificationId};
use async_trait::async_trait;
use serde::Serialize;

/// Optional server-side filters for the list endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ListFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_read: Option<bool>,

    /// Server-side category, e.g. `payment_received`
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub notification_type: Option<String>,
}

impl ListFilter {
    pub fn unread() -> Self {
        ListFilter {
            is_read: Some(false),
            ..Default::default()
        }
    }

    pub fn of_type(mut self, notification_type: impl Into<String>) -> Self {
        self.notification_type = Some(notification_type.into());
        self
    }
}

/// Remote notification operations used by the reconciliation engine
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationApi: Send + Sync {
    /// Fetch one page, newest first
    async fn list(&self, page: u32, filter: ListFilter) -> Result<Vec<Notification>>;

    async fn mark_read(&self, id: NotificationId) -> Result<()>;

    async fn mark_all_read(&self) -> Result<()>;

    async fn dismiss(&self, id: NotificationId) -> Result<()>;
}
