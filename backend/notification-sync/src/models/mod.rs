use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Server-assigned notification identifier
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(transparent)]
pub struct NotificationId(pub i64);

impl std::fmt::Display for NotificationId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for NotificationId {
    fn from(id: i64) -> Self {
        NotificationId(id)
    }
}

/// Notification priority level
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum NotificationPriority {
    Low,
    #[default]
    Medium,
    High,
    Urgent,
}

impl NotificationPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationPriority::Low => "low",
            NotificationPriority::Medium => "medium",
            NotificationPriority::High => "high",
            NotificationPriority::Urgent => "urgent",
        }
    }
}

/// Symbolic icon sent by the server
///
/// Unknown identifiers fall back to `Bell`.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(from = "String", into = "String")]
pub enum NotificationIcon {
    /// Driving school registration
    BuildingOffice,
    /// Payment received
    CreditCard,
    /// Plan upgrade request
    ArrowUp,
    /// Contact form submission
    Envelope,
    /// System alert
    ExclamationTriangle,
    #[default]
    Bell,
}

impl NotificationIcon {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationIcon::BuildingOffice => "BuildingOfficeIcon",
            NotificationIcon::CreditCard => "CreditCardIcon",
            NotificationIcon::ArrowUp => "ArrowUpIcon",
            NotificationIcon::Envelope => "EnvelopeIcon",
            NotificationIcon::ExclamationTriangle => "ExclamationTriangleIcon",
            NotificationIcon::Bell => "BellIcon",
        }
    }

    pub fn parse(name: &str) -> Self {
        match name {
            "BuildingOfficeIcon" => NotificationIcon::BuildingOffice,
            "CreditCardIcon" => NotificationIcon::CreditCard,
            "ArrowUpIcon" => NotificationIcon::ArrowUp,
            "EnvelopeIcon" => NotificationIcon::Envelope,
            "ExclamationTriangleIcon" => NotificationIcon::ExclamationTriangle,
            _ => NotificationIcon::Bell,
        }
    }
}

impl From<String> for NotificationIcon {
    fn from(name: String) -> Self {
        NotificationIcon::parse(&name)
    }
}

impl From<NotificationIcon> for String {
    fn from(icon: NotificationIcon) -> Self {
        icon.as_str().to_string()
    }
}

/// Core notification model
///
/// Content is immutable once issued by the server; only the read and
/// dismissed flags change locally.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Notification {
    pub id: NotificationId,

    /// Server-side category, e.g. `payment_received`
    #[serde(rename = "type", alias = "notification_type")]
    pub notification_type: String,

    pub title: String,

    pub message: String,

    #[serde(default)]
    pub icon: NotificationIcon,

    #[serde(default)]
    pub priority: NotificationPriority,

    pub created_at: DateTime<Utc>,

    #[serde(default)]
    pub is_read: bool,

    #[serde(default)]
    pub is_dismissed: bool,

    /// Set locally when the notification is marked read
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_at: Option<DateTime<Utc>>,

    /// Lookup keys only, never dereferenced by the sync core
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_driving_school_id: Option<Uuid>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_payment_id: Option<Uuid>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_user_id: Option<i64>,
}

impl Notification {
    /// Create an unread notification stamped with the current time
    pub fn new(
        id: impl Into<NotificationId>,
        notification_type: impl Into<String>,
        title: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            notification_type: notification_type.into(),
            title: title.into(),
            message: message.into(),
            icon: NotificationIcon::default(),
            priority: NotificationPriority::default(),
            created_at: Utc::now(),
            is_read: false,
            is_dismissed: false,
            read_at: None,
            related_driving_school_id: None,
            related_payment_id: None,
            related_user_id: None,
        }
    }

    /// Counts toward the unread badge
    pub fn is_unread(&self) -> bool {
        !self.is_read && !self.is_dismissed
    }

    pub fn mark_read(&mut self) {
        if !self.is_read {
            self.is_read = true;
            self.read_at = Some(Utc::now());
        }
    }
}

/// One page of the notification list endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NotificationPage {
    Paginated {
        results: Vec<Notification>,
        #[serde(default)]
        count: Option<u64>,
        #[serde(default)]
        next: Option<String>,
    },
    Plain(Vec<Notification>),
}

impl NotificationPage {
    pub fn into_results(self) -> Vec<Notification> {
        match self {
            NotificationPage::Paginated { results, .. } => results,
            NotificationPage::Plain(results) => results,
        }
    }
}
