/// Push channel frame types
use crate::error::Result;
use crate::models::Notification;
use serde::{Deserialize, Serialize};

/// Event types emitted by the notification push endpoints
pub mod event_types {
    pub const ADMIN_NOTIFICATION: &str = "admin_notification";
    pub const NOTIFICATION_CREATED: &str = "notification_created";
    pub const CONNECTION_ESTABLISHED: &str = "connection_established";
    pub const PONG: &str = "pong";
    pub const ERROR: &str = "error";
}

/// Inbound frame from the server
///
/// `event_type` is open-ended; dispatch happens on its string value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PushFrame {
    #[serde(rename = "type")]
    pub event_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notification: Option<Notification>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    /// Free-form text carried by `error` and `connection_established` frames
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl PushFrame {
    pub fn notification(event_type: impl Into<String>, notification: Notification) -> Self {
        PushFrame {
            event_type: event_type.into(),
            notification: Some(notification),
            timestamp: Some(chrono::Utc::now().to_rfc3339()),
            message: None,
        }
    }

    /// Decode a text payload received on the socket
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// Outbound frame sent by the client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Keep-alive so intermediaries do not close an idle connection
    Ping { timestamp: String },
}

impl ClientFrame {
    pub fn ping() -> Self {
        ClientFrame::Ping {
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NotificationId;

    #[test]
    fn test_decode_notification_frame() {
        let json = r#"{
            "type": "admin_notification",
            "notification": {
                "id": 5,
                "type": "driving_school_registration",
                "title": "Nouvelle auto-école",
                "message": "Auto-école du Lac vient de s'inscrire",
                "priority": "medium",
                "icon": "BuildingOfficeIcon",
                "created_at": "2024-05-01T10:00:00Z"
            }
        }"#;

        let frame = PushFrame::from_json(json).unwrap();

        assert_eq!(frame.event_type, event_types::ADMIN_NOTIFICATION);
        assert_eq!(frame.notification.unwrap().id, NotificationId(5));
        assert!(frame.timestamp.is_none());
    }

    #[test]
    fn test_decode_control_frame() {
        let frame = PushFrame::from_json(
            r#"{"type":"pong","timestamp":"2024-05-01T10:00:00+00:00"}"#,
        )
        .unwrap();

        assert_eq!(frame.event_type, event_types::PONG);
        assert!(frame.notification.is_none());
        assert!(frame.timestamp.is_some());
    }

    #[test]
    fn test_malformed_frames_are_protocol_errors() {
        for payload in ["not json", r#"{"notification":null}"#, r#"{"type":42}"#] {
            let result = PushFrame::from_json(payload);
            assert!(
                matches!(result, Err(crate::error::SyncError::Protocol(_))),
                "payload {:?} should be rejected",
                payload
            );
        }
    }

    #[test]
    fn test_ping_frame_shape() {
        let json = ClientFrame::ping().to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["type"], "ping");
        assert!(chrono::DateTime::parse_from_rfc3339(value["timestamp"].as_str().unwrap()).is_ok());
    }
}
