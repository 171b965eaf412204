/// Preset configurations for the notification sync channels
use crate::retry::{BackoffGrowth, RetryConfig};
use crate::timeout::TimeoutConfig;
use std::time::Duration;

/// Configuration bundle for a remote channel
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub timeout: TimeoutConfig,
    pub retry: Option<RetryConfig>,
}

/// Persistent push channel (WebSocket)
///
/// - Timeout: 10s for the opening handshake
/// - Retry: 5 attempts, linear 3s/6s/9s/12s/15s
pub fn push_channel_config() -> ServiceConfig {
    ServiceConfig {
        timeout: TimeoutConfig {
            duration: Duration::from_secs(10),
        },
        retry: Some(RetryConfig {
            max_attempts: 5,
            base_interval: Duration::from_secs(3),
            max_backoff: Duration::from_secs(60),
            growth: BackoffGrowth::Linear,
        }),
    }
}

/// Notification REST API (snapshot, mark-read, dismiss)
///
/// - Timeout: 10s
/// - No retry (optimistic local state is kept, failures are only logged)
pub fn rest_api_config() -> ServiceConfig {
    ServiceConfig {
        timeout: TimeoutConfig {
            duration: Duration::from_secs(10),
        },
        retry: None,
    }
}
