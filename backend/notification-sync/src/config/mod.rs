use crate::error::{Result, SyncError};
use crate::websocket::messages::event_types;
use resilience::{presets, BackoffGrowth, RetryConfig};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub push: PushConfig,
    pub api: ApiConfig,
    pub session: SessionConfig,
}

#[derive(Debug, Clone)]
pub struct PushConfig {
    /// Fixed push endpoint
    pub url: String,
    /// Ping cadence while connected
    pub heartbeat_interval: Duration,
    /// Opening handshake limit
    pub handshake_timeout: Duration,
    /// Bounded reconnection schedule
    pub retry: RetryConfig,
    /// Event types carrying a notification payload
    pub notification_events: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Base URL the `/notifications/` routes hang off
    pub base_url: String,
    /// Authorization scheme prefixed to the session token
    pub auth_scheme: String,
    pub request_timeout: Duration,
    pub page_size: u32,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Environment variable holding the session token
    pub token_env: String,
    /// Persisted token file, checked when the variable is unset
    pub token_file: Option<PathBuf>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        let push_preset = presets::push_channel_config();
        let api_preset = presets::rest_api_config();

        SyncConfig {
            push: PushConfig {
                url: "ws://127.0.0.1:8000/ws/admin-notifications/".to_string(),
                heartbeat_interval: Duration::from_secs(30),
                handshake_timeout: push_preset.timeout.duration,
                retry: push_preset.retry.unwrap_or_default(),
                notification_events: vec![
                    event_types::ADMIN_NOTIFICATION.to_string(),
                    event_types::NOTIFICATION_CREATED.to_string(),
                ],
            },
            api: ApiConfig {
                base_url: "http://127.0.0.1:8000/api/admin".to_string(),
                auth_scheme: "AdminSession".to_string(),
                request_timeout: api_preset.timeout.duration,
                page_size: 20,
            },
            session: SessionConfig {
                token_env: "NOTIFY_SESSION_TOKEN".to_string(),
                token_file: None,
            },
        }
    }
}

impl SyncConfig {
    pub fn from_env() -> Result<Self> {
        let defaults = SyncConfig::default();

        let growth = match std::env::var("NOTIFY_RECONNECT_GROWTH")
            .unwrap_or_else(|_| "linear".to_string())
            .as_str()
        {
            "linear" => BackoffGrowth::Linear,
            "exponential" => BackoffGrowth::Exponential { multiplier: 2.0 },
            other => {
                return Err(SyncError::Config(format!(
                    "NOTIFY_RECONNECT_GROWTH must be linear or exponential, got {}",
                    other
                )))
            }
        };

        let config = SyncConfig {
            push: PushConfig {
                url: std::env::var("NOTIFY_PUSH_URL").unwrap_or(defaults.push.url),
                heartbeat_interval: Duration::from_secs(env_parse(
                    "NOTIFY_HEARTBEAT_SECS",
                    defaults.push.heartbeat_interval.as_secs(),
                )?),
                handshake_timeout: Duration::from_secs(env_parse(
                    "NOTIFY_HANDSHAKE_TIMEOUT_SECS",
                    defaults.push.handshake_timeout.as_secs(),
                )?),
                retry: RetryConfig {
                    max_attempts: env_parse(
                        "NOTIFY_RECONNECT_MAX_ATTEMPTS",
                        defaults.push.retry.max_attempts,
                    )?,
                    base_interval: Duration::from_millis(env_parse(
                        "NOTIFY_RECONNECT_BASE_MS",
                        defaults.push.retry.base_interval.as_millis() as u64,
                    )?),
                    growth,
                    ..defaults.push.retry
                },
                notification_events: std::env::var("NOTIFY_EVENT_TYPES")
                    .map(|v| {
                        v.split(',')
                            .map(|s| s.trim().to_string())
                            .filter(|s| !s.is_empty())
                            .collect()
                    })
                    .unwrap_or(defaults.push.notification_events),
            },
            api: ApiConfig {
                base_url: std::env::var("NOTIFY_API_BASE_URL").unwrap_or(defaults.api.base_url),
                auth_scheme: std::env::var("NOTIFY_AUTH_SCHEME")
                    .unwrap_or(defaults.api.auth_scheme),
                request_timeout: Duration::from_secs(env_parse(
                    "NOTIFY_REQUEST_TIMEOUT_SECS",
                    defaults.api.request_timeout.as_secs(),
                )?),
                page_size: env_parse("NOTIFY_PAGE_SIZE", defaults.api.page_size)?,
            },
            session: SessionConfig {
                token_env: std::env::var("NOTIFY_TOKEN_ENV").unwrap_or(defaults.session.token_env),
                token_file: std::env::var("NOTIFY_TOKEN_FILE").ok().map(PathBuf::from),
            },
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.push.heartbeat_interval.is_zero() {
            return Err(SyncError::Config("heartbeat interval must be non-zero".to_string()));
        }
        if self.push.notification_events.is_empty() {
            return Err(SyncError::Config("at least one notification event type is required".to_string()));
        }
        if self.api.page_size == 0 || self.api.page_size > 100 {
            return Err(SyncError::Config(format!(
                "page size must be between 1 and 100, got {}",
                self.api.page_size
            )));
        }
        Ok(())
    }
}

fn env_parse<T>(var: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| SyncError::Config(format!("{}={:?}: {}", var, raw, e))),
        Err(_) => Ok(default),
    }
}
