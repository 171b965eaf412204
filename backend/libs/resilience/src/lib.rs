/// Resilience patterns for long-lived client connections
///
/// This library provides the recovery primitives shared by the notification
/// sync core:
/// - **Retry**: bounded reconnection schedule with linear (default) or exponential growth
/// - **Timeout**: time limits on remote calls that keep the underlying error
/// - **Preset Configurations**: pre-tuned settings for the push channel and the REST API
///
/// # Example: Reconnection Schedule
///
/// ```rust
/// use resilience::presets;
/// use std::time::Duration;
///
/// let retry = presets::push_channel_config().retry.unwrap_or_default();
/// assert_eq!(retry.delay_for(2), Some(Duration::from_secs(6)));
/// assert_eq!(retry.delay_for(6), None);
/// ```
///
/// # Example: REST Call with Timeout
///
/// ```rust,no_run
/// use resilience::{presets, timeout::with_timeout_result};
///
/// #[tokio::main]
/// async fn main() {
///     let config = presets::rest_api_config();
///
///     let result = with_timeout_result(config.timeout.duration, async {
///         // Your HTTP request
///         Ok::<_, String>(())
///     })
///     .await;
/// }
/// ```

pub mod presets;
pub mod retry;
pub mod timeout;

// Re-export main types for convenience
pub use presets::{push_channel_config, rest_api_config, ServiceConfig};
pub use retry::{BackoffGrowth, RetryConfig};
pub use timeout::{with_timeout_result, TimeoutConfig, TimeoutError};
