/// Bounded retry schedule for reconnecting transports
///
/// Attempts are numbered from 1. `delay_for(n)` returns the wait before
/// attempt `n`, or `None` once `n` exceeds `max_attempts`.
use std::time::Duration;
use tracing::debug;

/// How the delay grows between consecutive attempts
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BackoffGrowth {
    /// `base * attempt`
    Linear,
    /// `base * multiplier^(attempt - 1)`
    Exponential { multiplier: f64 },
}

#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of automatic attempts before giving up
    pub max_attempts: u32,
    /// Delay unit for the first attempt
    pub base_interval: Duration,
    /// Upper bound applied to every computed delay
    pub max_backoff: Duration,
    /// Growth curve
    pub growth: BackoffGrowth,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_interval: Duration::from_secs(3),
            max_backoff: Duration::from_secs(60),
            growth: BackoffGrowth::Linear,
        }
    }
}

impl RetryConfig {
    /// Linear schedule with the given bound and base interval
    pub fn linear(max_attempts: u32, base_interval: Duration) -> Self {
        Self {
            max_attempts,
            base_interval,
            ..Default::default()
        }
    }

    /// Whether another attempt may be scheduled after `attempts_so_far` attempts
    pub fn allows(&self, attempts_so_far: u32) -> bool {
        attempts_so_far < self.max_attempts
    }

    /// Delay before attempt `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt > self.max_attempts {
            return None;
        }

        let base_ms = self.base_interval.as_millis() as f64;
        let raw_ms = match self.growth {
            BackoffGrowth::Linear => base_ms * attempt as f64,
            BackoffGrowth::Exponential { multiplier } => {
                base_ms * multiplier.max(1.0).powi(attempt as i32 - 1)
            }
        };

        let delay = Duration::from_millis(raw_ms.min(self.max_backoff.as_millis() as f64) as u64);
        debug!("Backoff for attempt {}/{}: {:?}", attempt, self.max_attempts, delay);
        Some(delay)
    }

    /// The full schedule, one entry per permitted attempt
    pub fn schedule(&self) -> Vec<Duration> {
        (1..=self.max_attempts)
            .filter_map(|attempt| self.delay_for(attempt))
            .collect()
    }
}
