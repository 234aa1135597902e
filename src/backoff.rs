//! Poll interval and deadline policy for asynchronous asset processing

use std::time::Duration;
use log::trace;

/// Bounded polling schedule: fixed interval when `multiplier` is 1.0,
/// exponential otherwise, never longer than `max_interval` per step.
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy
{   pub interval: Duration
  , pub multiplier: f32
  , pub max_interval: Duration
  , /// Total time allowed before giving up
    pub max_wait: Duration
}

impl PollPolicy
{   /// Create a new poll policy
    pub fn new(
      interval_ms: u64
    , multiplier: f32
    , max_interval_ms: u64
    , max_wait_ms: u64
    ) -> Self
    {   PollPolicy
        {   interval: Duration::from_millis(interval_ms)
          , multiplier: multiplier.max(1.0)
          , max_interval: Duration::from_millis(
              max_interval_ms.max(interval_ms)
            )
          , max_wait: Duration::from_millis(max_wait_ms)
        }
    }

    /// Delay to wait after the given (zero-based) poll attempt
    pub fn backoff_for_attempt(
      &self
    , attempt: usize
    ) -> Duration
    {   trace!("Calculating poll delay for attempt {}", attempt);
        let multiplier
          = self.multiplier.powi(attempt.min(32) as i32);
        let millis
          = (self.interval.as_millis() as f32 * multiplier) as u64;
        Duration::from_millis(millis).min(self.max_interval)
    }
}

impl Default for PollPolicy
{   fn default() -> Self
    {   PollPolicy::new(500, 1.0, 5_000, 60_000)
    }
}

impl From<&crate::config::UploadConfig> for PollPolicy
{   fn from(config: &crate::config::UploadConfig) -> Self
    {   PollPolicy::new(
          config.poll_interval_ms
        , config.poll_backoff_multiplier
        , config.max_poll_interval_ms
        , config.max_wait_ms
        )
    }
}
