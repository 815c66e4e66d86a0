/*!
 * Timeout Policies
 *
 * Bounds for the blocking waits in this crate:
 *
 * - **Race**: how long a race may wait for a qualifying result
 * - **Item**: how long a single harness work item may run
 * - **Custom**: user-defined
 *
 * A `None` policy waits forever and should only be used where the
 * producers are already bounded some other way (e.g. `max_attempts`).
 */

use std::future::Future;
use std::time::{Duration, Instant};

/// Timeout policy for blocking operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeoutPolicy {
    /// No timeout (infinite wait) - use sparingly!
    #[default]
    None,

    /// Race selection deadline
    Race(Duration),

    /// Harness work item deadline
    Item(Duration),

    /// Custom timeout
    Custom(Duration),
}

impl TimeoutPolicy {
    /// Default race deadline: 30s
    pub const fn default_race() -> Self {
        Self::Race(Duration::from_secs(30))
    }

    /// Build a race policy from milliseconds, `0` meaning no deadline
    pub const fn race_from_millis(ms: u64) -> Self {
        if ms == 0 {
            Self::None
        } else {
            Self::Race(Duration::from_millis(ms))
        }
    }

    /// Build an item policy from milliseconds, `0` meaning no deadline
    pub const fn item_from_millis(ms: u64) -> Self {
        if ms == 0 {
            Self::None
        } else {
            Self::Item(Duration::from_millis(ms))
        }
    }

    /// Get the duration for this policy
    pub fn duration(&self) -> Option<Duration> {
        match self {
            Self::None => None,
            Self::Race(d) | Self::Item(d) | Self::Custom(d) => Some(*d),
        }
    }

    /// Drive `future` under this policy
    ///
    /// Returns `Err(elapsed)` if the deadline passed before the future resolved.
    pub async fn apply<F>(self, future: F) -> Result<F::Output, Duration>
    where
        F: Future,
    {
        match self.duration() {
            None => Ok(future.await),
            Some(duration) => {
                let start = Instant::now();
                tokio::time::timeout(duration, future)
                    .await
                    .map_err(|_| start.elapsed())
            }
        }
    }
}
