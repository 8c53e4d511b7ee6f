//! Completion deadline policy
//!
//! Completion is driven by counting `Done` markers. The deadline computed here
//! is only the safety net that turns a stuck run into a `TimedOut` outcome.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How long the coordinator waits before giving up on outstanding units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeoutPolicy {
    /// Fixed wait, regardless of problem size
    Fixed(Duration),
    /// `base + n * per_candidate + units * per_unit`, capped at `max`
    Scaled {
        base: Duration,
        per_candidate: Duration,
        per_unit: Duration,
        max: Duration,
    },
}

impl Default for TimeoutPolicy {
    /// Generous scaling: 1µs per candidate is orders of magnitude above the
    /// measured evaluation cost, so only a stuck run reaches the deadline.
    fn default() -> Self {
        Self::Scaled {
            base: Duration::from_secs(10),
            per_candidate: Duration::from_micros(1),
            per_unit: Duration::from_millis(1),
            max: Duration::from_secs(24 * 3600),
        }
    }
}

impl TimeoutPolicy {
    /// Maximum wait for a search over `n` candidates split into `units` units
    ///
    /// # Examples
    ///
    /// ```
    /// use sqsearch::coordinator::policy::TimeoutPolicy;
    /// use std::time::Duration;
    ///
    /// let fixed = TimeoutPolicy::Fixed(Duration::from_secs(5));
    /// assert_eq!(fixed.deadline_for(1_000_000, 8), Duration::from_secs(5));
    ///
    /// let scaled = TimeoutPolicy::default();
    /// assert!(scaled.deadline_for(1_000_000, 8) > scaled.deadline_for(1_000, 8));
    /// ```
    pub fn deadline_for(&self, n: u64, units: usize) -> Duration {
        match *self {
            TimeoutPolicy::Fixed(d) => d,
            TimeoutPolicy::Scaled {
                base,
                per_candidate,
                per_unit,
                max,
            } => {
                let total = base
                    .as_nanos()
                    .saturating_add(per_candidate.as_nanos().saturating_mul(u128::from(n)))
                    .saturating_add(per_unit.as_nanos().saturating_mul(units as u128))
                    .min(max.as_nanos());
                // Bounded by `max`, which is itself a valid Duration
                Duration::new(
                    (total / 1_000_000_000) as u64,
                    (total % 1_000_000_000) as u32,
                )
            }
        }
    }
}
