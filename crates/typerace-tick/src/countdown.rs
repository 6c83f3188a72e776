//! Deadline-aligned countdown ticker.

use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::{trace, warn};

/// Counts whole time units down to a fixed deadline.
///
/// The remaining value is always derived from the deadline, never from a
/// decrementing counter, so a countdown created later for the same
/// deadline reports the same value as the original one.
///
/// Remaining units are rounded up: with 2.3 units left the countdown
/// reports 3, and it reports 0 only once the deadline has passed.
#[derive(Debug, Clone)]
pub struct Countdown {
    deadline: Instant,
    unit: Duration,
}

impl Countdown {
    /// Smallest accepted time unit.
    pub const MIN_UNIT: Duration = Duration::from_millis(1);

    /// Creates a countdown to `deadline`, ticking every `unit`.
    ///
    /// A `unit` below [`Self::MIN_UNIT`] is clamped.
    pub fn new(deadline: Instant, unit: Duration) -> Self {
        let unit = if unit < Self::MIN_UNIT {
            warn!(?unit, "countdown unit too small, clamping");
            Self::MIN_UNIT
        } else {
            unit
        };
        Self { deadline, unit }
    }

    /// Creates a countdown of `units` whole units starting now.
    pub fn starting_now(units: u32, unit: Duration) -> Self {
        let countdown = Self::new(Instant::now(), unit);
        let deadline = countdown.deadline + countdown.unit.saturating_mul(units);
        Self { deadline, ..countdown }
    }

    /// The instant this countdown reaches zero.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// The length of one tick.
    pub fn unit(&self) -> Duration {
        self.unit
    }

    /// Whole units remaining at `now`, rounded up.
    pub fn remaining_at(&self, now: Instant) -> u64 {
        let left = self.deadline.saturating_duration_since(now).as_nanos();
        let unit = self.unit.as_nanos();
        let units = left.div_ceil(unit);
        u64::try_from(units).unwrap_or(u64::MAX)
    }

    /// Whole units remaining right now.
    pub fn remaining(&self) -> u64 {
        self.remaining_at(Instant::now())
    }

    /// Returns `true` once the deadline has passed.
    pub fn is_expired(&self) -> bool {
        self.remaining() == 0
    }

    /// Sleeps until the remaining value drops by one, then returns it.
    ///
    /// Boundaries are aligned to the deadline, not to when `tick` was
    /// called, so a late first call does not shift later ticks. Returns
    /// `0` immediately if the deadline has already passed.
    pub async fn tick(&mut self) -> u64 {
        let remaining = self.remaining();
        if remaining == 0 {
            return 0;
        }
        let steps_left = u32::try_from(remaining - 1).unwrap_or(u32::MAX);
        let boundary = self
            .deadline
            .checked_sub(self.unit.saturating_mul(steps_left))
            .unwrap_or(self.deadline);
        time::sleep_until(boundary).await;
        let now_remaining = self.remaining();
        trace!(remaining = now_remaining, "countdown tick");
        now_remaining
    }
}
