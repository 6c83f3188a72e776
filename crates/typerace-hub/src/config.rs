//! Hub configuration and the session stage machine.

use std::fmt;
use std::time::Duration;

// ---------------------------------------------------------------------------
// HubConfig
// ---------------------------------------------------------------------------

/// Timing and delivery settings for a [`Hub`](crate::Hub).
///
/// Durations are expressed in whole *time units* so tests can shrink the
/// unit and keep the same shape of race.
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Length of the pre-race countdown, in time units.
    pub countdown_units: u32,

    /// Length of the race, in time units.
    pub race_units: u32,

    /// Wait between the game-over broadcast and session teardown, in
    /// time units.
    pub grace_units: u32,

    /// Length of one time unit.
    pub time_unit: Duration,

    /// How often the reaper sweeps for empty sessions.
    pub reaper_interval: Duration,

    /// How long one frame may take to reach one participant before it
    /// is dropped for that participant.
    pub send_timeout: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            countdown_units: 20,
            race_units: 15,
            grace_units: 5,
            time_unit: Duration::from_secs(1),
            reaper_interval: Duration::from_secs(120),
            send_timeout: Duration::from_secs(5),
        }
    }
}

impl HubConfig {
    /// Participants per room.
    pub const CAPACITY: usize = 2;

    /// Total race length.
    pub fn race_duration(&self) -> Duration {
        self.time_unit.saturating_mul(self.race_units)
    }

    /// Total grace delay before teardown.
    pub fn grace_delay(&self) -> Duration {
        self.time_unit.saturating_mul(self.grace_units)
    }
}

// ---------------------------------------------------------------------------
// Stage
// ---------------------------------------------------------------------------

/// Where a session is in its race.
///
/// ```text
/// Waiting → Countdown → Racing → Finished
///    ▲          │          │
///    └──────────┴──────────┘  (participant count drops below 2)
/// ```
///
/// A race that loses a participant is aborted: the session goes back to
/// `Waiting` but is marked closing and never counts down again.
/// `Finished` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Stage {
    #[default]
    Waiting,
    Countdown,
    Racing,
    Finished,
}

impl Stage {
    /// Returns `true` if a race timer or countdown is running.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Countdown | Self::Racing)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Waiting => write!(f, "waiting"),
            Self::Countdown => write!(f, "countdown"),
            Self::Racing => write!(f, "racing"),
            Self::Finished => write!(f, "finished"),
        }
    }
}
