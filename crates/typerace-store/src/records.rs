//! Persisted record types.

use std::fmt;

use typerace_protocol::{Identity, RoomCode};

/// Primary key of a persisted room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomId(pub u64);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "room#{}", self.0)
    }
}

/// Primary key of a persisted user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId(pub u64);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "user#{}", self.0)
    }
}

/// Where a persisted room is in its life.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RoomStatus {
    /// Created, waiting for an opponent.
    #[default]
    Waiting,
    /// Both players known.
    Ready,
    /// Race underway.
    InProgress,
    /// A winner has been recorded.
    Completed,
}

/// A room as the persistent store knows it.
#[derive(Debug, Clone, PartialEq)]
pub struct RoomRecord {
    pub id: RoomId,
    pub code: RoomCode,
    /// The user who created the room.
    pub creator: UserId,
    pub opponent: Option<UserId>,
    /// The passage both players type.
    pub prompt: String,
    pub status: RoomStatus,
    pub winner: Option<UserId>,
}

/// A registered user.
#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub id: UserId,
    /// The identity the user joins rooms under.
    pub username: Identity,
    /// Display name.
    pub name: String,
}

/// One participant's outcome of one race.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchResult {
    pub room: RoomId,
    pub participant: UserId,
    /// `None` if the other participant could not be resolved to a user.
    pub opponent: Option<UserId>,
    pub won: bool,
    pub wpm: u32,
    pub accuracy: f64,
    pub error: f64,
}
