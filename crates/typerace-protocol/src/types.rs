//! Core protocol types for Typerace's wire format.
//!
//! Every frame, in either direction, is a JSON object of the shape
//! `{ "type": <string>, "payload": <type-dependent> }`.

use std::collections::BTreeMap;
use std::fmt;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use crate::{Codec, ProtocolError};

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// The username a participant joins a room under.
///
/// Unique within a room; the same identity may race in different rooms.
/// Ordered lexicographically, which is what makes [`StatsMap`] iteration
/// deterministic.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// Wraps a username.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// The username as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Identity {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for Identity {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// The short code a room is addressed by (e.g. `"482913"`).
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct RoomCode(String);

impl RoomCode {
    /// Wraps a room code.
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    /// The code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RoomCode {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

impl From<String> for RoomCode {
    fn from(s: String) -> Self {
        Self(s)
    }
}

// ---------------------------------------------------------------------------
// PlayerStats
// ---------------------------------------------------------------------------

/// One participant's latest self-reported progress.
///
/// Each report replaces the previous one wholesale; the hub never merges
/// fields from two reports.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlayerStats {
    /// Words per minute.
    pub wpm: u32,
    /// Fraction of correctly typed characters, `0.0..=1.0`.
    pub accuracy: f64,
    /// Error metric; lower is better. Sent as `errors` on the wire.
    #[serde(rename = "errors")]
    pub error: f64,
}

impl PlayerStats {
    /// Checks that the reported values are in range.
    ///
    /// # Errors
    /// Returns `ProtocolError::InvalidMessage` if `accuracy` is outside
    /// `0.0..=1.0` or `error` is negative or not finite.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if !(0.0..=1.0).contains(&self.accuracy) {
            return Err(ProtocolError::InvalidMessage(format!(
                "accuracy {} out of range",
                self.accuracy
            )));
        }
        if !self.error.is_finite() || self.error < 0.0 {
            return Err(ProtocolError::InvalidMessage(format!(
                "error metric {} out of range",
                self.error
            )));
        }
        Ok(())
    }
}

/// Latest stats per participant, keyed and ordered by identity.
pub type StatsMap = BTreeMap<Identity, PlayerStats>;

// ---------------------------------------------------------------------------
// ServerEvent
// ---------------------------------------------------------------------------

/// Final outcome of a race.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameOver {
    /// The winning identity, or `null` when nobody reported stats.
    pub winner: Option<Identity>,
    /// Every participant's final stats.
    pub stats: StatsMap,
    /// Why the race ended early, if it did (e.g. `"opponent left"`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Events the hub pushes to participants.
///
/// Every event is written as a full envelope, payload key included:
///   `{ "type": "countdown", "payload": { "seconds": 3 } }`
///   `{ "type": "start", "payload": null }`
///
/// Decoding goes through the adjacently tagged derive, which accepts
/// `start` with a `null` payload or none at all.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Current membership, in join order.
    PlayerList(Vec<Identity>),
    /// Whole time units left before the race starts.
    Countdown { seconds: u64 },
    /// The race is underway.
    Start,
    /// Latest stats of the participants that changed.
    StatsUpdate(StatsMap),
    /// The race is over.
    GameOver(GameOver),
}

impl ServerEvent {
    /// The wire `type` string of this event.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::PlayerList(_) => "player_list",
            Self::Countdown { .. } => "countdown",
            Self::Start => "start",
            Self::StatsUpdate(_) => "stats_update",
            Self::GameOver(_) => "game_over",
        }
    }
}

impl Serialize for ServerEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        struct Seconds {
            seconds: u64,
        }

        let mut frame = serializer.serialize_struct("ServerEvent", 2)?;
        frame.serialize_field("type", self.kind())?;
        match self {
            Self::PlayerList(roster) => frame.serialize_field("payload", roster)?,
            Self::Countdown { seconds } => {
                frame.serialize_field("payload", &Seconds { seconds: *seconds })?
            }
            Self::Start => frame.serialize_field("payload", &())?,
            Self::StatsUpdate(stats) => frame.serialize_field("payload", stats)?,
            Self::GameOver(over) => frame.serialize_field("payload", over)?,
        }
        frame.end()
    }
}

// ---------------------------------------------------------------------------
// Envelope and ClientMessage
// ---------------------------------------------------------------------------

/// A typed `{ "type", "payload" }` frame.
///
/// Used to decode client frames once the `type` is known to be one the
/// hub understands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<P> {
    #[serde(rename = "type")]
    pub kind: String,
    pub payload: P,
}

#[derive(Deserialize)]
struct Tag {
    #[serde(rename = "type")]
    kind: String,
}

/// Messages a participant can send.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    /// A progress report.
    StatsUpdate(PlayerStats),
    /// A well-formed frame with a `type` the hub does not handle. Ignored,
    /// but the connection stays open.
    Unknown(String),
}

impl ClientMessage {
    /// Decodes one client frame.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the frame has no `type` or its
    /// payload has the wrong shape, and `ProtocolError::InvalidMessage` if
    /// a `stats_update` carries out-of-range values.
    pub fn decode<C: Codec>(
        codec: &C,
        data: &[u8],
    ) -> Result<Self, ProtocolError> {
        let tag: Tag = codec.decode(data)?;
        match tag.kind.as_str() {
            "stats_update" => {
                let envelope: Envelope<PlayerStats> = codec.decode(data)?;
                envelope.payload.validate()?;
                Ok(Self::StatsUpdate(envelope.payload))
            }
            _ => Ok(Self::Unknown(tag.kind)),
        }
    }
}

// =========================================================================
// Tests
// =========================================================================
