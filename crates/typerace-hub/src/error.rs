//! Error types for the hub.

use typerace_protocol::{Identity, RoomCode};
use typerace_store::StoreError;

use crate::Stage;

/// Why a join was refused.
///
/// Every variant maps to the close reason the client sees
/// ([`close_reason`](Self::close_reason)). A refused join registers
/// nothing.
#[derive(Debug, thiserror::Error)]
pub enum JoinError {
    /// The room code or the username was empty.
    #[error("missing room code or username")]
    MissingParameters,

    /// The store has no room with this code.
    #[error("room {0} not found")]
    RoomNotFound(RoomCode),

    /// Someone with this username is already in the room.
    #[error("{0} is already connected to room {1}")]
    DuplicateIdentity(Identity, RoomCode),

    /// The room already has two participants.
    #[error("room {0} is full")]
    RoomFull(RoomCode),

    /// The room's race is over (or was abandoned) and it is about to be
    /// torn down.
    #[error("room {0} is closing")]
    RoomClosed(RoomCode),

    /// The room lookup itself failed.
    #[error("room lookup failed: {0}")]
    Store(#[source] StoreError),
}

impl JoinError {
    /// The diagnostic string sent in the WebSocket close frame.
    pub fn close_reason(&self) -> &'static str {
        match self {
            Self::MissingParameters => "Missing room_code or username",
            Self::RoomNotFound(_) => "Room not found",
            Self::DuplicateIdentity(..) => "Username already connected",
            Self::RoomFull(_) => "Room is full",
            Self::RoomClosed(_) => "Race already finished",
            Self::Store(_) => "Room lookup failed",
        }
    }
}

/// Errors from hub operations other than join.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// No live session for this room code.
    #[error("no live session for room {0}")]
    SessionNotFound(RoomCode),

    /// The session is not in a stage that allows this operation.
    #[error("room {0} is {1}")]
    InvalidStage(RoomCode, Stage),

    /// A store call failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Why one frame could not be delivered to one participant.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// The participant's connection is gone.
    #[error("recipient closed")]
    Closed,

    /// Writing to the connection failed.
    #[error("delivery failed: {0}")]
    Failed(String),

    /// The write did not finish within the send timeout.
    #[error("delivery timed out")]
    TimedOut,
}
