//! Error types for the store layer.

/// Errors returned by a [`RoomStore`](crate::RoomStore).
///
/// The hub treats every store call as independently fallible: a failed
/// write is logged and the race still ends normally.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No room has this code.
    #[error("room {0} not found")]
    RoomNotFound(typerace_protocol::RoomCode),

    /// No room has this id (it may already have been deleted).
    #[error("room id {0} not found")]
    RoomIdNotFound(crate::RoomId),

    /// No user has this username.
    #[error("user {0} not found")]
    UserNotFound(typerace_protocol::Identity),

    /// A user with this username already exists.
    #[error("username {0} is taken")]
    UsernameTaken(typerace_protocol::Identity),

    /// The backing store could not serve the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}
