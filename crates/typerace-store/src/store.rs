//! The persistence boundary the hub depends on.
//!
//! Typerace doesn't care where rooms and users live (a SQL database, a
//! remote API, memory). It only needs the five calls on [`RoomStore`].
//! The server is generic over the store, so tests can plug in a store
//! that fails on purpose.

use std::future::Future;

use typerace_protocol::{Identity, RoomCode};

use crate::{MatchResult, RoomId, RoomRecord, StoreError, UserId, UserRecord};

/// Looks up rooms and users and records race outcomes.
///
/// - `Send + Sync` because the hub calls it from connection tasks and
///   timer tasks at the same time.
/// - `'static` because it lives as long as the hub.
///
/// Every method returns a `Send` future so hub operations stay spawnable.
pub trait RoomStore: Send + Sync + 'static {
    /// Finds the room with the given code.
    ///
    /// # Errors
    /// `StoreError::RoomNotFound` if no room has `code`.
    fn find_room_by_code(
        &self,
        code: &RoomCode,
    ) -> impl Future<Output = Result<RoomRecord, StoreError>> + Send;

    /// Finds the user registered under `identity`.
    ///
    /// # Errors
    /// `StoreError::UserNotFound` if nobody has that username.
    fn find_user_by_identity(
        &self,
        identity: &Identity,
    ) -> impl Future<Output = Result<UserRecord, StoreError>> + Send;

    /// Records `winner` as the winner of `room` and marks it completed.
    fn update_room_winner(
        &self,
        room: RoomId,
        winner: UserId,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Stores one participant's race outcome.
    fn insert_match_result(
        &self,
        result: MatchResult,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Deletes the persisted room.
    fn delete_room(
        &self,
        room: RoomId,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}
