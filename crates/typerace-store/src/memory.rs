//! In-memory [`RoomStore`] for development and tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use rand::Rng;
use tracing::debug;
use typerace_protocol::{Identity, RoomCode};

use crate::{
    MatchResult, RoomId, RoomRecord, RoomStatus, RoomStore, StoreError,
    UserId, UserRecord,
};

/// Range room codes are drawn from.
const CODE_RANGE: std::ops::RangeInclusive<u32> = 100_000..=999_999;

/// Attempts at finding an unused code before giving up.
const MAX_CODE_ATTEMPTS: usize = 64;

#[derive(Debug, Default)]
struct Tables {
    next_id: u64,
    users: HashMap<UserId, UserRecord>,
    rooms: HashMap<RoomId, RoomRecord>,
    results: Vec<MatchResult>,
}

impl Tables {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// A thread-safe store that keeps everything in process memory.
///
/// Cloning is cheap and every clone sees the same data, so a test can
/// hand one clone to the hub and keep another to inspect.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, StoreError> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".into()))
    }

    /// Registers a user.
    ///
    /// # Errors
    /// `StoreError::UsernameTaken` if `username` already exists.
    pub fn create_user(
        &self,
        username: impl Into<Identity>,
        name: impl Into<String>,
    ) -> Result<UserRecord, StoreError> {
        let username = username.into();
        let mut tables = self.lock()?;
        if tables.users.values().any(|u| u.username == username) {
            return Err(StoreError::UsernameTaken(username));
        }
        let id = UserId(tables.allocate_id());
        let user = UserRecord {
            id,
            username,
            name: name.into(),
        };
        tables.users.insert(id, user.clone());
        debug!(user = %id, username = %user.username, "user created");
        Ok(user)
    }

    /// Creates a room owned by `creator` under a fresh six-digit code.
    ///
    /// # Errors
    /// `StoreError::Unavailable` if no unused code was found.
    pub fn create_room(
        &self,
        creator: UserId,
        prompt: impl Into<String>,
    ) -> Result<RoomRecord, StoreError> {
        let mut tables = self.lock()?;
        let mut rng = rand::rng();
        let code = (0..MAX_CODE_ATTEMPTS)
            .map(|_| RoomCode::new(rng.random_range(CODE_RANGE).to_string()))
            .find(|code| tables.rooms.values().all(|r| &r.code != code))
            .ok_or_else(|| {
                StoreError::Unavailable("no free room code".into())
            })?;

        let id = RoomId(tables.allocate_id());
        let room = RoomRecord {
            id,
            code,
            creator,
            opponent: None,
            prompt: prompt.into(),
            status: RoomStatus::Waiting,
            winner: None,
        };
        tables.rooms.insert(id, room.clone());
        debug!(room = %room.code, id = %id, "room created");
        Ok(room)
    }

    /// The room with `code`, if it still exists.
    pub fn room(&self, code: &RoomCode) -> Option<RoomRecord> {
        let tables = self.lock().ok()?;
        tables.rooms.values().find(|r| &r.code == code).cloned()
    }

    /// Every match result recorded so far, in insertion order.
    pub fn results(&self) -> Vec<MatchResult> {
        self.lock().map(|t| t.results.clone()).unwrap_or_default()
    }
}

impl RoomStore for MemoryStore {
    async fn find_room_by_code(
        &self,
        code: &RoomCode,
    ) -> Result<RoomRecord, StoreError> {
        let tables = self.lock()?;
        tables
            .rooms
            .values()
            .find(|r| &r.code == code)
            .cloned()
            .ok_or_else(|| StoreError::RoomNotFound(code.clone()))
    }

    async fn find_user_by_identity(
        &self,
        identity: &Identity,
    ) -> Result<UserRecord, StoreError> {
        let tables = self.lock()?;
        tables
            .users
            .values()
            .find(|u| &u.username == identity)
            .cloned()
            .ok_or_else(|| StoreError::UserNotFound(identity.clone()))
    }

    async fn update_room_winner(
        &self,
        room: RoomId,
        winner: UserId,
    ) -> Result<(), StoreError> {
        let mut tables = self.lock()?;
        let record = tables
            .rooms
            .get_mut(&room)
            .ok_or(StoreError::RoomIdNotFound(room))?;
        record.winner = Some(winner);
        record.status = RoomStatus::Completed;
        Ok(())
    }

    async fn insert_match_result(
        &self,
        result: MatchResult,
    ) -> Result<(), StoreError> {
        self.lock()?.results.push(result);
        Ok(())
    }

    async fn delete_room(&self, room: RoomId) -> Result<(), StoreError> {
        self.lock()?
            .rooms
            .remove(&room)
            .map(|_| ())
            .ok_or(StoreError::RoomIdNotFound(room))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_user_rejects_duplicate_username() {
        let store = MemoryStore::new();
        store.create_user("alice", "Alice").unwrap();
        let err = store.create_user("alice", "Other Alice").unwrap_err();
        assert!(matches!(err, StoreError::UsernameTaken(_)));
    }

    #[test]
    fn test_create_room_generates_six_digit_codes() {
        let store = MemoryStore::new();
        let user = store.create_user("alice", "Alice").unwrap();
        for _ in 0..50 {
            let room = store.create_room(user.id, "the quick brown fox").unwrap();
            let n: u32 = room.code.as_str().parse().unwrap();
            assert!(CODE_RANGE.contains(&n), "code {n} out of range");
            assert_eq!(room.status, RoomStatus::Waiting);
        }
    }

    #[test]
    fn test_create_room_codes_are_unique() {
        let store = MemoryStore::new();
        let user = store.create_user("alice", "Alice").unwrap();
        let mut codes = std::collections::HashSet::new();
        for _ in 0..200 {
            let room = store.create_room(user.id, "prompt").unwrap();
            assert!(codes.insert(room.code));
        }
    }

    #[test]
    fn test_ids_are_distinct_across_tables() {
        let store = MemoryStore::new();
        let user = store.create_user("alice", "Alice").unwrap();
        let room = store.create_room(user.id, "prompt").unwrap();
        assert_ne!(user.id.0, room.id.0);
    }
}
