//! Persistent store boundary for Typerace.
//!
//! The hub keeps live races in memory, but rooms, users and results are
//! owned by an external store. This crate defines that boundary:
//!
//! - [`RoomStore`]: the five calls the hub makes.
//! - Record types ([`RoomRecord`], [`UserRecord`], [`MatchResult`]).
//! - [`MemoryStore`]: an in-process implementation for the dev server
//!   and tests.

mod error;
mod memory;
mod records;
mod store;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use records::{
    MatchResult, RoomId, RoomRecord, RoomStatus, UserId, UserRecord,
};
pub use store::RoomStore;
