//! Wire protocol for Typerace.
//!
//! This crate defines the messages that travel between a race client and
//! the hub:
//!
//! - **Types** ([`Envelope`], [`ServerEvent`], [`ClientMessage`],
//!   [`PlayerStats`], etc.). Every frame is a `{ "type", "payload" }`
//!   object.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those messages are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong during
//!   encoding/decoding or validation.
//!
//! # Architecture
//!
//! The protocol layer knows nothing about rooms, timers or sockets. It
//! only knows how to turn events into bytes and bytes into messages.
//!
//! ```text
//! Transport (bytes) → Protocol (ClientMessage / ServerEvent) → Hub (rooms)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{
    ClientMessage, Envelope, GameOver, Identity, PlayerStats, RoomCode,
    ServerEvent, StatsMap,
};
