//! # Typerace
//!
//! Real-time two-player typing race server.
//!
//! Players open a WebSocket to `/ws/{room_code}?username={name}`. Once
//! two players are in a room the server counts down, starts the race,
//! relays each player's live stats to both, and after the race announces
//! the winner and records the results in the persistent store.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use typerace::prelude::*;
//!
//! # async fn demo() -> Result<(), TyperaceError> {
//! let store = MemoryStore::new();
//! let server = TyperaceServerBuilder::new()
//!     .bind("0.0.0.0:8080")
//!     .build(store)
//!     .await?;
//! let _reaper = server.hub().spawn_reaper();
//! server.run().await
//! # }
//! ```

mod config;
mod error;
mod handler;
mod server;

pub use config::{ENV_BIND, ENV_REAPER_SECS, ENV_TIME_UNIT_MS, ServerConfig};
pub use error::TyperaceError;
pub use server::{TyperaceServer, TyperaceServerBuilder};

/// Everything needed to run a server or drive a hub directly.
pub mod prelude {
    pub use crate::{ServerConfig, TyperaceError, TyperaceServer, TyperaceServerBuilder};
    pub use typerace_hub::{
        DeliveryError, EventSink, Frame, Hub, HubConfig, HubError, JoinError,
        SessionSnapshot, Stage, Ticket, select_winner,
    };
    pub use typerace_protocol::{
        ClientMessage, GameOver, Identity, PlayerStats, RoomCode, ServerEvent,
        StatsMap,
    };
    pub use typerace_store::{
        MatchResult, MemoryStore, RoomId, RoomRecord, RoomStatus, RoomStore,
        StoreError, UserId, UserRecord,
    };
    pub use typerace_tick::TimerKind;
}
