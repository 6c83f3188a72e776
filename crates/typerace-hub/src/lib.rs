//! The live match-session hub for Typerace.
//!
//! A [`Hub`] pairs two participants per room and drives each room
//! through a timed race:
//!
//! ```text
//! join ─→ [Waiting] ─2 players─→ [Countdown] ─0─→ [Racing] ─expiry─→ [Finished]
//!             ▲                        │               │                 │
//!             └──── player leaves ─────┘               │            grace delay
//!                                                      ▼                 ▼
//!                                             abandoned, torn down   torn down
//! ```
//!
//! # Key types
//!
//! - [`Hub`]: join, leave, stats, broadcast, finish, withdraw, sweep
//! - [`EventSink`]: where a participant's frames are written
//! - [`Ticket`]: proof of a join, used for leave and stats
//! - [`HubConfig`] / [`Stage`]: timings and the stage machine
//! - [`SessionSnapshot`]: read-only view for inspection
//!
//! # Concurrency
//!
//! All session state sits in one table behind one `RwLock`. Timers are
//! spawned tasks owned by the session's single timer slot; each
//! participant has its own writer task, so frames are queued under the
//! lock (in commit order) and written to sockets outside it.

mod broadcast;
mod config;
mod error;
mod finalizer;
mod hub;
mod reaper;
mod scheduler;
mod session;

pub use broadcast::{EventSink, Frame};
pub use config::{HubConfig, Stage};
pub use error::{DeliveryError, HubError, JoinError};
pub use finalizer::select_winner;
pub use hub::Hub;
pub use session::{SessionSnapshot, Ticket};
