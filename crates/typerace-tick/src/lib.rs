//! Timer primitives for Typerace.
//!
//! Two building blocks drive every time-based transition of a race room:
//!
//! - [`TimerSlot`]: holds at most one armed timer job. Arming always
//!   cancels whatever was armed before, so a room can never have two
//!   competing timers.
//! - [`Countdown`]: a ticker aligned to a fixed deadline. Every caller
//!   that asks "how many units are left?" gets the same answer for the
//!   same instant, which lets late observers converge on the deadline
//!   instead of restarting from the top.
//!
//! # Integration
//!
//! The slot lives inside the state it guards (behind the owner's lock).
//! A fired job re-acquires that lock and checks
//! [`TimerSlot::is_current`] before acting:
//!
//! ```ignore
//! let token = session.timer.arm(TimerKind::Race, deadline, |token| async move {
//!     tokio::time::sleep_until(deadline).await;
//!     let mut table = table.write().await;
//!     let Some(session) = table.get_mut(&code) else { return };
//!     if !session.timer.complete(token) {
//!         return; // cancelled or replaced while we slept
//!     }
//!     // ... transition ...
//! });
//! ```

mod countdown;
mod slot;

pub use countdown::Countdown;
pub use slot::{TimerKind, TimerSlot, TimerToken};
