//! Single-slot timer ownership.

use std::fmt;
use std::future::Future;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, trace};

// ---------------------------------------------------------------------------
// TimerKind
// ---------------------------------------------------------------------------

/// What an armed timer is waiting for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    /// Pre-race countdown; ticks once per time unit.
    Countdown,
    /// Race in progress; fires once when the race clock runs out.
    Race,
    /// Deferred teardown after the outcome has been announced.
    Teardown,
}

impl fmt::Display for TimerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Countdown => write!(f, "countdown"),
            Self::Race => write!(f, "race"),
            Self::Teardown => write!(f, "teardown"),
        }
    }
}

// ---------------------------------------------------------------------------
// TimerToken
// ---------------------------------------------------------------------------

/// Identifies one arming of a [`TimerSlot`].
///
/// Handed to the job when it is spawned. The job presents it back to the
/// slot to prove it is still the armed timer; a token from an earlier
/// arming never matches again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken {
    epoch: u64,
}

impl TimerToken {
    /// Which arming of the slot this token belongs to (starts at 1).
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

// ---------------------------------------------------------------------------
// TimerSlot
// ---------------------------------------------------------------------------

struct Armed {
    kind: TimerKind,
    token: TimerToken,
    deadline: Instant,
    handle: JoinHandle<()>,
}

/// Holds at most one armed timer job.
///
/// The slot is plain data: it is meant to sit inside a larger struct that
/// is already guarded by a lock, so that arming, cancelling and the
/// fired job's re-validation are all linearized by that one lock.
///
/// Cancellation aborts the spawned task, but aborting alone is not enough:
/// the job may already be past its last await point and waiting for the
/// owner's lock. Jobs must therefore call [`complete`](Self::complete) or
/// [`is_current`](Self::is_current) after acquiring the lock.
///
/// Dropping the slot aborts the armed job.
#[derive(Default)]
pub struct TimerSlot {
    epoch: u64,
    armed: Option<Armed>,
}

impl TimerSlot {
    /// Creates an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancels any armed timer, then spawns `job` as the new one.
    ///
    /// `job` receives the token of this arming. `deadline` is recorded for
    /// observers ([`deadline`](Self::deadline)); the job is responsible
    /// for actually sleeping until it.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn arm<F, Fut>(
        &mut self,
        kind: TimerKind,
        deadline: Instant,
        job: F,
    ) -> TimerToken
    where
        F: FnOnce(TimerToken) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cancel();
        self.epoch += 1;
        let token = TimerToken { epoch: self.epoch };
        let handle = tokio::spawn(job(token));
        debug!(%kind, epoch = token.epoch, "timer armed");
        self.armed = Some(Armed {
            kind,
            token,
            deadline,
            handle,
        });
        token
    }

    /// Cancels the armed timer, if any. Returns the kind that was armed.
    ///
    /// Idempotent: cancelling an empty slot returns `None`.
    pub fn cancel(&mut self) -> Option<TimerKind> {
        let armed = self.armed.take()?;
        armed.handle.abort();
        debug!(kind = %armed.kind, epoch = armed.token.epoch, "timer cancelled");
        Some(armed.kind)
    }

    /// Disarms the slot on behalf of the job holding `token`, without
    /// aborting it.
    ///
    /// Returns `false` if `token` is stale (the timer was cancelled or
    /// replaced); the caller must then do nothing further.
    pub fn complete(&mut self, token: TimerToken) -> bool {
        if !self.is_current(token) {
            trace!(epoch = token.epoch, "stale timer token");
            return false;
        }
        self.armed = None;
        true
    }

    /// Returns `true` if `token` belongs to the currently armed timer.
    pub fn is_current(&self, token: TimerToken) -> bool {
        self.armed.as_ref().is_some_and(|a| a.token == token)
    }

    /// The kind of the armed timer, if any.
    pub fn kind(&self) -> Option<TimerKind> {
        self.armed.as_ref().map(|a| a.kind)
    }

    /// The deadline recorded for the armed timer, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.armed.as_ref().map(|a| a.deadline)
    }

    /// Returns `true` if a timer is armed.
    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }
}

impl Drop for TimerSlot {
    fn drop(&mut self) {
        if let Some(armed) = self.armed.take() {
            armed.handle.abort();
        }
    }
}

impl fmt::Debug for TimerSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerSlot")
            .field("epoch", &self.epoch)
            .field("kind", &self.kind())
            .finish()
    }
}
