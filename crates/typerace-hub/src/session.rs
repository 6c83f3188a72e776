//! Per-room live state.

use tokio::time::Instant;
use tracing::trace;
use typerace_protocol::{Identity, RoomCode, ServerEvent, StatsMap};
use typerace_store::RoomId;
use typerace_tick::{TimerKind, TimerSlot};

use crate::Stage;
use crate::broadcast::{self, Mailbox};

/// Proof of a successful join.
///
/// Pass it back to [`Hub::leave`](crate::Hub::leave) and
/// [`Hub::report_stats`](crate::Hub::report_stats). Each join gets a
/// fresh ticket, so a stale ticket from an earlier connection with the
/// same username never affects the current one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub(crate) code: RoomCode,
    pub(crate) identity: Identity,
    pub(crate) serial: u64,
}

impl Ticket {
    /// The room this ticket belongs to.
    pub fn code(&self) -> &RoomCode {
        &self.code
    }

    /// The identity it was issued to.
    pub fn identity(&self) -> &Identity {
        &self.identity
    }
}

pub(crate) struct Participant {
    pub(crate) identity: Identity,
    pub(crate) serial: u64,
    pub(crate) mailbox: Mailbox,
}

/// Everything the hub knows about one room, guarded as a unit by the
/// session table lock.
pub(crate) struct Session {
    pub(crate) code: RoomCode,
    pub(crate) room_id: RoomId,
    pub(crate) stage: Stage,
    /// In join order.
    pub(crate) participants: Vec<Participant>,
    pub(crate) stats: StatsMap,
    pub(crate) timer: TimerSlot,
    pub(crate) race_started: Option<Instant>,
    /// Set once the race has ended or been abandoned; no further joins.
    pub(crate) closing: bool,
}

impl Session {
    pub(crate) fn new(code: RoomCode, room_id: RoomId) -> Self {
        Self {
            code,
            room_id,
            stage: Stage::Waiting,
            participants: Vec::with_capacity(crate::HubConfig::CAPACITY),
            stats: StatsMap::new(),
            timer: TimerSlot::new(),
            race_started: None,
            closing: false,
        }
    }

    pub(crate) fn contains(&self, identity: &Identity) -> bool {
        self.participants.iter().any(|p| &p.identity == identity)
    }

    pub(crate) fn roster(&self) -> Vec<Identity> {
        self.participants.iter().map(|p| p.identity.clone()).collect()
    }

    /// Queues `event` for every current participant.
    pub(crate) fn broadcast(&self, event: &ServerEvent) {
        let Some(frame) = broadcast::encode(&self.code, event) else {
            return;
        };
        trace!(room = %self.code, event = event.kind(), recipients = self.participants.len(), "broadcast");
        for p in &self.participants {
            p.mailbox.post(&frame);
        }
    }

    /// Queues `event` for one participant.
    pub(crate) fn send_to(&self, serial: u64, event: &ServerEvent) {
        let Some(p) = self.participants.iter().find(|p| p.serial == serial)
        else {
            return;
        };
        if let Some(frame) = broadcast::encode(&self.code, event) {
            p.mailbox.post(&frame);
        }
    }

    pub(crate) fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            code: self.code.clone(),
            stage: self.stage,
            participants: self.roster(),
            stats: self.stats.clone(),
            timer: self.timer.kind(),
            deadline: self.timer.deadline(),
            race_started: self.race_started,
            closing: self.closing,
        }
    }
}

/// A read-only copy of one session's state.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub code: RoomCode,
    pub stage: Stage,
    /// In join order.
    pub participants: Vec<Identity>,
    pub stats: StatsMap,
    /// The armed timer, if any.
    pub timer: Option<TimerKind>,
    /// When the armed timer is due.
    pub deadline: Option<Instant>,
    pub race_started: Option<Instant>,
    pub closing: bool,
}
