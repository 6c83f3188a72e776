//! The hub service object and its connection registry.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use typerace_protocol::{
    GameOver, Identity, PlayerStats, RoomCode, ServerEvent, StatsMap,
};
use typerace_store::{RoomStore, StoreError};

use crate::broadcast::{self, EventSink, Mailbox};
use crate::scheduler::{self, greeting};
use crate::session::{Participant, Session, SessionSnapshot, Ticket};
use crate::{HubConfig, HubError, JoinError, Stage};

pub(crate) struct Inner<S> {
    pub(crate) store: S,
    pub(crate) config: HubConfig,
    /// The session store: one entry per live room, all fields of a
    /// session guarded together.
    pub(crate) sessions: RwLock<HashMap<RoomCode, Session>>,
    next_serial: AtomicU64,
}

/// The live match-session hub.
///
/// Cheap to clone; every clone drives the same sessions. Construct one
/// per server and hand clones to the connection handlers and the
/// reaper.
///
/// ## Locking
///
/// One `RwLock` guards the whole session table. Every mutation happens
/// under the write lock and never awaits while holding it except to
/// acquire it; store calls and socket writes happen outside.
pub struct Hub<S> {
    pub(crate) inner: Arc<Inner<S>>,
}

impl<S> Clone for Hub<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: RoomStore> Hub<S> {
    /// Creates a hub backed by `store`.
    pub fn new(store: S, config: HubConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                config,
                sessions: RwLock::new(HashMap::new()),
                next_serial: AtomicU64::new(1),
            }),
        }
    }

    /// The hub's configuration.
    pub fn config(&self) -> &HubConfig {
        &self.inner.config
    }

    /// The backing store.
    pub fn store(&self) -> &S {
        &self.inner.store
    }

    // -----------------------------------------------------------------------
    // Connection registry
    // -----------------------------------------------------------------------

    /// Registers `identity` in room `code`, delivering its events to
    /// `sink`.
    ///
    /// Creates the session on the first join to a room that exists in
    /// the store. On success everyone in the room gets the new
    /// `player_list`; the newcomer additionally gets the current
    /// countdown or `start` if a race is already moving; and the second
    /// participant of an idle room starts the countdown.
    ///
    /// # Errors
    /// See [`JoinError`]. A refused join registers nothing.
    pub async fn join<K: EventSink>(
        &self,
        code: RoomCode,
        identity: Identity,
        sink: K,
    ) -> Result<Ticket, JoinError> {
        if code.as_str().is_empty() || identity.as_str().is_empty() {
            return Err(JoinError::MissingParameters);
        }
        let room = match self.inner.store.find_room_by_code(&code).await {
            Ok(room) => room,
            Err(StoreError::RoomNotFound(_)) => {
                return Err(JoinError::RoomNotFound(code));
            }
            Err(e) => return Err(JoinError::Store(e)),
        };

        let mut sessions = self.inner.sessions.write().await;
        if let Some(session) = sessions.get(&code) {
            if session.closing {
                return Err(JoinError::RoomClosed(code));
            }
            if session.contains(&identity) {
                return Err(JoinError::DuplicateIdentity(identity, code));
            }
            if session.participants.len() >= HubConfig::CAPACITY {
                return Err(JoinError::RoomFull(code));
            }
        }
        let session = sessions.entry(code.clone()).or_insert_with(|| {
            info!(room = %code, "session created");
            Session::new(code.clone(), room.id)
        });

        let serial = self.inner.next_serial.fetch_add(1, Ordering::Relaxed);
        let mailbox = Mailbox::spawn(
            code.clone(),
            identity.clone(),
            sink,
            self.inner.config.send_timeout,
        );
        session.participants.push(Participant {
            identity: identity.clone(),
            serial,
            mailbox,
        });
        info!(
            room = %code,
            participant = %identity,
            count = session.participants.len(),
            "participant joined"
        );

        session.broadcast(&ServerEvent::PlayerList(session.roster()));
        if let Some(event) = greeting(
            session.stage,
            session.timer.deadline(),
            self.inner.config.time_unit,
            Instant::now(),
        ) {
            session.send_to(serial, &event);
        }
        if session.stage == Stage::Waiting
            && session.participants.len() == HubConfig::CAPACITY
            && !session.timer.is_armed()
        {
            scheduler::enter_countdown(&self.inner, session);
        }

        Ok(Ticket {
            code,
            identity,
            serial,
        })
    }

    /// Removes the participant holding `ticket`.
    ///
    /// Idempotent: returns `false` (and broadcasts nothing) if the ticket
    /// was already removed. When the room drops below two participants a
    /// pending countdown is cancelled and a running race is abandoned.
    pub async fn leave(&self, ticket: &Ticket) -> bool {
        let mut sessions = self.inner.sessions.write().await;
        let Some(session) = sessions.get_mut(&ticket.code) else {
            return false;
        };
        let Some(pos) = session
            .participants
            .iter()
            .position(|p| p.serial == ticket.serial)
        else {
            return false;
        };
        session.participants.remove(pos);
        info!(
            room = %ticket.code,
            participant = %ticket.identity,
            count = session.participants.len(),
            "participant left"
        );

        session.broadcast(&ServerEvent::PlayerList(session.roster()));
        if session.participants.len() < HubConfig::CAPACITY {
            match session.stage {
                Stage::Countdown => {
                    session.timer.cancel();
                    session.stage = Stage::Waiting;
                    info!(room = %ticket.code, "countdown cancelled");
                }
                Stage::Racing => scheduler::abort_race(&self.inner, session),
                Stage::Waiting | Stage::Finished => {}
            }
        }
        true
    }

    /// Records a participant's latest stats and shares them with the
    /// room.
    ///
    /// Stats are only accepted while racing; anything else (including
    /// out-of-range values) is logged and ignored. Returns whether the
    /// report was applied.
    ///
    /// # Errors
    /// `HubError::SessionNotFound` if the room has no live session.
    pub async fn report_stats(
        &self,
        ticket: &Ticket,
        stats: PlayerStats,
    ) -> Result<bool, HubError> {
        if let Err(e) = stats.validate() {
            debug!(room = %ticket.code, participant = %ticket.identity, error = %e, "ignoring invalid stats");
            return Ok(false);
        }
        let mut sessions = self.inner.sessions.write().await;
        let session = sessions
            .get_mut(&ticket.code)
            .ok_or_else(|| HubError::SessionNotFound(ticket.code.clone()))?;
        if !session.participants.iter().any(|p| p.serial == ticket.serial) {
            debug!(room = %ticket.code, participant = %ticket.identity, "stats from departed participant");
            return Ok(false);
        }
        if session.stage != Stage::Racing {
            debug!(room = %ticket.code, participant = %ticket.identity, stage = %session.stage, "stats outside race ignored");
            return Ok(false);
        }

        session.stats.insert(ticket.identity.clone(), stats);
        let update: StatsMap =
            [(ticket.identity.clone(), stats)].into_iter().collect();
        session.broadcast(&ServerEvent::StatsUpdate(update));
        debug!(room = %ticket.code, participant = %ticket.identity, wpm = stats.wpm, "stats updated");
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Broadcast, inspection, external control
    // -----------------------------------------------------------------------

    /// Sends `event` to everyone currently in room `code`.
    ///
    /// The recipient list is copied under the read lock; frames are
    /// queued after it is released.
    ///
    /// # Errors
    /// `HubError::SessionNotFound` if the room has no live session.
    pub async fn broadcast(
        &self,
        code: &RoomCode,
        event: &ServerEvent,
    ) -> Result<(), HubError> {
        let recipients: Vec<Mailbox> = {
            let sessions = self.inner.sessions.read().await;
            let session = sessions
                .get(code)
                .ok_or_else(|| HubError::SessionNotFound(code.clone()))?;
            session.participants.iter().map(|p| p.mailbox.clone()).collect()
        };
        if let Some(frame) = broadcast::encode(code, event) {
            for mailbox in &recipients {
                mailbox.post(&frame);
            }
        }
        Ok(())
    }

    /// A copy of the session's state, or `None` if the room has no live
    /// session.
    pub async fn snapshot(&self, code: &RoomCode) -> Option<SessionSnapshot> {
        let sessions = self.inner.sessions.read().await;
        sessions.get(code).map(Session::snapshot)
    }

    /// Number of live sessions.
    pub async fn session_count(&self) -> usize {
        self.inner.sessions.read().await.len()
    }

    /// Ends a running race now, as if its timer had expired.
    ///
    /// # Errors
    /// `HubError::SessionNotFound` or `HubError::InvalidStage` if there
    /// is no race running in `code`.
    pub async fn finish(&self, code: &RoomCode) -> Result<(), HubError> {
        scheduler::end_race(&self.inner, code, None).await
    }

    /// `identity` gives up room `code`.
    ///
    /// When the room's creator withdraws before the race starts, the
    /// room is closed for good: the live session is dropped (cancelling
    /// its timer), anyone else in it gets `game_over` with reason
    /// `"host left"`, and the persisted room is deleted. Returns `false`
    /// when `identity` is not the creator, which changes nothing.
    ///
    /// # Errors
    /// `HubError::Store` if the room or user cannot be looked up, or the
    /// room cannot be deleted; `HubError::InvalidStage` once the race is
    /// running or over.
    pub async fn withdraw(
        &self,
        code: &RoomCode,
        identity: &Identity,
    ) -> Result<bool, HubError> {
        let room = self.inner.store.find_room_by_code(code).await?;
        let user = self.inner.store.find_user_by_identity(identity).await?;
        if user.id != room.creator {
            debug!(room = %code, participant = %identity, "withdraw by non-creator ignored");
            return Ok(false);
        }

        let removed = {
            let mut sessions = self.inner.sessions.write().await;
            let started = sessions.get(code).filter(|s| {
                s.closing || !matches!(s.stage, Stage::Waiting | Stage::Countdown)
            });
            if let Some(session) = started {
                return Err(HubError::InvalidStage(code.clone(), session.stage));
            }
            sessions.remove(code)
        };

        if let Some(mut session) = removed {
            session.timer.cancel();
            session.participants.retain(|p| &p.identity != identity);
            session.broadcast(&ServerEvent::GameOver(GameOver {
                winner: None,
                stats: session.stats.clone(),
                reason: Some("host left".into()),
            }));
        }
        if let Err(e) = self.inner.store.delete_room(room.id).await {
            warn!(room = %code, error = %e, "failed to delete withdrawn room");
            return Err(e.into());
        }
        info!(room = %code, participant = %identity, "room closed by host");
        Ok(true)
    }
}
