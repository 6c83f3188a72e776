//! Stage scheduler: the countdown, race and teardown timers.
//!
//! Every timer goes through the session's single [`TimerSlot`], so
//! arming one always cancels whatever was armed before. A fired job
//! re-acquires the session lock and re-validates before touching
//! anything: its token must still be current, and the stage and
//! participant count must still be what the job expects. Otherwise it
//! exits silently.
//!
//! Jobs hold a `Weak` reference to the hub, so a dropped hub stops its
//! timers at their next wake-up.
//!
//! [`TimerSlot`]: typerace_tick::TimerSlot

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::time::{self, Instant};
use tracing::{debug, info, trace, warn};
use typerace_protocol::{GameOver, RoomCode, ServerEvent};
use typerace_store::RoomStore;
use typerace_tick::{Countdown, TimerKind, TimerToken};

use crate::finalizer::{persist, select_winner};
use crate::hub::Inner;
use crate::session::Session;
use crate::{HubConfig, HubError, Stage};

/// What a participant joining mid-flight is told immediately.
///
/// During a countdown it is the time left until the shared deadline (so
/// it never exceeds what the others were last told); during a race it
/// is `start`. Otherwise there is nothing to catch up on.
pub(crate) fn greeting(
    stage: Stage,
    deadline: Option<Instant>,
    unit: Duration,
    now: Instant,
) -> Option<ServerEvent> {
    match (stage, deadline) {
        (Stage::Countdown, Some(deadline)) => {
            let seconds = Countdown::new(deadline, unit).remaining_at(now);
            (seconds > 0).then_some(ServerEvent::Countdown { seconds })
        }
        (Stage::Racing, _) => Some(ServerEvent::Start),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Countdown
// ---------------------------------------------------------------------------

/// Moves a full, idle session into the countdown and arms its ticker.
pub(crate) fn enter_countdown<S: RoomStore>(
    inner: &Arc<Inner<S>>,
    session: &mut Session,
) {
    let config = &inner.config;
    let countdown = Countdown::starting_now(config.countdown_units, config.time_unit);
    let deadline = countdown.deadline();
    session.stage = Stage::Countdown;

    let weak = Arc::downgrade(inner);
    let code = session.code.clone();
    let first = countdown.remaining();
    session.timer.arm(TimerKind::Countdown, deadline, move |token| {
        run_countdown(weak, code, token, countdown)
    });
    session.broadcast(&ServerEvent::Countdown { seconds: first });
    info!(room = %session.code, seconds = first, "countdown started");
}

async fn run_countdown<S: RoomStore>(
    weak: Weak<Inner<S>>,
    code: RoomCode,
    token: TimerToken,
    mut countdown: Countdown,
) {
    loop {
        let remaining = countdown.tick().await;
        let Some(inner) = weak.upgrade() else {
            return;
        };
        let mut sessions = inner.sessions.write().await;
        let Some(session) = sessions.get_mut(&code) else {
            return;
        };
        if !session.timer.is_current(token)
            || session.stage != Stage::Countdown
            || session.participants.len() != HubConfig::CAPACITY
        {
            trace!(room = %code, "stale countdown tick");
            return;
        }

        if remaining > 0 {
            session.broadcast(&ServerEvent::Countdown { seconds: remaining });
            continue;
        }

        // Disarm without aborting: this task is the armed job.
        session.timer.complete(token);
        enter_racing(&inner, session);
        return;
    }
}

// ---------------------------------------------------------------------------
// Race
// ---------------------------------------------------------------------------

fn enter_racing<S: RoomStore>(inner: &Arc<Inner<S>>, session: &mut Session) {
    let now = Instant::now();
    session.stage = Stage::Racing;
    session.race_started = Some(now);
    session.broadcast(&ServerEvent::Start);

    let deadline = now + inner.config.race_duration();
    let weak = Arc::downgrade(inner);
    let code = session.code.clone();
    session.timer.arm(TimerKind::Race, deadline, move |token| {
        run_race(weak, code, token, deadline)
    });
    info!(room = %session.code, "race started");
}

async fn run_race<S: RoomStore>(
    weak: Weak<Inner<S>>,
    code: RoomCode,
    token: TimerToken,
    deadline: Instant,
) {
    time::sleep_until(deadline).await;
    let Some(inner) = weak.upgrade() else {
        return;
    };
    match end_race(&inner, &code, Some(token)).await {
        Ok(()) => {}
        Err(e) => trace!(room = %code, error = %e, "race timer no longer applies"),
    }
}

/// Ends a race: Racing → Finished, announce the outcome, persist it,
/// then schedule teardown.
///
/// `token` is the race timer's own token when called from the timer, or
/// `None` for a synthetic end, which cancels the timer instead.
pub(crate) async fn end_race<S: RoomStore>(
    inner: &Arc<Inner<S>>,
    code: &RoomCode,
    token: Option<TimerToken>,
) -> Result<(), HubError> {
    let (room, winner, roster, stats) = {
        let mut sessions = inner.sessions.write().await;
        let session = sessions
            .get_mut(code)
            .ok_or_else(|| HubError::SessionNotFound(code.clone()))?;
        if token.is_some_and(|t| !session.timer.is_current(t)) {
            return Ok(());
        }
        if session.stage != Stage::Racing {
            return Err(HubError::InvalidStage(code.clone(), session.stage));
        }
        match token {
            Some(token) => {
                session.timer.complete(token);
            }
            None => {
                session.timer.cancel();
            }
        }

        session.stage = Stage::Finished;
        session.closing = true;
        let winner = select_winner(&session.stats).cloned();
        session.broadcast(&ServerEvent::GameOver(GameOver {
            winner: winner.clone(),
            stats: session.stats.clone(),
            reason: None,
        }));
        match &winner {
            Some(w) => info!(room = %code, winner = %w, "game over"),
            None => info!(room = %code, "game over without stats"),
        }
        (session.room_id, winner, session.roster(), session.stats.clone())
    };

    persist(&inner.store, code, room, winner.as_ref(), &roster, &stats).await;

    let mut sessions = inner.sessions.write().await;
    let pending = sessions
        .get_mut(code)
        .filter(|s| s.stage == Stage::Finished && !s.timer.is_armed());
    if let Some(session) = pending {
        arm_teardown(inner, session);
    }
    Ok(())
}

/// A participant left mid-race: abandon it.
///
/// The session returns to `Waiting` but stays closed to new joins; the
/// remaining participant is told why and the room is torn down after
/// the grace delay.
pub(crate) fn abort_race<S: RoomStore>(
    inner: &Arc<Inner<S>>,
    session: &mut Session,
) {
    session.timer.cancel();
    session.stage = Stage::Waiting;
    session.closing = true;
    let winner = session.participants.first().map(|p| p.identity.clone());
    session.broadcast(&ServerEvent::GameOver(GameOver {
        winner,
        stats: session.stats.clone(),
        reason: Some("opponent left".into()),
    }));
    info!(room = %session.code, "race abandoned");
    arm_teardown(inner, session);
}

// ---------------------------------------------------------------------------
// Teardown
// ---------------------------------------------------------------------------

/// Schedules removal of the session and its persisted room after the
/// grace delay.
pub(crate) fn arm_teardown<S: RoomStore>(
    inner: &Arc<Inner<S>>,
    session: &mut Session,
) {
    let deadline = Instant::now() + inner.config.grace_delay();
    let weak = Arc::downgrade(inner);
    let code = session.code.clone();
    session.timer.arm(TimerKind::Teardown, deadline, move |token| {
        run_teardown(weak, code, token, deadline)
    });
    debug!(room = %session.code, "teardown scheduled");
}

async fn run_teardown<S: RoomStore>(
    weak: Weak<Inner<S>>,
    code: RoomCode,
    token: TimerToken,
    deadline: Instant,
) {
    time::sleep_until(deadline).await;
    let Some(inner) = weak.upgrade() else {
        return;
    };
    let removed = {
        let mut sessions = inner.sessions.write().await;
        // `complete` first: dropping a session whose slot still holds
        // this task would abort it mid-teardown.
        let current = sessions
            .get_mut(&code)
            .is_some_and(|s| s.timer.complete(token));
        if current { sessions.remove(&code) } else { None }
    };
    let Some(session) = removed else {
        return;
    };
    info!(room = %code, "session torn down");
    if let Err(e) = inner.store.delete_room(session.room_id).await {
        warn!(room = %code, error = %e, "failed to delete room");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNIT: Duration = Duration::from_secs(1);

    #[tokio::test(start_paused = true)]
    async fn test_greeting_mid_countdown_reports_time_left() {
        let now = Instant::now();
        let deadline = now + Duration::from_millis(12_300);
        assert_eq!(
            greeting(Stage::Countdown, Some(deadline), UNIT, now),
            Some(ServerEvent::Countdown { seconds: 13 })
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_greeting_mid_race_is_start() {
        let now = Instant::now();
        assert_eq!(
            greeting(Stage::Racing, Some(now + UNIT), UNIT, now),
            Some(ServerEvent::Start)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_greeting_nothing_to_catch_up_on() {
        let now = Instant::now();
        assert_eq!(greeting(Stage::Waiting, None, UNIT, now), None);
        assert_eq!(greeting(Stage::Finished, Some(now + UNIT), UNIT, now), None);
        // Countdown already at its deadline: `start` is about to follow.
        assert_eq!(greeting(Stage::Countdown, Some(now), UNIT, now), None);
    }
}
