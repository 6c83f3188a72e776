//! Periodic sweep of abandoned sessions.

use std::sync::Arc;

use futures_util::future::join_all;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tracing::{debug, info, warn};
use typerace_store::RoomStore;

use crate::Hub;

impl<S: RoomStore> Hub<S> {
    /// Removes every session with no participants and deletes their
    /// persisted rooms. Returns how many sessions were removed.
    ///
    /// Any timer still armed on a removed session is cancelled. Store
    /// deletions run after the lock is released; failures are logged.
    pub async fn sweep(&self) -> usize {
        let removed: Vec<_> = {
            let mut sessions = self.inner.sessions.write().await;
            let empty: Vec<_> = sessions
                .iter()
                .filter(|(_, s)| s.participants.is_empty())
                .map(|(code, _)| code.clone())
                .collect();
            empty
                .into_iter()
                .filter_map(|code| sessions.remove(&code))
                .map(|mut session| {
                    session.timer.cancel();
                    session
                })
                .collect()
        };
        if removed.is_empty() {
            debug!("reaper sweep found nothing");
            return 0;
        }

        let store = &self.inner.store;
        let deletions = removed.iter().map(|session| async move {
            if let Err(e) = store.delete_room(session.room_id).await {
                warn!(room = %session.code, error = %e, "reaper failed to delete room");
            }
        });
        join_all(deletions).await;
        info!(count = removed.len(), "reaper removed empty sessions");
        removed.len()
    }

    /// Starts sweeping every `reaper_interval`.
    ///
    /// The task holds only a weak reference and stops once the hub is
    /// dropped.
    pub fn spawn_reaper(&self) -> JoinHandle<()> {
        let weak = Arc::downgrade(&self.inner);
        let period = self.inner.config.reaper_interval;
        tokio::spawn(async move {
            let mut ticker = time::interval_at(time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    debug!("hub dropped; reaper stopping");
                    return;
                };
                Hub { inner }.sweep().await;
            }
        })
    }
}
