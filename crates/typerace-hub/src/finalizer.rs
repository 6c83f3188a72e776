//! Winner selection and result persistence.

use std::cmp::Ordering;

use tracing::{debug, info, warn};
use typerace_protocol::{Identity, PlayerStats, RoomCode, StatsMap};
use typerace_store::{MatchResult, RoomId, RoomStore};

/// Picks the winner from the final stats.
///
/// Higher words-per-minute wins; equal wpm falls back to higher
/// accuracy, then to the lower error metric. If all three are equal the
/// lexicographically smallest identity wins. Returns `None` when nobody
/// reported stats.
pub fn select_winner(stats: &StatsMap) -> Option<&Identity> {
    let mut best: Option<(&Identity, &PlayerStats)> = None;
    // BTreeMap iterates in identity order; only a strictly better entry
    // replaces the current best.
    for (identity, s) in stats {
        match best {
            Some((_, current)) if !beats(s, current) => {}
            _ => best = Some((identity, s)),
        }
    }
    best.map(|(identity, _)| identity)
}

fn beats(a: &PlayerStats, b: &PlayerStats) -> bool {
    let order = a
        .wpm
        .cmp(&b.wpm)
        .then(a.accuracy.total_cmp(&b.accuracy))
        .then(b.error.total_cmp(&a.error));
    order == Ordering::Greater
}

/// Records the outcome in the store.
///
/// Every call is attempted independently; failures are logged and never
/// stop the remaining writes. Nothing is written when there is no
/// winner.
pub(crate) async fn persist<S: RoomStore>(
    store: &S,
    code: &RoomCode,
    room: RoomId,
    winner: Option<&Identity>,
    roster: &[Identity],
    stats: &StatsMap,
) {
    let Some(winner) = winner else {
        debug!(room = %code, "no stats reported; nothing to persist");
        return;
    };

    match store.find_user_by_identity(winner).await {
        Ok(user) => {
            if let Err(e) = store.update_room_winner(room, user.id).await {
                warn!(room = %code, error = %e, "failed to record winner");
            }
        }
        Err(e) => {
            warn!(room = %code, participant = %winner, error = %e, "winner lookup failed");
        }
    }

    let mut written = 0usize;
    for (identity, s) in stats {
        let participant = match store.find_user_by_identity(identity).await {
            Ok(user) => user,
            Err(e) => {
                warn!(room = %code, participant = %identity, error = %e, "participant lookup failed");
                continue;
            }
        };
        let opponent = match roster
            .iter()
            .chain(stats.keys())
            .find(|other| *other != identity)
        {
            Some(other) => store.find_user_by_identity(other).await.ok().map(|u| u.id),
            None => None,
        };
        let result = MatchResult {
            room,
            participant: participant.id,
            opponent,
            won: identity == winner,
            wpm: s.wpm,
            accuracy: s.accuracy,
            error: s.error,
        };
        match store.insert_match_result(result).await {
            Ok(()) => written += 1,
            Err(e) => {
                warn!(room = %code, participant = %identity, error = %e, "failed to store match result");
            }
        }
    }
    info!(room = %code, winner = %winner, results = written, "race results persisted");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(entries: &[(&str, u32, f64, f64)]) -> StatsMap {
        entries
            .iter()
            .map(|&(name, wpm, accuracy, error)| {
                (
                    Identity::from(name),
                    PlayerStats {
                        wpm,
                        accuracy,
                        error,
                    },
                )
            })
            .collect()
    }

    fn winner(map: &StatsMap) -> Option<&str> {
        select_winner(map).map(Identity::as_str)
    }

    #[test]
    fn test_select_winner_error_breaks_wpm_and_accuracy_tie() {
        let map = stats(&[("A", 80, 0.95, 0.02), ("B", 80, 0.95, 0.05)]);
        assert_eq!(winner(&map), Some("A"));
    }

    #[test]
    fn test_select_winner_higher_wpm_wins_regardless_of_rest() {
        let map = stats(&[("A", 90, 0.50, 9.0), ("B", 70, 1.0, 0.0)]);
        assert_eq!(winner(&map), Some("A"));
    }

    #[test]
    fn test_select_winner_accuracy_breaks_wpm_tie() {
        let map = stats(&[("A", 80, 0.90, 0.0), ("B", 80, 0.95, 0.0)]);
        assert_eq!(winner(&map), Some("B"));
    }

    #[test]
    fn test_select_winner_full_tie_picks_smallest_identity() {
        let map = stats(&[("zoe", 60, 0.9, 1.0), ("amy", 60, 0.9, 1.0)]);
        assert_eq!(winner(&map), Some("amy"));
    }

    #[test]
    fn test_select_winner_single_reporter() {
        let map = stats(&[("solo", 10, 0.1, 3.0)]);
        assert_eq!(winner(&map), Some("solo"));
    }

    #[test]
    fn test_select_winner_no_stats() {
        assert_eq!(winner(&StatsMap::new()), None);
    }
}
