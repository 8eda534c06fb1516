//! Player-row changes, delivered by polling the players table.

use std::collections::{HashMap, VecDeque};

use futures_util::stream;
use shadow_tag_api_types::{Player, PlayerId};
use tokio::time::{self, MissedTickBehavior};
use tracing::{trace, warn};

use super::RestBackend;
use crate::traits::{PlayerChange, PlayerChanges, TableApi};

/// Diffs successive full reads of the players table.
///
/// The first read only primes the known rows; afterwards every row whose
/// contents differ from the last read is reported. New rows are not UPDATEs
/// and are only remembered.
#[derive(Debug, Default)]
pub(super) struct ChangeTracker {
    known: HashMap<PlayerId, Player>,
    primed: bool,
}

impl ChangeTracker {
    pub(super) fn absorb(&mut self, players: Vec<Player>) -> Vec<PlayerChange> {
        let mut changes = Vec::new();
        for player in players {
            let previous = self.known.insert(player.id.clone(), player.clone());
            if self.primed && previous.is_some_and(|old| old != player) {
                changes.push(PlayerChange { new: player });
            }
        }
        self.primed = true;
        changes
    }
}

pub(super) fn player_changes(backend: RestBackend) -> PlayerChanges {
    let mut interval = time::interval(backend.config().realtime_poll_interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let state = (backend, interval, ChangeTracker::default(), VecDeque::new());
    Box::pin(stream::unfold(
        state,
        |(backend, mut interval, mut tracker, mut pending)| async move {
            loop {
                if let Some(change) = pending.pop_front() {
                    return Some((change, (backend, interval, tracker, pending)));
                }

                interval.tick().await;
                match backend.list_players().await {
                    Ok(players) => {
                        let changes = tracker.absorb(players);
                        trace!("realtime poll found {} changed players", changes.len());
                        pending.extend(changes);
                    }
                    Err(e) => warn!("realtime poll failed: {e}"),
                }
            }
        },
    ))
}
