use std::sync::{Arc, Weak};

use chrono::Utc;
use futures_util::StreamExt;
use shadow_tag_api_types::{Coordinates, LocationUpdate, NearbyPlayersArgs, Player, PlayerId};
use shadow_tag_backend::PlayerChanges;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use super::{GameStore, Shared};
use crate::error::{GameError, Result};
use crate::location::{
    LocationError, LocationFix, OFFLINE_MESSAGE, PositionStream, START_FAILED_MESSAGE, SkipReason,
};

const UPDATE_FAILED_MESSAGE: &str = "Failed to update location";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LocationOutcome {
    /// The position went to the backend and the nearby list was refreshed.
    Pushed { nearby: usize },
    Skipped(SkipReason),
}

/// The background tasks of an active tracking session.
pub(super) struct Tracking {
    watch: JoinHandle<()>,
    realtime: Option<JoinHandle<()>>,
}

impl Tracking {
    pub(super) fn abort(self) {
        self.watch.abort();
        if let Some(realtime) = self.realtime {
            realtime.abort();
        }
    }
}

impl GameStore {
    /// One-shot position push. Failures are also stored in `location_error`
    /// with the message the player should see.
    pub async fn update_location(&self) -> Result<LocationOutcome> {
        let Some(player) = self.current_player() else {
            return Ok(LocationOutcome::Skipped(SkipReason::NoPlayer));
        };
        if self.throttle().too_soon(Instant::now()) {
            trace!("location update throttled");
            return Ok(LocationOutcome::Skipped(SkipReason::TooSoon));
        }
        self.update(|s| s.location_error = None);

        let result = self.locate_and_push(&player.id).await;
        if let Err(e) = &result {
            warn!("location update failed: {e}");
            let message = match e {
                GameError::Location(e) => e.update_message(),
                _ => UPDATE_FAILED_MESSAGE,
            };
            self.update(|s| s.location_error = Some(message.into()));
        }
        result
    }

    async fn locate_and_push(&self, player_id: &PlayerId) -> Result<LocationOutcome> {
        if !self.shared.connectivity.is_online() {
            return Err(LocationError::Offline.into());
        }
        let fix = self.current_fix().await?;
        if !self.throttle().accurate_enough(&fix) {
            return Err(LocationError::LowAccuracy(fix.accuracy_m).into());
        }
        self.push_fix(player_id, fix).await
    }

    pub(super) async fn current_fix(&self) -> Result<LocationFix> {
        let options = self.shared.config.location_options();
        let fix = self
            .shared
            .geolocation
            .current_position(options)
            .await
            .map_err(LocationError::from)?;
        Ok(fix)
    }

    fn last_known_location(&self) -> Option<Coordinates> {
        self.shared
            .state
            .borrow()
            .current_player
            .as_ref()
            .and_then(|p| p.location)
    }

    async fn push_fix(&self, player_id: &PlayerId, fix: LocationFix) -> Result<LocationOutcome> {
        if !self.throttle().moved_enough(self.last_known_location(), &fix) {
            trace!("moved less than {} m", self.shared.config.min_distance_change_m);
            return Ok(LocationOutcome::Skipped(SkipReason::TooClose));
        }

        let now = Utc::now();
        let location = fix.coordinates;
        self.backend()
            .update_player_location(
                player_id,
                LocationUpdate {
                    location,
                    last_location_update: now,
                },
            )
            .await?;
        let nearby = self
            .backend()
            .get_nearby_players(NearbyPlayersArgs {
                user_lat: location.lat,
                user_lng: location.lng,
                radius_meters: self.shared.config.nearby_radius_m,
            })
            .await?;
        self.throttle().record_push(Instant::now());

        let count = nearby.len();
        self.update(|s| {
            s.nearby_players = nearby;
            s.last_location_update = Some(now);
            s.location_error = None;
            if let Some(current) = s.current_player.as_mut().filter(|p| &p.id == player_id) {
                current.location = Some(location);
                current.last_location_update = Some(now);
            }
        });
        debug!("location pushed, {count} players nearby");
        Ok(LocationOutcome::Pushed { nearby: count })
    }

    async fn on_watched_fix(&self, fix: LocationFix) {
        let Some(player) = self.current_player() else {
            return;
        };
        let check = self
            .throttle()
            .check(&fix, self.last_known_location(), Instant::now());
        if let Err(reason) = check {
            trace!("watched fix skipped: {reason}");
            return;
        }
        if let Err(e) = self.push_fix(&player.id, fix).await {
            warn!("failed to push watched location: {e}");
        }
    }

    /// Another player's row changed: keep the roster current and look
    /// around again.
    async fn on_player_change(&self, row: Player) {
        let mine = self.shared.state.borrow().current_player_id() == Some(&row.id);
        self.update(|s| {
            if let Some(known) = s.players.iter_mut().find(|p| p.id == row.id) {
                *known = row;
            }
        });
        if !mine {
            if let Err(e) = self.update_location().await {
                debug!("location update after player change failed: {e}");
            }
        }
    }

    /// Pushes a position now, then follows the device's position and other
    /// players' updates until stopped. Does nothing if already tracking or
    /// signed out.
    pub async fn start_location_tracking(&self) {
        let mut tracking = self.shared.tracking.lock().await;
        if tracking.is_some() || self.current_player().is_none() {
            return;
        }
        if !self.shared.connectivity.is_online() {
            self.update(|s| s.location_error = Some(OFFLINE_MESSAGE.into()));
            return;
        }

        info!("starting location tracking");
        if let Err(e) = self.update_location().await {
            debug!("initial location update failed: {e}");
        }

        let fixes = self
            .shared
            .geolocation
            .watch_position(self.shared.config.location_options());
        let watch = tokio::spawn(watch_task(Arc::downgrade(&self.shared), fixes));

        let realtime = match self.backend().player_updates().await {
            Ok(changes) => Some(tokio::spawn(realtime_task(
                Arc::downgrade(&self.shared),
                changes,
            ))),
            Err(e) => {
                warn!("failed to subscribe to player updates: {e}");
                self.update(|s| s.location_error = Some(START_FAILED_MESSAGE.into()));
                None
            }
        };

        *tracking = Some(Tracking { watch, realtime });
        self.update(|s| s.is_tracking = true);
    }

    pub async fn stop_location_tracking(&self) {
        if let Some(tracking) = self.shared.tracking.lock().await.take() {
            info!("stopping location tracking");
            tracking.abort();
        }
        self.update(|s| s.is_tracking = false);
    }
}

// The tasks hold the store weakly so dropping the last handle ends them.

async fn watch_task(weak: Weak<Shared>, mut fixes: PositionStream) {
    while let Some(reading) = fixes.next().await {
        let Some(shared) = weak.upgrade() else {
            break;
        };
        let store = GameStore { shared };
        match reading {
            Ok(fix) => store.on_watched_fix(fix).await,
            Err(e) => {
                let e = LocationError::from(e);
                warn!("location watch error: {e}");
                store.update(|s| s.location_error = Some(e.watch_message().into()));
            }
        }
    }
    debug!("location watch ended");
}

async fn realtime_task(weak: Weak<Shared>, mut changes: PlayerChanges) {
    while let Some(change) = changes.next().await {
        let Some(shared) = weak.upgrade() else {
            break;
        };
        GameStore { shared }.on_player_change(change.new).await;
    }
    debug!("player updates ended");
}
