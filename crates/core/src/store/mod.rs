//! The client-side state container.
//!
//! [`GameStore`] is a cheap handle; clones share one snapshot, published
//! through a watch channel so any number of views can follow it. Actions
//! call the backend and then reload everything, so the snapshot only ever
//! shows what the backend last reported (plus the local position push).

mod actions;
mod session;
mod snapshot;
mod tracking;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use shadow_tag_api_types::{Dodge, FlashEvent, Match, Player, Season, Tag, Whisper};
use shadow_tag_backend::GameBackend;
use tokio::sync::watch;
use tracing::{debug, error, warn};

pub use snapshot::GameSnapshot;
pub use tracking::LocationOutcome;

use crate::config::GameConfig;
use crate::error::{GameError, Result};
use crate::location::{AlwaysOnline, Connectivity, Geolocation, LocationThrottle};
use crate::notifications::{LogNotifier, Notification, Notifier};

pub const INIT_FAILED_MESSAGE: &str = "Failed to initialize game. Please try again.";
pub const JOIN_MATCH_FAILED_MESSAGE: &str =
    "Failed to join match. Please check your location settings and try again.";

pub struct GameStoreBuilder {
    backend: Arc<dyn GameBackend>,
    geolocation: Arc<dyn Geolocation>,
    connectivity: Arc<dyn Connectivity>,
    notifier: Arc<dyn Notifier>,
    config: GameConfig,
}

impl GameStoreBuilder {
    pub fn connectivity(mut self, connectivity: Arc<dyn Connectivity>) -> Self {
        self.connectivity = connectivity;
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn config(mut self, config: GameConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> GameStore {
        let (state, _) = watch::channel(GameSnapshot::default());
        GameStore {
            shared: Arc::new(Shared {
                throttle: Mutex::new(LocationThrottle::new(&self.config)),
                backend: self.backend,
                geolocation: self.geolocation,
                connectivity: self.connectivity,
                notifier: self.notifier,
                config: self.config,
                state,
                tracking: tokio::sync::Mutex::new(None),
            }),
        }
    }
}

struct Shared {
    backend: Arc<dyn GameBackend>,
    geolocation: Arc<dyn Geolocation>,
    connectivity: Arc<dyn Connectivity>,
    notifier: Arc<dyn Notifier>,
    config: GameConfig,
    state: watch::Sender<GameSnapshot>,
    throttle: Mutex<LocationThrottle>,
    tracking: tokio::sync::Mutex<Option<tracking::Tracking>>,
}

impl Drop for Shared {
    fn drop(&mut self) {
        if let Some(tracking) = self.tracking.get_mut().take() {
            tracking.abort();
        }
    }
}

#[derive(Clone)]
pub struct GameStore {
    shared: Arc<Shared>,
}

/// Everything one refresh reads from the backend.
struct Loaded {
    current_event: Option<FlashEvent>,
    current_season: Option<Season>,
    players: Vec<Player>,
    tags: Vec<Tag>,
    dodges: Vec<Dodge>,
    current_match: Option<Match>,
    seasons: Vec<Season>,
    matches: Vec<Match>,
    whispers: Vec<Whisper>,
}

impl GameStore {
    /// Defaults to always online, log-only notifications and the default
    /// thresholds.
    pub fn builder(backend: Arc<dyn GameBackend>, geolocation: Arc<dyn Geolocation>) -> GameStoreBuilder {
        GameStoreBuilder {
            backend,
            geolocation,
            connectivity: Arc::new(AlwaysOnline),
            notifier: Arc::new(LogNotifier),
            config: GameConfig::default(),
        }
    }

    pub fn new(backend: Arc<dyn GameBackend>, geolocation: Arc<dyn Geolocation>) -> Self {
        Self::builder(backend, geolocation).build()
    }

    pub fn config(&self) -> &GameConfig {
        &self.shared.config
    }

    pub fn snapshot(&self) -> GameSnapshot {
        self.shared.state.borrow().clone()
    }

    /// A receiver that is notified on every snapshot change.
    pub fn subscribe(&self) -> watch::Receiver<GameSnapshot> {
        self.shared.state.subscribe()
    }

    pub fn current_player(&self) -> Option<Player> {
        self.shared.state.borrow().current_player.clone()
    }

    pub fn clear_error(&self) {
        self.update(|s| s.error = None);
    }

    pub fn clear_location_error(&self) {
        self.update(|s| s.location_error = None);
    }

    fn backend(&self) -> &dyn GameBackend {
        &*self.shared.backend
    }

    fn update(&self, f: impl FnOnce(&mut GameSnapshot)) {
        self.shared.state.send_modify(f);
    }

    fn throttle(&self) -> MutexGuard<'_, LocationThrottle> {
        self.shared
            .throttle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn require_player(&self) -> Result<Player> {
        self.current_player().ok_or(GameError::NoCurrentPlayer)
    }

    fn require_admin(&self) -> Result<Player> {
        let player = self.require_player()?;
        if !player.is_admin {
            return Err(GameError::NotAdmin);
        }
        Ok(player)
    }

    /// Restores the session, then reloads every table the UI shows. A
    /// failure leaves the previous data in place and sets `error`; either
    /// way the store counts as initialized afterwards.
    pub async fn init_game(&self) -> Result<()> {
        self.update(|s| {
            s.is_loading = true;
            s.error = None;
        });
        let before = self.current_player().map(|p| (p.id, p.status));

        self.restore_session().await;

        let loaded = match self.load().await {
            Ok(loaded) => loaded,
            Err(e) => {
                error!("failed to initialize game: {e}");
                self.update(|s| {
                    s.error = Some(INIT_FAILED_MESSAGE.into());
                    s.is_loading = false;
                    s.initialized = true;
                });
                return Err(e);
            }
        };

        let mut status_changed = false;
        self.update(|s| {
            if let Some(current) = s.current_player.as_mut() {
                if let Some(fresh) = loaded.players.iter().find(|p| p.id == current.id) {
                    *current = fresh.clone();
                }
                status_changed = before
                    .as_ref()
                    .is_some_and(|(id, status)| *id == current.id && *status != current.status);
            }
            s.current_event = loaded.current_event;
            s.current_season = loaded.current_season;
            s.players = loaded.players;
            s.tags = loaded.tags;
            s.dodges = loaded.dodges;
            s.current_match = loaded.current_match;
            s.seasons = loaded.seasons;
            s.matches = loaded.matches;
            s.whispers = loaded.whispers;
            s.is_loading = false;
            s.initialized = true;
        });
        debug!("game state refreshed");

        if status_changed {
            self.shared.notifier.notify(Notification::status_changed());
        }
        if self.current_player().is_some() {
            self.start_location_tracking().await;
        }
        Ok(())
    }

    async fn load(&self) -> Result<Loaded> {
        let backend = self.backend();
        let limit = self.shared.config.recent_activity_limit;
        let (current_event, current_season, players, tags, dodges, current_match, seasons, matches) = tokio::try_join!(
            backend.active_flash_event(Utc::now()),
            backend.active_season(),
            backend.list_players(),
            backend.recent_tags(limit),
            backend.recent_dodges(limit),
            backend.active_match(),
            backend.list_seasons(),
            backend.list_matches(),
        )?;

        let whispers = match self.current_player() {
            Some(player) => backend.whispers_for(&player.id).await?,
            None => Vec::new(),
        };

        Ok(Loaded {
            current_event,
            current_season,
            players,
            tags,
            dodges,
            current_match,
            seasons,
            matches,
            whispers,
        })
    }

    /// Reload after an action; the action already succeeded, so a failed
    /// reload is only logged (and shown through `error`).
    pub async fn refresh(&self) {
        if let Err(e) = self.init_game().await {
            warn!("refresh after action failed: {e}");
        }
    }
}
