//! The backend contract the client consumes.
//!
//! The backend owns every rule: tag legality, cooldowns, match lifecycle and
//! scoring all live in its stored procedures. Implementations can be remote
//! (REST) or in-process (tests, offline demos).

use std::future::Future;
use std::pin::Pin;

use chrono::{DateTime, Utc};
use futures_core::Stream;
use shadow_tag_api_types::prelude::*;

use crate::auth::Session;
use crate::error::Result;

pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Stream of UPDATE events on the players table.
pub type PlayerChanges = Pin<Box<dyn Stream<Item = PlayerChange> + Send>>;

/// The new row of an updated player.
#[derive(Clone, Debug, PartialEq)]
pub struct PlayerChange {
    pub new: Player,
}

pub trait AuthApi: Send + Sync {
    /// The current session, refreshed if it is about to expire.
    fn session(&self) -> BackendFuture<'_, Option<Session>>;

    fn sign_in_with_password<'a>(
        &'a self,
        email: &'a str,
        password: &'a str,
    ) -> BackendFuture<'a, Session>;

    /// Returns `None` when the account was created but no session was issued
    /// (e.g. email confirmation is required).
    fn sign_up<'a>(&'a self, email: &'a str, password: &'a str)
        -> BackendFuture<'a, Option<Session>>;

    fn sign_out(&self) -> BackendFuture<'_, ()>;
}

pub trait TableApi: Send + Sync {
    // ---- players ----
    fn find_player<'a>(&'a self, id: &'a PlayerId) -> BackendFuture<'a, Option<Player>>;
    fn find_player_by_codename<'a>(&'a self, codename: &'a str)
        -> BackendFuture<'a, Option<Player>>;
    fn insert_player(&self, player: NewPlayer) -> BackendFuture<'_, Player>;
    fn list_players(&self) -> BackendFuture<'_, Vec<Player>>;
    fn update_player_location<'a>(
        &'a self,
        id: &'a PlayerId,
        update: LocationUpdate,
    ) -> BackendFuture<'a, ()>;

    // ---- activity, newest first ----
    fn recent_tags(&self, limit: usize) -> BackendFuture<'_, Vec<Tag>>;
    fn recent_dodges(&self, limit: usize) -> BackendFuture<'_, Vec<Dodge>>;

    // ---- seasons ----
    fn active_season(&self) -> BackendFuture<'_, Option<Season>>;
    fn list_seasons(&self) -> BackendFuture<'_, Vec<Season>>;
    fn insert_season(&self, season: NewSeason) -> BackendFuture<'_, Season>;
    fn end_season<'a>(&'a self, id: &'a SeasonId, end: SeasonEnd) -> BackendFuture<'a, ()>;

    // ---- matches and events ----
    fn active_match(&self) -> BackendFuture<'_, Option<Match>>;
    fn list_matches(&self) -> BackendFuture<'_, Vec<Match>>;
    /// The flash event with `is_active` whose window contains `now`.
    fn active_flash_event(&self, now: DateTime<Utc>) -> BackendFuture<'_, Option<FlashEvent>>;

    fn whispers_for<'a>(&'a self, receiver: &'a PlayerId) -> BackendFuture<'a, Vec<Whisper>>;
}

/// The named remote procedures.
pub trait RpcApi: Send + Sync {
    fn tag_player(&self, args: TagPlayerArgs) -> BackendFuture<'_, bool>;
    fn handle_dodge(&self, args: HandleDodgeArgs) -> BackendFuture<'_, bool>;
    fn get_nearby_players(&self, args: NearbyPlayersArgs) -> BackendFuture<'_, Vec<Player>>;
    fn join_regional_match(&self, args: JoinRegionalMatchArgs) -> BackendFuture<'_, ()>;
    fn activate_disguise(&self) -> BackendFuture<'_, bool>;
    fn send_whisper(&self, args: SendWhisperArgs) -> BackendFuture<'_, bool>;
    fn create_fake_dodge(&self, args: FakeDodgeArgs) -> BackendFuture<'_, bool>;
    fn create_bait_ping(&self, args: BaitPingArgs) -> BackendFuture<'_, bool>;
    /// Last known location of an "it" player, if the tracker may still use it.
    fn use_tracker_ability(&self) -> BackendFuture<'_, Option<Coordinates>>;
    fn use_decoy_ability(&self) -> BackendFuture<'_, bool>;
    fn reset_game(&self) -> BackendFuture<'_, ()>;
}

pub trait RealtimeApi: Send + Sync {
    fn player_updates(&self) -> BackendFuture<'_, PlayerChanges>;
}

/// Everything the game client needs from its backend.
pub trait GameBackend: AuthApi + TableApi + RpcApi + RealtimeApi {}

impl<T: AuthApi + TableApi + RpcApi + RealtimeApi> GameBackend for T {}
