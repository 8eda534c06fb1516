//! Remote procedure names and their argument records.
//!
//! Argument field names are exactly the parameter names of the backend's
//! stored procedures.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::identifiers::*;
use crate::models::{Coordinates, PlayerStatus};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Procedure {
    TagPlayer,
    HandleDodge,
    GetNearbyPlayers,
    JoinRegionalMatch,
    ActivateDisguise,
    SendWhisper,
    CreateFakeDodge,
    CreateBaitPing,
    UseTrackerAbility,
    UseDecoyAbility,
    ResetGame,
}

impl Procedure {
    pub fn name(self) -> &'static str {
        self.into()
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct TagPlayerArgs {
    pub tagger_id: PlayerId,
    pub tagged_id: PlayerId,
}

#[derive(Clone, Debug, Serialize)]
pub struct HandleDodgeArgs {
    pub dodging_player_id: PlayerId,
    pub dodged_player_id: PlayerId,
    pub dodge_location: Coordinates,
}

#[derive(Clone, Debug, Serialize)]
pub struct NearbyPlayersArgs {
    pub user_lat: f64,
    pub user_lng: f64,
    pub radius_meters: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct JoinRegionalMatchArgs {
    pub player_id: PlayerId,
    pub player_lat: f64,
    pub player_lng: f64,
}

#[derive(Clone, Debug, Serialize)]
pub struct FakeDodgeArgs {
    pub player_id: PlayerId,
    pub target_id: PlayerId,
    pub dodge_location: Coordinates,
}

#[derive(Clone, Debug, Serialize)]
pub struct BaitPingArgs {
    pub player_id: PlayerId,
    pub ping_location: Coordinates,
}

#[derive(Clone, Debug, Serialize)]
pub struct SendWhisperArgs {
    pub receiver_id: PlayerId,
    pub message: String,
}

/// Body for procedures that take no parameters (`{}`).
#[derive(Clone, Copy, Debug, Default, Serialize)]
pub struct NoArgs {}

// ============================================================================
// Table writes
// ============================================================================

#[derive(Clone, Debug, Serialize)]
pub struct NewPlayer {
    pub id: PlayerId,
    pub codename: String,
    pub avatar_id: String,
    pub avatar_url: String,
    pub status: PlayerStatus,
    pub tag_streak: u32,
    pub total_tags: u32,
}

#[derive(Clone, Debug, Serialize)]
pub struct LocationUpdate {
    pub location: Coordinates,
    pub last_location_update: DateTime<Utc>,
}

#[derive(Clone, Debug, Serialize)]
pub struct NewSeason {
    pub name: String,
    pub is_active: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct SeasonEnd {
    pub is_active: bool,
    pub end_date: DateTime<Utc>,
}

impl SeasonEnd {
    pub fn at(end_date: DateTime<Utc>) -> Self {
        Self {
            is_active: false,
            end_date,
        }
    }
}
