use chrono::{DateTime, Utc};
use serde::Serialize;
use shadow_tag_api_types::{Dodge, FlashEvent, Match, Player, PlayerId, Season, Tag, Whisper};

/// Everything the UI renders, as of the last refresh.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct GameSnapshot {
    /// A first load has finished, successfully or not.
    pub initialized: bool,
    pub is_loading: bool,
    pub error: Option<String>,
    pub current_player: Option<Player>,
    pub players: Vec<Player>,
    /// Newest first.
    pub tags: Vec<Tag>,
    /// Newest first.
    pub dodges: Vec<Dodge>,
    pub nearby_players: Vec<Player>,
    pub seasons: Vec<Season>,
    pub current_season: Option<Season>,
    pub current_match: Option<Match>,
    pub matches: Vec<Match>,
    pub location_error: Option<String>,
    pub whispers: Vec<Whisper>,
    pub last_location_update: Option<DateTime<Utc>>,
    pub current_event: Option<FlashEvent>,
    pub is_tracking: bool,
}

impl GameSnapshot {
    pub fn current_player_id(&self) -> Option<&PlayerId> {
        self.current_player.as_ref().map(|p| &p.id)
    }

    pub fn player(&self, id: &PlayerId) -> Option<&Player> {
        self.players.iter().find(|p| &p.id == id)
    }

    pub fn is_signed_in(&self) -> bool {
        self.current_player.is_some()
    }
}
