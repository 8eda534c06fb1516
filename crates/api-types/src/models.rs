//! Records mirrored from backend rows.
//!
//! These have no lifecycle on the client: the backend creates and mutates them,
//! the client reads snapshots and displays them.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::identifiers::*;

// ============================================================================
// Enums
// ============================================================================

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PlayerStatus {
    #[default]
    Neutral,
    It,
    Out,
}

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MysteryRole {
    #[default]
    None,
    Tracker,
    Decoy,
    Mole,
}

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EventType {
    DoubleTag,
    SilentMode,
    TagReversal,
}

// ============================================================================
// Value types
// ============================================================================

/// A WGS84 position as the backend stores it (`{"lat": .., "lng": ..}`).
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Offset both axes by the given number of degrees.
    pub fn offset(&self, lat_deg: f64, lng_deg: f64) -> Self {
        Self {
            lat: self.lat + lat_deg,
            lng: self.lng + lng_deg,
        }
    }
}

impl From<Coordinates> for geo::Point {
    fn from(c: Coordinates) -> Self {
        geo::Point::new(c.lng, c.lat)
    }
}

impl From<geo::Point> for Coordinates {
    fn from(p: geo::Point) -> Self {
        Self { lat: p.y(), lng: p.x() }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PowerUps {
    #[serde(alias = "extra_dodge")]
    pub extra_dodge: bool,
    #[serde(alias = "shadow_cloak")]
    pub shadow_cloak: bool,
    #[serde(alias = "reverse_tag")]
    pub reverse_tag: bool,
}

/// Treats an explicit JSON `null` the same as a missing column.
fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

// ============================================================================
// Rows
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub codename: String,
    #[serde(default, deserialize_with = "nullable")]
    pub status: PlayerStatus,
    #[serde(default, deserialize_with = "nullable")]
    pub joined_at: DateTime<Utc>,
    #[serde(default)]
    pub last_tagged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub became_it_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "nullable")]
    pub tag_streak: u32,
    #[serde(default, deserialize_with = "nullable")]
    pub total_tags: u32,
    #[serde(default, deserialize_with = "nullable")]
    pub is_admin: bool,
    #[serde(default)]
    pub location: Option<Coordinates>,
    #[serde(default, deserialize_with = "nullable")]
    pub points: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub dodge_count: u32,
    #[serde(default)]
    pub last_dodge_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "nullable")]
    pub power_ups: PowerUps,
    #[serde(default)]
    pub last_location_update: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "nullable")]
    pub mystery_role: MysteryRole,
    #[serde(default)]
    pub role_revealed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub role_cooldown: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub disguise_active: bool,
    #[serde(default)]
    pub disguise_until: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "nullable")]
    pub is_additional_it: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub fake_dodge_count: u32,
    #[serde(default)]
    pub last_fake_dodge_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "nullable")]
    pub bait_ping_count: u32,
    #[serde(default)]
    pub last_bait_ping_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "nullable")]
    pub has_used_whisper: bool,
    #[serde(default)]
    pub avatar_id: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

impl Player {
    /// A freshly joined neutral player with every counter at zero.
    pub fn new(id: PlayerId, codename: impl Into<String>, joined_at: DateTime<Utc>) -> Self {
        Self {
            id,
            codename: codename.into(),
            status: PlayerStatus::Neutral,
            joined_at,
            last_tagged_at: None,
            became_it_at: None,
            tag_streak: 0,
            total_tags: 0,
            is_admin: false,
            location: None,
            points: 0,
            dodge_count: 0,
            last_dodge_at: None,
            power_ups: PowerUps::default(),
            last_location_update: None,
            mystery_role: MysteryRole::None,
            role_revealed_at: None,
            role_cooldown: None,
            disguise_active: false,
            disguise_until: None,
            is_additional_it: false,
            fake_dodge_count: 0,
            last_fake_dodge_at: None,
            bait_ping_count: 0,
            last_bait_ping_at: None,
            has_used_whisper: false,
            avatar_id: None,
            avatar_url: None,
        }
    }

    pub fn is_it(&self) -> bool {
        self.status == PlayerStatus::It
    }

    pub fn is_neutral(&self) -> bool {
        self.status == PlayerStatus::Neutral
    }

    pub fn is_disguised_at(&self, now: DateTime<Utc>) -> bool {
        self.disguise_active && self.disguise_until.is_some_and(|until| until > now)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub started_at: DateTime<Utc>,
    #[serde(default)]
    pub ended_at: Option<DateTime<Utc>>,
    /// Postgres interval text, e.g. `00:30:00`.
    #[serde(default)]
    pub duration: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub is_active: bool,
    #[serde(default)]
    pub winner_id: Option<PlayerId>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub region_lat: Option<f64>,
    #[serde(default)]
    pub region_lng: Option<f64>,
    #[serde(default)]
    pub region_name: Option<String>,
}

impl Match {
    pub fn region(&self) -> Option<Coordinates> {
        Some(Coordinates::new(self.region_lat?, self.region_lng?))
    }

    /// The match length, if the backend sent a parseable interval.
    pub fn parsed_duration(&self) -> Option<Duration> {
        self.duration.as_deref().and_then(parse_interval)
    }
}

/// Parses the `HH:MM:SS` form Postgres uses for short intervals.
pub fn parse_interval(text: &str) -> Option<Duration> {
    let mut parts = text.trim().split(':');
    let hours: i64 = parts.next()?.parse().ok()?;
    let minutes: i64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next().unwrap_or("0").parse().ok()?;
    if parts.next().is_some() || !(0..60).contains(&minutes) {
        return None;
    }
    Some(Duration::hours(hours) + Duration::minutes(minutes) + Duration::seconds(seconds as i64))
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub tagger_id: PlayerId,
    pub tagged_id: PlayerId,
    pub location: Coordinates,
    #[serde(rename = "created_at", default, deserialize_with = "nullable")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Dodge {
    pub id: DodgeId,
    pub player_id: PlayerId,
    pub dodged_player_id: PlayerId,
    pub location: Coordinates,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Season {
    pub id: SeasonId,
    pub name: String,
    pub start_date: DateTime<Utc>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "nullable")]
    pub is_active: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlashEvent {
    pub id: FlashEventId,
    #[serde(rename = "type")]
    pub kind: EventType,
    pub started_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "nullable")]
    pub is_active: bool,
}

impl FlashEvent {
    pub fn is_running_at(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.started_at <= now && now <= self.ends_at
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Whisper {
    pub id: WhisperId,
    pub sender_id: PlayerId,
    pub receiver_id: PlayerId,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_player_row_with_nulls() {
        let row = serde_json::json!({
            "id": "p1",
            "codename": "nightjar",
            "status": "it",
            "joined_at": "2024-05-01T12:00:00Z",
            "last_tagged_at": null,
            "became_it_at": "2024-05-01T13:00:00Z",
            "tag_streak": 2,
            "total_tags": 4,
            "is_admin": null,
            "location": { "lat": 51.5, "lng": -0.12 },
            "points": 350,
            "dodge_count": 1,
            "last_dodge_at": null,
            "power_ups": null,
            "mystery_role": null
        });

        let player: Player = serde_json::from_value(row).unwrap();
        assert_eq!(player.status, PlayerStatus::It);
        assert!(!player.is_admin);
        assert_eq!(player.power_ups, PowerUps::default());
        assert_eq!(player.mystery_role, MysteryRole::None);
        assert_eq!(player.location, Some(Coordinates::new(51.5, -0.12)));
        assert!(player.avatar_url.is_none());
    }

    #[test]
    fn test_power_ups_accept_both_key_styles() {
        let camel: PowerUps = serde_json::from_str(r#"{"extraDodge": true}"#).unwrap();
        let snake: PowerUps = serde_json::from_str(r#"{"shadow_cloak": true}"#).unwrap();

        assert!(camel.extra_dodge && !camel.shadow_cloak);
        assert!(snake.shadow_cloak && !snake.reverse_tag);
    }

    #[test]
    fn test_tag_reads_created_at_as_timestamp() {
        let tag: Tag = serde_json::from_str(
            r#"{"id":"t1","tagger_id":"a","tagged_id":"b",
                "location":{"lat":1.0,"lng":2.0},"created_at":"2024-05-01T12:00:00Z"}"#,
        )
        .unwrap();

        assert_eq!(tag.timestamp.to_rfc3339(), "2024-05-01T12:00:00+00:00");
    }

    #[test]
    fn test_flash_event_window() {
        let event: FlashEvent = serde_json::from_str(
            r#"{"id":"f1","type":"double_tag","started_at":"2024-05-01T12:00:00Z",
                "ends_at":"2024-05-01T13:00:00Z","is_active":true}"#,
        )
        .unwrap();

        assert_eq!(event.kind, EventType::DoubleTag);
        assert!(event.is_running_at("2024-05-01T12:30:00Z".parse().unwrap()));
        assert!(!event.is_running_at("2024-05-01T13:00:01Z".parse().unwrap()));
    }

    #[test]
    fn test_parse_interval() {
        assert_eq!(parse_interval("00:30:00"), Some(Duration::minutes(30)));
        assert_eq!(parse_interval("01:05:30"), Some(Duration::seconds(3930)));
        assert_eq!(parse_interval("30 minutes"), None);
        assert_eq!(parse_interval("00:75:00"), None);
    }

    #[test]
    fn test_status_strum_names() {
        assert_eq!(PlayerStatus::It.to_string(), "it");
        assert_eq!("out".parse::<PlayerStatus>().unwrap(), PlayerStatus::Out);
        assert_eq!(EventType::TagReversal.to_string(), "tag_reversal");
    }

    #[test]
    fn test_coordinates_point_axes() {
        let point: geo::Point = Coordinates::new(40.0, -74.0).into();
        assert_eq!(point.x(), -74.0);
        assert_eq!(point.y(), 40.0);
    }
}
