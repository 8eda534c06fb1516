//! Heat data for the activity map: fading recent tags and player clusters.

use chrono::{DateTime, Duration, Utc};
use geojson::{Feature, FeatureCollection, Geometry, Value};
use shadow_tag_api_types::{Coordinates, Player, Tag, TagId};

pub const RECENT_TAG_MINUTES: i64 = 10;
/// Zone cells are 0.01° on each axis.
pub const ZONE_CELLS_PER_DEGREE: f64 = 100.0;

#[derive(Clone, Debug, PartialEq)]
pub struct TagHeat {
    pub id: TagId,
    pub location: Coordinates,
    pub timestamp: DateTime<Utc>,
    /// 1 for a tag made now, fading linearly to 0 at the window's edge.
    pub intensity: f64,
}

pub fn recent_tag_heat(tags: &[Tag], now: DateTime<Utc>) -> Vec<TagHeat> {
    let window = Duration::minutes(RECENT_TAG_MINUTES);
    let window_ms = window.num_milliseconds() as f64;
    tags.iter()
        .filter(|t| t.timestamp > now - window)
        .map(|t| {
            let age_ms = (now - t.timestamp).num_milliseconds() as f64;
            TagHeat {
                id: t.id.clone(),
                location: t.location,
                timestamp: t.timestamp,
                intensity: (1.0 - age_ms / window_ms).clamp(0.0, 1.0),
            }
        })
        .collect()
}

/// Rounds half up, so -12.5 lands on -12 like the map's grid does.
fn cell(degrees: f64) -> i64 {
    (degrees * ZONE_CELLS_PER_DEGREE + 0.5).floor() as i64
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ZoneKey {
    pub lat_cell: i64,
    pub lng_cell: i64,
}

impl ZoneKey {
    pub fn of(location: Coordinates) -> Self {
        Self {
            lat_cell: cell(location.lat),
            lng_cell: cell(location.lng),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ActivityZone {
    pub key: ZoneKey,
    /// Location of the first player seen in the cell.
    pub anchor: Coordinates,
    pub player_count: usize,
    pub has_it_player: bool,
    /// Sum of the intensities of recent tags in the cell.
    pub recent_activity: f64,
}

impl ActivityZone {
    pub fn label(&self) -> &'static str {
        if self.has_it_player {
            "Danger Zone"
        } else {
            "Activity Zone"
        }
    }
}

/// Groups located players into cells in order of first appearance. Players
/// with no location are left out.
pub fn activity_zones(players: &[Player], heat: &[TagHeat]) -> Vec<ActivityZone> {
    let mut zones: Vec<ActivityZone> = Vec::new();
    for player in players {
        let Some(location) = player.location else {
            continue;
        };
        let key = ZoneKey::of(location);
        match zones.iter_mut().find(|z| z.key == key) {
            Some(zone) => {
                zone.player_count += 1;
                zone.has_it_player |= player.is_it();
            }
            None => zones.push(ActivityZone {
                key,
                anchor: location,
                player_count: 1,
                has_it_player: player.is_it(),
                recent_activity: 0.0,
            }),
        }
    }

    for zone in &mut zones {
        zone.recent_activity = heat
            .iter()
            .filter(|h| ZoneKey::of(h.location) == zone.key)
            .map(|h| h.intensity)
            .sum();
    }
    zones
}

fn point(location: Coordinates) -> Geometry {
    let p: geo::Point = location.into();
    Geometry::new(Value::Point(vec![p.x(), p.y()]))
}

fn feature(location: Coordinates, properties: serde_json::Map<String, serde_json::Value>) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(point(location)),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

/// Zones and tag heat as one collection for a map layer.
pub fn to_feature_collection(zones: &[ActivityZone], heat: &[TagHeat]) -> FeatureCollection {
    let zone_features = zones.iter().map(|zone| {
        let mut properties = serde_json::Map::new();
        properties.insert("kind".to_string(), serde_json::json!("zone"));
        properties.insert("label".to_string(), serde_json::json!(zone.label()));
        properties.insert("player_count".to_string(), serde_json::json!(zone.player_count));
        properties.insert("has_it_player".to_string(), serde_json::json!(zone.has_it_player));
        properties.insert("recent_activity".to_string(), serde_json::json!(zone.recent_activity));
        feature(zone.anchor, properties)
    });

    let heat_features = heat.iter().map(|h| {
        let mut properties = serde_json::Map::new();
        properties.insert("kind".to_string(), serde_json::json!("tag"));
        properties.insert("tag_id".to_string(), serde_json::json!(h.id.as_str()));
        properties.insert("intensity".to_string(), serde_json::json!(h.intensity));
        properties.insert("timestamp".to_string(), serde_json::json!(h.timestamp.to_rfc3339()));
        feature(h.location, properties)
    });

    FeatureCollection {
        bbox: None,
        features: zone_features.chain(heat_features).collect(),
        foreign_members: None,
    }
}
