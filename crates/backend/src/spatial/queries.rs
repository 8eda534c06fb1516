//! Distance calculations between player positions.
//!
//! Uses the Haversine formula for distances on Earth's surface.

use geo::{HaversineDistance, Point};
use shadow_tag_api_types::Coordinates;

/// Haversine distance between two positions in meters
pub fn haversine_distance(a: Coordinates, b: Coordinates) -> f64 {
    Point::from(a).haversine_distance(&Point::from(b))
}

/// Convert degrees to approximate meters at equator (for bounding box queries)
pub fn degrees_to_meters_approx(degrees: f64) -> f64 {
    degrees * 111_320.0
}

/// Convert meters to degrees at equator (for bounding box queries)
pub fn meters_to_degrees_approx(meters: f64) -> f64 {
    meters / 111_320.0
}

/// A degree radius that covers `meters` in every direction at `lat`.
///
/// Longitude degrees shrink towards the poles, so the envelope widens by
/// `1 / cos(lat)`.
pub fn search_radius_degrees(meters: f64, lat: f64) -> f64 {
    let cos = lat.to_radians().cos().abs().max(0.01);
    meters_to_degrees_approx(meters) / cos
}
