//! Misdirection helpers.

use rand::Rng;
use shadow_tag_api_types::Coordinates;

/// Bait pings land up to this many degrees from the player, on both axes.
pub const BAIT_SPREAD_DEG: f64 = 0.0005;

/// A point near `origin` (the null island if unknown), moved by one random
/// amount on both axes so the ping drifts diagonally.
pub fn bait_location<R: Rng + ?Sized>(origin: Option<Coordinates>, rng: &mut R) -> Coordinates {
    let origin = origin.unwrap_or(Coordinates::new(0.0, 0.0));
    let offset = rng.random_range(-BAIT_SPREAD_DEG..BAIT_SPREAD_DEG);
    origin.offset(offset, offset)
}
