//! R-tree nodes for nearby-player queries.
//!
//! ## Two-Stage Filtering
//!
//! 1. **R-tree filter**: Euclidean distance in degree space, with a radius
//!    widened for the latitude so nothing inside the real circle is dropped
//! 2. **Haversine filter**: accurate geodesic distance on the survivors

use rstar::{AABB, PointDistance, RTree, RTreeObject};
use shadow_tag_api_types::Coordinates;

use crate::spatial::queries::{haversine_distance, search_radius_degrees};

#[derive(Clone, Debug)]
pub struct PlayerNode<T> {
    pub item: T,
    pub location: Coordinates,
    point: [f64; 2],
}

impl<T> PlayerNode<T> {
    pub fn new(location: Coordinates, item: T) -> Self {
        Self {
            item,
            location,
            point: [location.lng, location.lat],
        }
    }
}

impl<T> RTreeObject for PlayerNode<T> {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl<T> PointDistance for PlayerNode<T> {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.point[0] - point[0];
        let dy = self.point[1] - point[1];
        dx * dx + dy * dy
    }
}

/// Items within `radius_m` meters of `center`, nearest first, with their distance.
pub fn within_radius<T>(
    tree: &RTree<PlayerNode<T>>,
    center: Coordinates,
    radius_m: f64,
) -> Vec<(&PlayerNode<T>, f64)> {
    if radius_m <= 0.0 || !radius_m.is_finite() {
        return Vec::new();
    }

    let radius_deg = search_radius_degrees(radius_m, center.lat);
    let mut hits: Vec<_> = tree
        .locate_within_distance([center.lng, center.lat], radius_deg * radius_deg)
        .map(|node| (node, haversine_distance(center, node.location)))
        .filter(|(_, distance)| *distance <= radius_m)
        .collect();

    hits.sort_by(|a, b| a.1.total_cmp(&b.1));
    hits
}
