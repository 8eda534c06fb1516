use std::time::Duration;

use shadow_tag_api_types::Coordinates;
use shadow_tag_backend::spatial::haversine_distance;
use tokio::time::Instant;

use super::LocationFix;
use crate::config::GameConfig;

/// Why a fix was not pushed to the backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum SkipReason {
    NoPlayer,
    TooSoon,
    TooClose,
    LowAccuracy,
}

/// Gates location pushes on accuracy, elapsed time and distance moved.
#[derive(Clone, Debug)]
pub struct LocationThrottle {
    min_interval: Duration,
    min_distance_m: f64,
    max_accuracy_m: f64,
    last_push: Option<Instant>,
}

impl LocationThrottle {
    pub fn new(config: &GameConfig) -> Self {
        Self {
            min_interval: config.min_update_interval(),
            min_distance_m: config.min_distance_change_m,
            max_accuracy_m: config.max_accuracy_m,
            last_push: None,
        }
    }

    pub fn too_soon(&self, now: Instant) -> bool {
        self.last_push
            .is_some_and(|last| now.saturating_duration_since(last) < self.min_interval)
    }

    pub fn accurate_enough(&self, fix: &LocationFix) -> bool {
        fix.accuracy_m <= self.max_accuracy_m
    }

    /// A fix with nothing to compare against always counts as a move.
    pub fn moved_enough(&self, last_known: Option<Coordinates>, fix: &LocationFix) -> bool {
        last_known.is_none_or(|last| haversine_distance(last, fix.coordinates) >= self.min_distance_m)
    }

    /// Checks a watched fix in the order accuracy, time, distance.
    pub fn check(
        &self,
        fix: &LocationFix,
        last_known: Option<Coordinates>,
        now: Instant,
    ) -> Result<(), SkipReason> {
        if !self.accurate_enough(fix) {
            return Err(SkipReason::LowAccuracy);
        }
        if self.too_soon(now) {
            return Err(SkipReason::TooSoon);
        }
        if !self.moved_enough(last_known, fix) {
            return Err(SkipReason::TooClose);
        }
        Ok(())
    }

    pub fn record_push(&mut self, now: Instant) {
        self.last_push = Some(now);
    }

    pub fn reset(&mut self) {
        self.last_push = None;
    }
}
