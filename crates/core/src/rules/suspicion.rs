//! How jumpy the area is: recent dodges raise suspicion.

use chrono::{DateTime, Duration, Utc};
use shadow_tag_api_types::Dodge;

pub const WINDOW_MINUTES: i64 = 5;
pub const PER_DODGE: u32 = 20;
pub const MAX_LEVEL: u32 = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::Display)]
pub enum SuspicionLabel {
    Low,
    Moderate,
    High,
    Extreme,
}

impl SuspicionLabel {
    pub fn for_level(level: u32) -> Self {
        match level {
            0..20 => Self::Low,
            20..50 => Self::Moderate,
            50..80 => Self::High,
            _ => Self::Extreme,
        }
    }
}

/// 0 to 100.
pub fn suspicion_level(dodges: &[Dodge], now: DateTime<Utc>) -> u32 {
    let since = now - Duration::minutes(WINDOW_MINUTES);
    let recent = dodges.iter().filter(|d| d.created_at > since).count() as u32;
    recent.saturating_mul(PER_DODGE).min(MAX_LEVEL)
}
