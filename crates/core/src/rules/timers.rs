//! Countdowns shown next to actions.
//!
//! Every function takes `now` explicitly and never goes negative: a deadline
//! in the past reads as zero.

use chrono::{DateTime, Duration, Utc};
use shadow_tag_api_types::{FlashEvent, Match, Player};

pub const DODGE_COOLDOWN_HOURS: i64 = 8;
/// How long a player may stay "it" before the backend reassigns the role.
pub const IT_LIMIT_HOURS: i64 = 24;
pub const DEFAULT_MATCH_MINUTES: i64 = 30;

fn until(deadline: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (deadline - now).max(Duration::zero())
}

pub fn dodge_cooldown_remaining(last_dodge_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Duration {
    last_dodge_at
        .map(|at| until(at + Duration::hours(DODGE_COOLDOWN_HOURS), now))
        .unwrap_or_else(Duration::zero)
}

/// `"{h}h {m}m"`
pub fn format_cooldown(remaining: Duration) -> String {
    let minutes = remaining.num_minutes().max(0);
    format!("{}h {}m", minutes / 60, minutes % 60)
}

/// `HH:MM:SS`
pub fn format_hms(remaining: Duration) -> String {
    let seconds = remaining.num_seconds().max(0);
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

/// `M:SS`
pub fn format_minutes_seconds(remaining: Duration) -> String {
    let seconds = remaining.num_seconds().max(0);
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ItCountdown {
    pub remaining: Duration,
    /// Less than an hour left.
    pub expiring: bool,
}

impl ItCountdown {
    pub fn display(&self) -> String {
        format_hms(self.remaining)
    }
}

/// Time left as "it"; `None` unless the player is it with a known start.
pub fn it_countdown(player: &Player, now: DateTime<Utc>) -> Option<ItCountdown> {
    if !player.is_it() {
        return None;
    }
    let became_it_at = player.became_it_at?;
    let remaining = until(became_it_at + Duration::hours(IT_LIMIT_HOURS), now);
    Some(ItCountdown {
        remaining,
        expiring: remaining.num_hours() < 1,
    })
}

pub fn disguise_remaining(player: &Player, now: DateTime<Utc>) -> Option<Duration> {
    if !player.is_disguised_at(now) {
        return None;
    }
    player.disguise_until.map(|end| until(end, now))
}

pub fn flash_event_remaining(event: &FlashEvent, now: DateTime<Utc>) -> Duration {
    until(event.ends_at, now)
}

/// Whole minutes left in the match, floored.
pub fn match_minutes_remaining(game: &Match, now: DateTime<Utc>) -> i64 {
    let length = game
        .parsed_duration()
        .unwrap_or_else(|| Duration::minutes(DEFAULT_MATCH_MINUTES));
    until(game.started_at + length, now).num_minutes()
}

#[cfg(test)]
mod tests {
    use shadow_tag_api_types::{EventType, FlashEventId, MatchId, PlayerId, PlayerStatus};

    use super::*;

    fn now() -> DateTime<Utc> {
        "2024-05-01T12:00:00Z".parse().unwrap()
    }

    #[test]
    fn test_dodge_cooldown() {
        let remaining = dodge_cooldown_remaining(Some(now() - Duration::minutes(90)), now());

        assert_eq!(format_cooldown(remaining), "6h 30m");
        assert!(dodge_cooldown_remaining(None, now()).is_zero());
        assert!(dodge_cooldown_remaining(Some(now() - Duration::days(1)), now()).is_zero());
    }

    #[test]
    fn test_it_countdown() {
        let mut player = Player::new(PlayerId::new("p"), "p", now());
        assert_eq!(it_countdown(&player, now()), None);

        player.status = PlayerStatus::It;
        player.became_it_at = Some(now() - Duration::hours(2));
        let countdown = it_countdown(&player, now()).unwrap();
        assert_eq!(countdown.display(), "22:00:00");
        assert!(!countdown.expiring);

        player.became_it_at = Some(now() - Duration::seconds(23 * 3600 + 59 * 60 + 1));
        let countdown = it_countdown(&player, now()).unwrap();
        assert_eq!(countdown.display(), "00:00:59");
        assert!(countdown.expiring);

        player.became_it_at = Some(now() - Duration::hours(30));
        assert_eq!(it_countdown(&player, now()).unwrap().display(), "00:00:00");
    }

    #[test]
    fn test_disguise_and_event_countdowns() {
        let mut player = Player::new(PlayerId::new("p"), "p", now());
        player.disguise_active = true;
        player.disguise_until = Some(now() + Duration::seconds(95));

        let remaining = disguise_remaining(&player, now()).unwrap();
        assert_eq!(format_minutes_seconds(remaining), "1:35");

        player.disguise_until = Some(now() - Duration::seconds(1));
        assert_eq!(disguise_remaining(&player, now()), None);

        let event = FlashEvent {
            id: FlashEventId::new("f"),
            kind: EventType::SilentMode,
            started_at: now() - Duration::minutes(50),
            ends_at: now() + Duration::seconds(605),
            is_active: true,
        };
        assert_eq!(format_minutes_seconds(flash_event_remaining(&event, now())), "10:05");
    }

    #[test]
    fn test_match_minutes_remaining() {
        let mut game = Match {
            id: MatchId::new("m"),
            started_at: now() - Duration::seconds(61),
            ended_at: None,
            duration: Some("00:30:00".into()),
            is_active: true,
            winner_id: None,
            created_at: None,
            region_lat: None,
            region_lng: None,
            region_name: None,
        };
        assert_eq!(match_minutes_remaining(&game, now()), 28);

        game.duration = None;
        game.started_at = now() - Duration::hours(1);
        assert_eq!(match_minutes_remaining(&game, now()), 0);
    }
}
