//! Numbers for the admin dashboard.

use chrono::{DateTime, TimeZone};
use shadow_tag_api_types::{Match, Player, PlayerStatus, Tag};

use super::leaderboard::{LeaderboardSort, SortDirection, SortField, sort_players};

pub const TOP_LIST_LEN: usize = 5;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AdminStats<'a> {
    pub active_players: usize,
    pub it_players: usize,
    pub active_matches: usize,
    pub tags_today: usize,
    pub top_taggers: Vec<&'a Player>,
    pub top_dodgers: Vec<&'a Player>,
}

fn top(players: &[Player], field: SortField) -> Vec<&Player> {
    let mut sorted = sort_players(
        players,
        LeaderboardSort {
            field,
            direction: SortDirection::Descending,
        },
    );
    sorted.truncate(TOP_LIST_LEN);
    sorted
}

/// "Today" is the calendar day of `now` in `now`'s timezone.
pub fn admin_stats<'a, Tz: TimeZone>(
    players: &'a [Player],
    matches: &[Match],
    tags: &[Tag],
    now: &DateTime<Tz>,
) -> AdminStats<'a> {
    let today = now.date_naive();
    AdminStats {
        active_players: players.iter().filter(|p| p.status != PlayerStatus::Out).count(),
        it_players: players.iter().filter(|p| p.is_it()).count(),
        active_matches: matches.iter().filter(|m| m.is_active).count(),
        tags_today: tags
            .iter()
            .filter(|t| t.timestamp.with_timezone(&now.timezone()).date_naive() == today)
            .count(),
        top_taggers: top(players, SortField::Tags),
        top_dodgers: top(players, SortField::Dodges),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, FixedOffset, Utc};
    use shadow_tag_api_types::{Coordinates, MatchId, PlayerId, TagId};

    use super::*;

    fn tag(at: DateTime<Utc>) -> Tag {
        Tag {
            id: TagId::new("t"),
            tagger_id: PlayerId::new("a"),
            tagged_id: PlayerId::new("b"),
            location: Coordinates::new(0.0, 0.0),
            timestamp: at,
        }
    }

    fn game(is_active: bool) -> Match {
        Match {
            id: MatchId::new("m"),
            started_at: DateTime::<Utc>::UNIX_EPOCH,
            ended_at: None,
            duration: None,
            is_active,
            winner_id: None,
            created_at: None,
            region_lat: None,
            region_lng: None,
            region_name: None,
        }
    }

    #[test]
    fn test_counts() {
        let mut players: Vec<Player> = (0..7)
            .map(|i| {
                let mut p = Player::new(PlayerId::new(format!("p{i}")), format!("p{i}"), DateTime::<Utc>::UNIX_EPOCH);
                p.total_tags = i;
                p.dodge_count = 10 - i;
                p
            })
            .collect();
        players[0].status = PlayerStatus::Out;
        players[1].status = PlayerStatus::It;

        let now: DateTime<Utc> = "2024-05-01T12:00:00Z".parse().unwrap();
        let tags = vec![tag(now - Duration::hours(1)), tag(now - Duration::hours(13))];
        let stats = admin_stats(&players, &[game(true), game(false)], &tags, &now);

        assert_eq!(stats.active_players, 6);
        assert_eq!(stats.it_players, 1);
        assert_eq!(stats.active_matches, 1);
        assert_eq!(stats.tags_today, 1);
        assert_eq!(stats.top_taggers.len(), 5);
        assert_eq!(stats.top_taggers[0].codename, "p6");
        assert_eq!(stats.top_dodgers[0].codename, "p0");
    }

    #[test]
    fn test_today_follows_timezone() {
        let now: DateTime<Utc> = "2024-05-01T02:00:00Z".parse().unwrap();
        let tags = vec![tag("2024-04-30T23:00:00Z".parse().unwrap())];

        assert_eq!(admin_stats(&[], &[], &tags, &now).tags_today, 0);

        let new_york = now.with_timezone(&FixedOffset::west_opt(4 * 3600).unwrap());
        assert_eq!(admin_stats(&[], &[], &tags, &new_york).tags_today, 1);
    }
}
