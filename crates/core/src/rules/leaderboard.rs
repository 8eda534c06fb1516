//! Leaderboard ordering and headline numbers.

use itertools::Itertools;
use shadow_tag_api_types::{Player, PlayerStatus};

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, strum::Display, strum::EnumString, strum::EnumIter,
)]
#[strum(serialize_all = "snake_case")]
pub enum SortField {
    #[default]
    Points,
    Tags,
    Dodges,
    Streak,
}

impl SortField {
    pub fn key(self, player: &Player) -> i64 {
        match self {
            Self::Points => player.points,
            Self::Tags => player.total_tags.into(),
            Self::Dodges => player.dodge_count.into(),
            Self::Streak => player.tag_streak.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    #[default]
    Descending,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LeaderboardSort {
    pub field: SortField,
    pub direction: SortDirection,
}

impl LeaderboardSort {
    /// Clicking the current column flips it; a new column starts descending.
    pub fn toggle(self, field: SortField) -> Self {
        if field != self.field {
            return Self {
                field,
                direction: SortDirection::Descending,
            };
        }
        let direction = match self.direction {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        };
        Self { field, direction }
    }

    pub fn indicator(&self) -> &'static str {
        match self.direction {
            SortDirection::Ascending => "↑",
            SortDirection::Descending => "↓",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ranked<'a> {
    /// 1-based.
    pub rank: usize,
    pub player: &'a Player,
}

/// Stable: equal keys keep their input order.
pub fn sort_players(players: &[Player], sort: LeaderboardSort) -> Vec<&Player> {
    players
        .iter()
        .sorted_by(|a, b| {
            let ordering = sort.field.key(a).cmp(&sort.field.key(b));
            match sort.direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            }
        })
        .collect()
}

pub fn ranked(players: &[Player], sort: LeaderboardSort) -> Vec<Ranked<'_>> {
    sort_players(players, sort)
        .into_iter()
        .enumerate()
        .map(|(i, player)| Ranked { rank: i + 1, player })
        .collect()
}

/// The first of `players` with the highest key.
pub fn leader(players: &[Player], field: SortField) -> Option<&Player> {
    sort_players(players, LeaderboardSort { field, direction: SortDirection::Descending })
        .into_iter()
        .next()
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Headliners<'a> {
    pub top_tagger: Option<&'a Player>,
    pub top_dodger: Option<&'a Player>,
    pub top_streaker: Option<&'a Player>,
    pub top_scorer: Option<&'a Player>,
}

pub fn headliners(players: &[Player]) -> Headliners<'_> {
    Headliners {
        top_tagger: leader(players, SortField::Tags),
        top_dodger: leader(players, SortField::Dodges),
        top_streaker: leader(players, SortField::Streak),
        top_scorer: leader(players, SortField::Points),
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Turnout {
    /// Everyone not out.
    pub active: usize,
    pub neutral: usize,
}

pub fn turnout(players: &[Player]) -> Turnout {
    Turnout {
        active: players.iter().filter(|p| p.status != PlayerStatus::Out).count(),
        neutral: players.iter().filter(|p| p.is_neutral()).count(),
    }
}
