//! Per-player achievements and who they keep running into.

use itertools::Itertools;
use shadow_tag_api_types::{Player, PlayerId, Tag};
use strum::IntoEnumIterator;

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::EnumIter)]
pub enum Badge {
    GhostMode,
    TagGod,
    Uncatchable,
    ZoneMaster,
}

impl Badge {
    pub fn name(self) -> &'static str {
        match self {
            Self::GhostMode => "Ghost Mode",
            Self::TagGod => "Tag God",
            Self::Uncatchable => "Uncatchable",
            Self::ZoneMaster => "Zone Master",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Self::GhostMode => "Survived 5+ dodges",
            Self::TagGod => "5+ successful tags",
            Self::Uncatchable => "3+ tag streak",
            Self::ZoneMaster => "1000+ points earned",
        }
    }

    pub fn unlocked_by(self, player: &Player) -> bool {
        match self {
            Self::GhostMode => player.dodge_count >= 5,
            Self::TagGod => player.total_tags >= 5,
            Self::Uncatchable => player.tag_streak >= 3,
            Self::ZoneMaster => player.points >= 1000,
        }
    }
}

/// Every badge with whether `player` has earned it.
pub fn badges(player: &Player) -> Vec<(Badge, bool)> {
    Badge::iter().map(|b| (b, b.unlocked_by(player))).collect()
}

/// Tags the player gave or received, newest first.
pub fn tag_history<'a>(tags: &'a [Tag], player: &PlayerId) -> Vec<&'a Tag> {
    tags.iter()
        .filter(|t| &t.tagger_id == player || &t.tagged_id == player)
        .sorted_by(|a, b| b.timestamp.cmp(&a.timestamp))
        .collect()
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TagConnection {
    pub opponent: PlayerId,
    /// "Unknown" for players no longer in the roster.
    pub codename: String,
    /// Times the player tagged this opponent.
    pub outgoing: u32,
    /// Times this opponent tagged the player.
    pub incoming: u32,
}

impl TagConnection {
    pub fn total(&self) -> u32 {
        self.outgoing + self.incoming
    }
}

/// The `limit` opponents the player has the most tags with, ties in order of
/// first appearance in `tags`.
pub fn top_connections(
    player: &PlayerId,
    tags: &[Tag],
    roster: &[Player],
    limit: usize,
) -> Vec<TagConnection> {
    let mut connections: Vec<TagConnection> = Vec::new();
    for tag in tags {
        let (opponent, outgoing) = if &tag.tagger_id == player {
            (&tag.tagged_id, true)
        } else if &tag.tagged_id == player {
            (&tag.tagger_id, false)
        } else {
            continue;
        };

        let index = match connections.iter().position(|c| &c.opponent == opponent) {
            Some(index) => index,
            None => {
                let codename = roster
                    .iter()
                    .find(|p| &p.id == opponent)
                    .map_or_else(|| "Unknown".to_string(), |p| p.codename.clone());
                connections.push(TagConnection {
                    opponent: opponent.clone(),
                    codename,
                    outgoing: 0,
                    incoming: 0,
                });
                connections.len() - 1
            }
        };
        if outgoing {
            connections[index].outgoing += 1;
        } else {
            connections[index].incoming += 1;
        }
    }

    connections.sort_by(|a, b| b.total().cmp(&a.total()));
    connections.truncate(limit);
    connections
}
