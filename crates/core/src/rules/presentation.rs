//! Player-facing names and blurbs.

use shadow_tag_api_types::{Coordinates, EventType, MysteryRole, PlayerStatus, PowerUps};
use strum::IntoEnumIterator;
use unicode_segmentation::UnicodeSegmentation;

pub fn status_label(status: PlayerStatus) -> &'static str {
    match status {
        PlayerStatus::Neutral => "Neutral",
        PlayerStatus::It => "It",
        PlayerStatus::Out => "Out",
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Blurb {
    pub title: &'static str,
    pub description: &'static str,
}

/// `tag_reversal` changes nothing in the rules the client sees; it is
/// announced like any other event.
pub fn event_blurb(kind: Option<EventType>) -> Blurb {
    match kind {
        Some(EventType::DoubleTag) => Blurb {
            title: "Double Tag Hour!",
            description: "All tags are worth double points!",
        },
        Some(EventType::SilentMode) => Blurb {
            title: "Silent Mode",
            description: "Player radar is disabled - trust no one!",
        },
        Some(EventType::TagReversal) => Blurb {
            title: "Tag Reversal",
            description: "The last person tagged becomes \"It\" again!",
        },
        None => Blurb {
            title: "Flash Event",
            description: "Something unexpected is happening!",
        },
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoleCard {
    pub title: &'static str,
    pub description: &'static str,
    /// Label of the role's button; the mole has none.
    pub action: Option<&'static str>,
}

pub fn role_card(role: MysteryRole) -> Option<RoleCard> {
    match role {
        MysteryRole::None => None,
        MysteryRole::Tracker => Some(RoleCard {
            title: "The Tracker",
            description: "You can ping the last known location of \"It\" once per game.",
            action: Some("Locate \"It\""),
        }),
        MysteryRole::Decoy => Some(RoleCard {
            title: "The Decoy",
            description: "You appear as \"It\" to everyone but aren't - cause chaos!",
            action: Some("Toggle Decoy"),
        }),
        MysteryRole::Mole => Some(RoleCard {
            title: "The Mole",
            description: "You are controlled by the system to confuse others.",
            action: None,
        }),
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, strum::EnumIter)]
pub enum PowerUp {
    ExtraDodge,
    ShadowCloak,
    ReverseTag,
}

impl PowerUp {
    pub fn blurb(self) -> Blurb {
        match self {
            Self::ExtraDodge => Blurb {
                title: "Extra Dodge",
                description: "One additional dodge per day",
            },
            Self::ShadowCloak => Blurb {
                title: "Shadow Cloak",
                description: "Hide from the map for 15 minutes",
            },
            Self::ReverseTag => Blurb {
                title: "Reverse Tag",
                description: "Flip incoming tags back to the tagger",
            },
        }
    }

    pub fn held_in(self, power_ups: &PowerUps) -> bool {
        match self {
            Self::ExtraDodge => power_ups.extra_dodge,
            Self::ShadowCloak => power_ups.shadow_cloak,
            Self::ReverseTag => power_ups.reverse_tag,
        }
    }
}

pub fn held_power_ups(power_ups: &PowerUps) -> Vec<PowerUp> {
    PowerUp::iter().filter(|p| p.held_in(power_ups)).collect()
}

/// First two characters of the codename, `??` when it has none.
pub fn avatar_initials(codename: &str) -> String {
    let initials: String = codename.graphemes(true).take(2).collect();
    if initials.is_empty() {
        "??".into()
    } else {
        initials
    }
}

pub fn hunters_label(count: usize) -> String {
    match count {
        1 => "1 player hunting".into(),
        n => format!("{n} players hunting"),
    }
}

/// Six decimals, roughly 10 cm.
pub fn format_coordinates(location: Coordinates) -> String {
    format!("{:.6}, {:.6}", location.lat, location.lng)
}
