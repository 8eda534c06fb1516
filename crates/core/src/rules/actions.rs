use chrono::{DateTime, Utc};
use shadow_tag_api_types::{MysteryRole, Player};

use super::timers::dodge_cooldown_remaining;

pub fn can_tag(current: &Player, target: &Player) -> bool {
    current.is_it() && target.is_neutral()
}

pub fn can_dodge(current: &Player, target: &Player) -> bool {
    current.is_neutral() && target.is_it()
}

/// Nearby players currently hunting.
pub fn nearby_threats(nearby: &[Player]) -> impl Iterator<Item = &Player> {
    nearby.iter().filter(|p| p.is_it())
}

pub fn shows_dodge_controls(current: &Player, nearby: &[Player]) -> bool {
    current.is_neutral() && nearby_threats(nearby).next().is_some()
}

pub fn dodge_ready(current: &Player, now: DateTime<Utc>) -> bool {
    dodge_cooldown_remaining(current.last_dodge_at, now).is_zero()
}

pub fn shows_whisper_controls(current: &Player) -> bool {
    !current.has_used_whisper
}

/// The disguise button and the "it" countdown share this condition.
pub fn shows_disguise_controls(current: &Player) -> bool {
    current.is_it()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RoleAbility {
    LocateIt,
    ToggleDecoy,
}

pub fn role_ability(role: MysteryRole) -> Option<RoleAbility> {
    match role {
        MysteryRole::Tracker => Some(RoleAbility::LocateIt),
        MysteryRole::Decoy => Some(RoleAbility::ToggleDecoy),
        MysteryRole::Mole | MysteryRole::None => None,
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use shadow_tag_api_types::{PlayerId, PlayerStatus};

    use super::*;

    fn player(id: &str, status: PlayerStatus) -> Player {
        let mut player = Player::new(PlayerId::new(id), id, DateTime::<Utc>::UNIX_EPOCH);
        player.status = status;
        player
    }

    #[test]
    fn test_tag_and_dodge_pairs() {
        let it = player("a", PlayerStatus::It);
        let neutral = player("b", PlayerStatus::Neutral);
        let out = player("c", PlayerStatus::Out);

        assert!(can_tag(&it, &neutral));
        assert!(!can_tag(&it, &out));
        assert!(!can_tag(&neutral, &it));

        assert!(can_dodge(&neutral, &it));
        assert!(!can_dodge(&out, &it));
        assert!(!can_dodge(&neutral, &neutral));
    }

    #[test]
    fn test_dodge_controls_need_a_nearby_hunter() {
        let me = player("me", PlayerStatus::Neutral);
        let calm = vec![player("b", PlayerStatus::Neutral)];
        let hunted = vec![player("b", PlayerStatus::Neutral), player("c", PlayerStatus::It)];

        assert!(!shows_dodge_controls(&me, &calm));
        assert!(shows_dodge_controls(&me, &hunted));
        assert!(!shows_dodge_controls(&player("x", PlayerStatus::It), &hunted));
        assert_eq!(nearby_threats(&hunted).count(), 1);
    }

    #[test]
    fn test_dodge_ready_after_cooldown() {
        let now: DateTime<Utc> = "2024-05-01T12:00:00Z".parse().unwrap();
        let mut me = player("me", PlayerStatus::Neutral);
        assert!(dodge_ready(&me, now));

        me.last_dodge_at = Some(now - Duration::hours(2));
        assert!(!dodge_ready(&me, now));

        me.last_dodge_at = Some(now - Duration::hours(8));
        assert!(dodge_ready(&me, now));
    }

    #[test]
    fn test_role_abilities() {
        assert_eq!(role_ability(MysteryRole::Tracker), Some(RoleAbility::LocateIt));
        assert_eq!(role_ability(MysteryRole::Decoy), Some(RoleAbility::ToggleDecoy));
        assert_eq!(role_ability(MysteryRole::Mole), None);
        assert_eq!(role_ability(MysteryRole::None), None);
    }
}
