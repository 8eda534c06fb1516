//! A scripted round over the in-memory backend, for trying the rules
//! without a server.

use std::sync::Arc;

use anyhow::{Context, Result, bail};
use chrono::Utc;
use shadow_tag_api_types::{Coordinates, HandleDodgeArgs, Player, PlayerId, PlayerStatus};
use shadow_tag_backend::{InMemoryBackend, RpcApi};
use shadow_tag_core::location::SimulatedGeolocation;
use shadow_tag_core::store::{GameSnapshot, GameStore};

const RUNNERS: [&str; 4] = ["sparrow", "moth", "heron", "vole"];

/// Where the demo round takes place.
pub const DEFAULT_ORIGIN: Coordinates = Coordinates {
    lat: 40.7580,
    lng: -73.9855,
};

/// Plays one round as `codename`: join a match (becoming it), tag the
/// first runner in reach, then watch another runner dodge the new it. Returns the final snapshot.
pub async fn run(codename: &str, origin: Coordinates) -> Result<GameSnapshot> {
    let backend = InMemoryBackend::new();
    for (i, runner) in RUNNERS.iter().enumerate() {
        let step = 0.0004 * (i as f64 + 1.0);
        let mut player = Player::new(PlayerId::new(*runner), *runner, Utc::now());
        player.location = Some(origin.offset(step, -step));
        backend.seed_player(player);
    }

    let geolocation = Arc::new(SimulatedGeolocation::new());
    geolocation.move_to(origin, 8.0);
    let store = GameStore::new(Arc::new(backend.clone()), geolocation);

    store.init_game().await.context("Failed to load the demo world")?;
    store
        .signup(codename, "demo-password", None)
        .await
        .context("Failed to register the demo player")?;
    log::info!("Signed up as {codename}");

    store.join_match().await.context("Failed to join a match")?;
    let me = store.current_player().context("Demo player vanished")?;
    if me.status != PlayerStatus::It {
        bail!("{codename} should be it after starting a match");
    }
    log::info!("{codename} started a match and is it");

    let target = store
        .snapshot()
        .nearby_players
        .iter()
        .find(|p| p.is_neutral())
        .map(|p| p.id.clone());
    let Some(target) = target else {
        bail!("No runner within reach");
    };
    store.tag_player(&target).await.context("Tag failed")?;
    log::info!("{codename} tagged {target}");

    let dodger = RUNNERS
        .iter()
        .map(|r| PlayerId::new(*r))
        .find(|id| *id != target)
        .context("No runner left to dodge")?;
    let dodged = backend
        .handle_dodge(HandleDodgeArgs {
            dodging_player_id: dodger.clone(),
            dodged_player_id: target.clone(),
            dodge_location: origin,
        })
        .await?;
    if dodged {
        log::info!("{dodger} dodged {target}");
    }

    store.stop_location_tracking().await;
    store.refresh().await;
    Ok(store.snapshot())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_demo_round() {
        let snapshot = run("warden", DEFAULT_ORIGIN).await.unwrap();

        let me = snapshot.current_player.as_ref().unwrap();
        assert_eq!(me.total_tags, 1);
        assert_eq!(me.points, 100);
        assert!(me.is_neutral());
        assert_eq!(snapshot.tags.len(), 1);
        assert_eq!(snapshot.players.iter().filter(|p| p.is_it()).count(), 1);
        assert_eq!(snapshot.dodges.len(), 1);
    }
}
