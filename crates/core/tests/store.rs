//! Store flows against the in-memory backend.

use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use shadow_tag_backend::{BackendError, InMemoryBackend};
use shadow_tag_core::location::{
    LOW_ACCURACY_MESSAGE, OFFLINE_MESSAGE, PositionFuture, PositionStream, SkipReason,
};
use shadow_tag_core::prelude::*;
use shadow_tag_core::rules::credentials::CredentialError;
use shadow_tag_core::rules::whisper::WhisperError;
use shadow_tag_core::store::JOIN_MATCH_FAILED_MESSAGE;
use tokio::sync::mpsc;

const HERE: Coordinates = Coordinates { lat: 51.5007, lng: -0.1246 };

struct Switch(AtomicBool);

impl Connectivity for Switch {
    fn is_online(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

struct Harness {
    backend: InMemoryBackend,
    geo: Arc<SimulatedGeolocation>,
    online: Arc<Switch>,
    notifications: mpsc::UnboundedReceiver<Notification>,
    store: GameStore,
}

fn harness() -> Harness {
    let backend = InMemoryBackend::new();
    let geo = Arc::new(SimulatedGeolocation::new());
    geo.move_to(HERE, 10.0);
    let online = Arc::new(Switch(AtomicBool::new(true)));
    let (notifier, notifications) = ChannelNotifier::new();

    let config = GameConfig {
        min_update_interval_ms: 0,
        ..GameConfig::default()
    };
    let store = GameStore::builder(Arc::new(backend.clone()), geo.clone())
        .connectivity(online.clone())
        .notifier(Arc::new(notifier))
        .config(config)
        .build();

    Harness {
        backend,
        geo,
        online,
        notifications,
        store,
    }
}

/// Signs up `codename` and returns its id.
async fn sign_up(h: &Harness, codename: &str) -> PlayerId {
    h.store.signup(codename, "hunter22", None).await.unwrap();
    h.store.current_player().unwrap().id
}

fn seed(h: &Harness, id: &str, status: PlayerStatus, location: Coordinates) -> PlayerId {
    let mut player = Player::new(PlayerId::new(id), id, Utc::now());
    player.status = status;
    player.location = Some(location);
    h.backend.seed_player(player);
    PlayerId::new(id)
}

#[tokio::test]
async fn test_signup_creates_player_and_starts_tracking() {
    let h = harness();
    h.store.signup("nightjar", "hunter22", Some("panda")).await.unwrap();

    let snapshot = h.store.snapshot();
    let me = snapshot.current_player.unwrap();
    assert_eq!(me.status, PlayerStatus::Neutral);
    assert_eq!(me.avatar_id.as_deref(), Some("panda"));
    assert!(snapshot.is_tracking);
    assert!(snapshot.last_location_update.is_some());

    assert_eq!(h.backend.player(&me.id).unwrap().location, Some(HERE));
}

#[tokio::test]
async fn test_signup_rejections() {
    let h = harness();

    let short = h.store.signup("ab", "hunter22", None).await;
    assert!(matches!(
        short,
        Err(GameError::Auth(AuthError::Invalid(CredentialError::CodenameLength)))
    ));

    sign_up(&h, "nightjar").await;
    let taken = h.store.signup("nightjar", "hunter22", None).await;
    assert!(matches!(taken, Err(GameError::Auth(AuthError::CodenameTaken))));
}

#[tokio::test]
async fn test_login_messages() {
    let h = harness();
    sign_up(&h, "ghost").await;
    h.store.logout().await.unwrap();
    assert!(h.store.current_player().is_none());
    assert!(!h.store.snapshot().is_tracking);

    let missing = h.store.login("nobody", "hunter22").await.unwrap_err();
    assert_eq!(
        missing.to_string(),
        "Player not found. Please check your codename or sign up."
    );

    let wrong = h.store.login("ghost", "wrong-password").await.unwrap_err();
    assert_eq!(wrong.to_string(), "Invalid password. Please try again.");

    let blank = h.store.login("ghost", "").await.unwrap_err();
    assert_eq!(blank.to_string(), "Please enter both codename and password");

    h.store.login("ghost", "hunter22").await.unwrap();
    assert_eq!(h.store.current_player().unwrap().codename, "ghost");
}

#[tokio::test]
async fn test_tag_flow_refreshes_and_notifies() {
    let mut h = harness();
    let me = sign_up(&h, "hunter").await;
    let prey = seed(&h, "prey", PlayerStatus::Neutral, HERE.offset(0.0005, 0.0));

    let early = h.store.tag_player(&prey).await;
    assert!(matches!(early, Err(GameError::NotAllowed(_))));

    h.backend.update_player(&me, |p| p.status = PlayerStatus::It).unwrap();
    h.store.init_game().await.unwrap();
    assert!(h.store.current_player().unwrap().is_it());
    assert_eq!(h.notifications.try_recv().unwrap(), Notification::status_changed());

    h.store.tag_player(&prey).await.unwrap();

    let snapshot = h.store.snapshot();
    let current = snapshot.current_player.as_ref().unwrap();
    assert!(current.is_neutral());
    assert_eq!(current.total_tags, 1);
    assert_eq!(current.points, 100);
    assert_eq!(snapshot.tags.len(), 1);
    assert!(snapshot.player(&prey).unwrap().is_it());
    assert_eq!(h.notifications.try_recv().unwrap().title, "Status Changed");
}

#[tokio::test]
async fn test_dodge_then_cooldown() {
    let h = harness();
    sign_up(&h, "runner").await;
    let hunter = seed(&h, "hunter", PlayerStatus::It, HERE.offset(0.0005, 0.0));

    h.store.dodge_player(&hunter).await.unwrap();
    let snapshot = h.store.snapshot();
    assert_eq!(snapshot.dodges.len(), 1);
    assert_eq!(snapshot.current_player.unwrap().dodge_count, 1);

    let again = h.store.dodge_player(&hunter).await;
    assert!(matches!(again, Err(GameError::Backend(BackendError::Rejected(_)))));
}

#[tokio::test]
async fn test_location_errors_are_recorded() {
    let h = harness();
    sign_up(&h, "scout").await;
    h.store.stop_location_tracking().await;

    h.geo.fail(GeolocationError::PermissionDenied);
    let denied = h.store.update_location().await;
    assert!(matches!(
        denied,
        Err(GameError::Location(LocationError::Geolocation(GeolocationError::PermissionDenied)))
    ));
    assert!(h.store.snapshot().location_error.unwrap().starts_with("Location access denied"));

    h.geo.move_to(HERE.offset(0.01, 0.0), 250.0);
    h.store.update_location().await.unwrap_err();
    assert_eq!(h.store.snapshot().location_error.as_deref(), Some(LOW_ACCURACY_MESSAGE));

    h.online.0.store(false, Ordering::SeqCst);
    h.store.update_location().await.unwrap_err();
    assert_eq!(h.store.snapshot().location_error.as_deref(), Some(OFFLINE_MESSAGE));

    h.store.clear_location_error();
    assert_eq!(h.store.snapshot().location_error, None);
}

#[tokio::test]
async fn test_small_moves_are_not_pushed() {
    let h = harness();
    sign_up(&h, "scout").await;
    h.store.stop_location_tracking().await;

    h.geo.move_to(HERE.offset(0.00001, 0.0), 5.0);
    let outcome = h.store.update_location().await.unwrap();
    assert_eq!(outcome, LocationOutcome::Skipped(SkipReason::TooClose));

    let moved = HERE.offset(0.001, 0.0);
    h.geo.move_to(moved, 5.0);
    let outcome = h.store.update_location().await.unwrap();
    assert_eq!(outcome, LocationOutcome::Pushed { nearby: 0 });
    assert_eq!(h.store.current_player().unwrap().location, Some(moved));
}

#[tokio::test]
async fn test_watch_pushes_new_positions() {
    let h = harness();
    let me = sign_up(&h, "walker").await;
    seed(&h, "neighbour", PlayerStatus::Neutral, HERE.offset(0.003, 0.0));

    let moved = HERE.offset(0.002, 0.0);
    h.geo.move_to(moved, 5.0);

    tokio::time::timeout(Duration::from_secs(5), async {
        while h.backend.player(&me).unwrap().location != Some(moved) {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("watched position never reached the backend");

    tokio::time::timeout(Duration::from_secs(5), async {
        while h.store.snapshot().nearby_players.is_empty() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("nearby players never refreshed");
}

#[tokio::test]
async fn test_join_match() {
    let h = harness();
    sign_up(&h, "pioneer").await;

    h.store.join_match().await.unwrap();
    let snapshot = h.store.snapshot();
    assert!(snapshot.current_match.is_some());
    assert!(snapshot.current_player.unwrap().is_it());
    assert!(!snapshot.is_loading);

    h.store.stop_location_tracking().await;
    h.geo.fail(GeolocationError::Timeout);
    h.store.join_match().await.unwrap_err();
    let snapshot = h.store.snapshot();
    assert_eq!(snapshot.error.as_deref(), Some(JOIN_MATCH_FAILED_MESSAGE));
    assert!(!snapshot.is_loading);

    h.store.clear_error();
    assert_eq!(h.store.snapshot().error, None);
}

#[tokio::test]
async fn test_single_whisper() {
    let h = harness();
    sign_up(&h, "whisperer").await;
    let target = seed(&h, "target", PlayerStatus::Neutral, HERE);

    let empty = h.store.send_whisper(&target, "   ").await;
    assert!(matches!(empty, Err(GameError::Whisper(WhisperError::Empty))));

    h.store.send_whisper(&target, "Behind you...").await.unwrap();
    assert!(h.store.current_player().unwrap().has_used_whisper);

    let again = h.store.send_whisper(&target, "Look around.").await;
    assert!(matches!(again, Err(GameError::NotAllowed(_))));
}

#[tokio::test]
async fn test_mystery_roles() {
    let h = harness();
    let me = sign_up(&h, "seer").await;
    let it_location = HERE.offset(0.002, 0.002);
    seed(&h, "hunter", PlayerStatus::It, it_location);

    assert!(matches!(h.store.use_tracker_ability().await, Err(GameError::NotAllowed(_))));

    h.backend.grant_role(&me, MysteryRole::Tracker).unwrap();
    h.store.init_game().await.unwrap();
    assert_eq!(h.store.use_tracker_ability().await.unwrap(), Some(it_location));

    h.backend.grant_role(&me, MysteryRole::Decoy).unwrap();
    h.store.init_game().await.unwrap();
    h.store.use_decoy_ability().await.unwrap();
    assert!(h.store.current_player().unwrap().is_additional_it);
}

#[tokio::test]
async fn test_disguise_needs_it() {
    let h = harness();
    let me = sign_up(&h, "masked").await;
    assert!(matches!(h.store.activate_disguise().await, Err(GameError::NotAllowed(_))));

    h.backend.update_player(&me, |p| p.status = PlayerStatus::It).unwrap();
    h.store.init_game().await.unwrap();
    h.store.activate_disguise().await.unwrap();
    assert!(h.store.current_player().unwrap().is_disguised_at(Utc::now()));
}

#[tokio::test]
async fn test_admin_operations() {
    let h = harness();
    let me = sign_up(&h, "warden").await;

    assert!(matches!(h.store.reset_game().await, Err(GameError::NotAdmin)));
    assert!(matches!(h.store.start_season("Spring").await, Err(GameError::NotAdmin)));

    h.backend.set_admin(&me, true).unwrap();
    h.store.init_game().await.unwrap();

    h.store.start_season("Spring").await.unwrap();
    let season = h.store.snapshot().current_season.unwrap();
    assert_eq!(season.name, "Spring");
    assert!(season.is_active);

    h.store.end_current_season().await.unwrap();
    let season = h.store.snapshot().current_season.unwrap();
    assert!(!season.is_active);
    assert!(season.end_date.is_some());

    h.store.join_match().await.unwrap();
    h.store.reset_game().await.unwrap();
    let snapshot = h.store.snapshot();
    assert!(snapshot.current_match.is_none());
    assert!(snapshot.current_player.unwrap().is_neutral());
}

#[tokio::test]
async fn test_mind_games() {
    let h = harness();
    let me = sign_up(&h, "trickster").await;
    let hunter = seed(&h, "hunter", PlayerStatus::It, HERE);

    h.store.fake_dodge(&hunter).await.unwrap();
    assert_eq!(h.store.current_player().unwrap().fake_dodge_count, 1);

    let bait = h.store.bait_ping_near_me().await.unwrap();
    let pings = h.backend.bait_pings();
    assert_eq!(pings.len(), 1);
    assert_eq!(pings[0].player_id, me);
    assert_eq!(pings[0].location, bait);
}

#[tokio::test]
async fn test_restore_session_on_init() {
    let h = harness();
    let me = sign_up(&h, "returner").await;

    // a fresh store over the same backend picks the session up
    let geo = Arc::new(SimulatedGeolocation::new());
    geo.move_to(HERE, 10.0);
    let relaunched = GameStore::new(Arc::new(h.backend.clone()), geo);
    relaunched.init_game().await.unwrap();

    let snapshot = relaunched.snapshot();
    assert!(snapshot.initialized);
    assert_eq!(snapshot.current_player_id(), Some(&me));
    assert!(snapshot.is_tracking);
}

#[tokio::test]
async fn test_subscribers_see_changes() {
    let h = harness();
    let mut updates = h.store.subscribe();
    assert!(!updates.has_changed().unwrap());

    h.store.init_game().await.unwrap();
    assert!(updates.has_changed().unwrap());
    assert!(updates.borrow_and_update().initialized);
}

#[tokio::test]
async fn test_actions_need_a_player() {
    let h = harness();
    assert!(matches!(
        h.store.tag_player(&PlayerId::new("x")).await,
        Err(GameError::NoCurrentPlayer)
    ));
    assert_eq!(
        h.store.update_location().await.unwrap(),
        LocationOutcome::Skipped(SkipReason::NoPlayer)
    );
}

/// Answers every position request with the held fix and never pushes one on
/// its own, so only backend changes can trigger an update.
struct HeldFix(Mutex<LocationFix>);

impl HeldFix {
    fn move_to(&self, coordinates: Coordinates) {
        *self.0.lock().unwrap() = LocationFix::new(coordinates, 5.0);
    }
}

impl Geolocation for HeldFix {
    fn current_position(&self, _options: LocationOptions) -> PositionFuture<'_> {
        let fix = *self.0.lock().unwrap();
        Box::pin(async move { Ok(fix) })
    }

    fn watch_position(&self, _options: LocationOptions) -> PositionStream {
        Box::pin(futures_util::stream::pending())
    }
}

async fn wait_until(what: &str, mut done: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while !done() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap_or_else(|_| panic!("{what}"));
}

#[tokio::test]
async fn test_other_player_changes_push_location() {
    let backend = InMemoryBackend::new();
    let geo = Arc::new(HeldFix(Mutex::new(LocationFix::new(HERE, 5.0))));
    let config = GameConfig {
        min_update_interval_ms: 0,
        ..GameConfig::default()
    };
    let store = GameStore::builder(Arc::new(backend.clone()), geo.clone())
        .config(config)
        .build();

    store.signup("lookout", "hunter22", None).await.unwrap();
    let me = store.current_player().unwrap().id;
    let mut other = Player::new(PlayerId::new("rival"), "rival", Utc::now());
    other.location = Some(HERE.offset(0.003, 0.0));
    backend.seed_player(other);
    let other = PlayerId::new("rival");
    store.init_game().await.unwrap();
    assert_eq!(backend.player(&me).unwrap().location, Some(HERE));

    let moved = HERE.offset(0.001, 0.0);
    geo.move_to(moved);
    backend.update_player(&other, |p| p.points = 42).unwrap();

    wait_until("rival's change never pushed our position", || {
        backend.player(&me).unwrap().location == Some(moved)
    })
    .await;
    wait_until("rival's row never replaced", || {
        store
            .snapshot()
            .players
            .iter()
            .any(|p| p.id == other && p.points == 42)
    })
    .await;

    geo.move_to(HERE.offset(0.002, 0.0));
    backend.update_player(&me, |p| p.points = 7).unwrap();
    wait_until("own row never replaced", || {
        store
            .snapshot()
            .players
            .iter()
            .any(|p| p.id == me && p.points == 7)
    })
    .await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(backend.player(&me).unwrap().location, Some(moved));
}
