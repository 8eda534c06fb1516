use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use shadow_tag_api_types::{AVATARS, Coordinates, PlayerId};
use shadow_tag_backend::{BackendConfig, FileSessionStorage, GameBackend, InMemoryBackend, RestBackend};
use shadow_tag_core::config::GameConfig;
use shadow_tag_core::location::{GeolocationError, SimulatedGeolocation};
use shadow_tag_core::rules::activity::{activity_zones, recent_tag_heat, to_feature_collection};
use shadow_tag_core::rules::whisper::QUICK_WHISPERS;
use shadow_tag_core::store::{GameStore, LocationOutcome};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::device::{DeviceConnectivity, ListenerSlot};
use crate::error::MobileError;

const SESSION_FILE: &str = "session.json";

/// Callbacks into the app. Implemented in Kotlin/Swift.
#[uniffi::export(with_foreign)]
pub trait GameListener: Send + Sync {
    fn on_notification(&self, title: String, body: String);

    /// Called with the serialized snapshot every time it changes.
    fn on_snapshot(&self, snapshot_json: String);
}

#[derive(Clone, Copy, Debug, PartialEq, uniffi::Record)]
pub struct LatLng {
    pub latitude: f64,
    pub longitude: f64,
}

impl From<Coordinates> for LatLng {
    fn from(c: Coordinates) -> Self {
        Self {
            latitude: c.lat,
            longitude: c.lng,
        }
    }
}

#[derive(Clone, Debug, uniffi::Record)]
pub struct AvatarChoice {
    pub id: String,
    pub url: String,
    pub label: String,
}

/// Why the platform location service gave no fix.
#[derive(Clone, Debug, uniffi::Enum)]
pub enum LocationFailure {
    PermissionDenied,
    PositionUnavailable,
    Timeout,
    Unsupported,
    Other { message: String },
}

impl From<LocationFailure> for GeolocationError {
    fn from(failure: LocationFailure) -> Self {
        match failure {
            LocationFailure::PermissionDenied => Self::PermissionDenied,
            LocationFailure::PositionUnavailable => Self::PositionUnavailable,
            LocationFailure::Timeout => Self::Timeout,
            LocationFailure::Unsupported => Self::Unsupported,
            LocationFailure::Other { message } => Self::Other(message),
        }
    }
}

/// One signed-in (or signed-out) game client. The app feeds it positions
/// and network changes and renders the snapshot it publishes.
#[derive(uniffi::Object)]
pub struct GameSession {
    store: GameStore,
    geolocation: Arc<SimulatedGeolocation>,
    connectivity: Arc<DeviceConnectivity>,
    listener: ListenerSlot,
    forwarder: Mutex<Option<JoinHandle<()>>>,
}

impl GameSession {
    fn with_backend(backend: Arc<dyn GameBackend>, config: GameConfig) -> Self {
        let geolocation = Arc::new(SimulatedGeolocation::new());
        let connectivity = Arc::new(DeviceConnectivity::new());
        let listener = ListenerSlot::default();
        let store = GameStore::builder(backend, geolocation.clone())
            .connectivity(connectivity.clone())
            .notifier(Arc::new(listener.clone()))
            .config(config)
            .build();

        Self {
            store,
            geolocation,
            connectivity,
            listener,
            forwarder: Mutex::new(None),
        }
    }

    fn snapshot_to_json(&self) -> Result<String, MobileError> {
        Ok(serde_json::to_string(&self.store.snapshot())?)
    }
}

impl Drop for GameSession {
    fn drop(&mut self) {
        let forwarder = self.forwarder.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = forwarder.take() {
            task.abort();
        }
    }
}

#[uniffi::export(async_runtime = "tokio")]
impl GameSession {
    /// Connects to the hosted backend. The auth session is kept in
    /// `base_path` so the next launch starts signed in. `config_json`
    /// overrides game settings; missing keys keep their defaults.
    #[uniffi::constructor]
    pub fn new(
        base_path: String,
        backend_url: String,
        anon_key: String,
        config_json: Option<String>,
    ) -> Result<Self, MobileError> {
        let config = match config_json {
            Some(json) => GameConfig::from_json(&json)?,
            None => GameConfig::default(),
        };
        let storage = FileSessionStorage::new(PathBuf::from(base_path).join(SESSION_FILE));
        let backend = RestBackend::with_storage(
            BackendConfig::new(backend_url, anon_key),
            Arc::new(storage),
        )?;
        info!("game session created");
        Ok(Self::with_backend(Arc::new(backend), config))
    }

    /// A session over a local, empty world. Nothing leaves the device.
    #[uniffi::constructor]
    pub fn offline_demo() -> Self {
        info!("offline demo session created");
        Self::with_backend(Arc::new(InMemoryBackend::new()), GameConfig::default())
    }

    /// Registers the app's callbacks and starts forwarding snapshots to
    /// them. Replaces any earlier listener.
    pub async fn set_listener(&self, listener: Arc<dyn GameListener>) {
        self.listener.set(Some(listener));

        let mut updates = self.store.subscribe();
        let slot = self.listener.clone();
        let task = tokio::spawn(async move {
            while updates.changed().await.is_ok() {
                let json = serde_json::to_string(&*updates.borrow_and_update());
                match (json, slot.get()) {
                    (Ok(json), Some(listener)) => listener.on_snapshot(json),
                    (Err(e), _) => debug!("failed to serialize snapshot: {e}"),
                    (_, None) => {}
                }
            }
        });

        let previous = self
            .forwarder
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(task);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    pub fn clear_listener(&self) {
        self.listener.set(None);
        if let Some(task) = self.forwarder.lock().unwrap_or_else(PoisonError::into_inner).take() {
            task.abort();
        }
    }

    pub fn snapshot_json(&self) -> Result<String, MobileError> {
        self.snapshot_to_json()
    }

    pub fn is_signed_in(&self) -> bool {
        self.store.snapshot().is_signed_in()
    }

    pub fn clear_error(&self) {
        self.store.clear_error();
    }

    pub fn clear_location_error(&self) {
        self.store.clear_location_error();
    }

    // ---- device input ----

    pub fn report_location(&self, latitude: f64, longitude: f64, accuracy_m: f64) {
        self.geolocation
            .move_to(Coordinates::new(latitude, longitude), accuracy_m);
    }

    pub fn report_location_error(&self, failure: LocationFailure) {
        self.geolocation.fail(failure.into());
    }

    pub fn set_online(&self, online: bool) {
        self.connectivity.set_online(online);
    }

    // ---- lifecycle ----

    pub async fn init_game(&self) -> Result<(), MobileError> {
        Ok(self.store.init_game().await?)
    }

    pub async fn refresh(&self) {
        self.store.refresh().await;
    }

    pub async fn login(&self, codename: String, password: String) -> Result<(), MobileError> {
        Ok(self.store.login(&codename, &password).await?)
    }

    pub async fn signup(
        &self,
        codename: String,
        password: String,
        avatar_id: Option<String>,
    ) -> Result<(), MobileError> {
        Ok(self
            .store
            .signup(&codename, &password, avatar_id.as_deref())
            .await?)
    }

    pub async fn logout(&self) -> Result<(), MobileError> {
        Ok(self.store.logout().await?)
    }

    /// True when the position reached the backend, false when it was
    /// skipped as too soon or too close.
    pub async fn update_location(&self) -> Result<bool, MobileError> {
        let outcome = self.store.update_location().await?;
        Ok(matches!(outcome, LocationOutcome::Pushed { .. }))
    }

    pub async fn start_location_tracking(&self) {
        self.store.start_location_tracking().await;
    }

    pub async fn stop_location_tracking(&self) {
        self.store.stop_location_tracking().await;
    }

    // ---- play ----

    pub async fn tag_player(&self, player_id: String) -> Result<(), MobileError> {
        Ok(self.store.tag_player(&PlayerId::new(player_id)).await?)
    }

    pub async fn dodge_player(&self, player_id: String) -> Result<(), MobileError> {
        Ok(self.store.dodge_player(&PlayerId::new(player_id)).await?)
    }

    pub async fn join_match(&self) -> Result<(), MobileError> {
        Ok(self.store.join_match().await?)
    }

    pub async fn fake_dodge(&self, player_id: String) -> Result<(), MobileError> {
        Ok(self.store.fake_dodge(&PlayerId::new(player_id)).await?)
    }

    pub async fn bait_ping_near_me(&self) -> Result<LatLng, MobileError> {
        Ok(self.store.bait_ping_near_me().await?.into())
    }

    pub async fn send_whisper(&self, player_id: String, message: String) -> Result<(), MobileError> {
        Ok(self
            .store
            .send_whisper(&PlayerId::new(player_id), &message)
            .await?)
    }

    pub async fn activate_disguise(&self) -> Result<(), MobileError> {
        Ok(self.store.activate_disguise().await?)
    }

    pub async fn use_tracker_ability(&self) -> Result<Option<LatLng>, MobileError> {
        Ok(self.store.use_tracker_ability().await?.map(LatLng::from))
    }

    pub async fn use_decoy_ability(&self) -> Result<(), MobileError> {
        Ok(self.store.use_decoy_ability().await?)
    }

    // ---- admin ----

    pub async fn start_season(&self, name: String) -> Result<(), MobileError> {
        Ok(self.store.start_season(&name).await?)
    }

    pub async fn end_current_season(&self) -> Result<(), MobileError> {
        Ok(self.store.end_current_season().await?)
    }

    pub async fn reset_game(&self) -> Result<(), MobileError> {
        Ok(self.store.reset_game().await?)
    }

    // ---- display data ----

    /// Activity zones and recent tags as a GeoJSON feature collection, for
    /// the map's heat layer.
    pub fn activity_geojson(&self) -> String {
        let snapshot = self.store.snapshot();
        let heat = recent_tag_heat(&snapshot.tags, Utc::now());
        let zones = activity_zones(&snapshot.nearby_players, &heat);
        to_feature_collection(&zones, &heat).to_string()
    }
}

#[uniffi::export]
pub fn quick_whispers() -> Vec<String> {
    QUICK_WHISPERS.iter().map(|w| (*w).to_owned()).collect()
}

#[uniffi::export]
pub fn avatar_choices() -> Vec<AvatarChoice> {
    AVATARS
        .iter()
        .map(|a| AvatarChoice {
            id: a.id.to_owned(),
            url: a.url.to_owned(),
            label: a.label.to_owned(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_demo_session_signup() {
        let session = GameSession::offline_demo();
        session.report_location(40.7128, -74.0060, 12.0);
        session.init_game().await.unwrap();
        assert!(!session.is_signed_in());

        session
            .signup("nightjar".into(), "hunter22".into(), Some("cat".into()))
            .await
            .unwrap();
        assert!(session.is_signed_in());

        let snapshot: serde_json::Value = serde_json::from_str(&session.snapshot_json().unwrap()).unwrap();
        assert_eq!(snapshot["current_player"]["codename"], "nightjar");
        assert_eq!(snapshot["is_tracking"], true);
    }

    #[tokio::test]
    async fn test_reported_failures_surface_as_messages() {
        let session = GameSession::offline_demo();
        session
            .signup("nightjar".into(), "hunter22".into(), None)
            .await
            .unwrap();
        session.stop_location_tracking().await;

        session.report_location_error(LocationFailure::Timeout);
        let error = session.update_location().await.unwrap_err();
        assert_eq!(
            error.to_string(),
            "Location request timed out. Please check your GPS signal and try again."
        );

        session.set_online(false);
        session.report_location(40.7128, -74.0060, 12.0);
        assert!(matches!(session.update_location().await, Err(MobileError::Location(_))));
    }

    #[tokio::test]
    async fn test_signed_out_actions() {
        let session = GameSession::offline_demo();
        assert!(matches!(session.join_match().await, Err(MobileError::NotSignedIn)));
        assert!(!session.update_location().await.unwrap());
    }

    #[test]
    fn test_static_choices() {
        assert_eq!(quick_whispers().len(), QUICK_WHISPERS.len());
        assert_eq!(avatar_choices().len(), AVATARS.len());
    }

    #[test]
    fn test_empty_activity_geojson() {
        let session = GameSession::offline_demo();
        let json: serde_json::Value = serde_json::from_str(&session.activity_geojson()).unwrap();
        assert_eq!(json["type"], "FeatureCollection");
    }

    #[tokio::test]
    async fn test_activity_geojson_respects_disguise_and_range() {
        use shadow_tag_api_types::{Player, PlayerStatus};

        let here = Coordinates::new(40.7128, -74.0060);
        let backend = InMemoryBackend::new();

        let mut hunter = Player::new(PlayerId::new("hunter"), "hunter", Utc::now());
        hunter.status = PlayerStatus::It;
        hunter.disguise_active = true;
        hunter.disguise_until = Some(Utc::now() + chrono::Duration::minutes(2));
        hunter.location = Some(here.offset(0.0003, 0.0));
        backend.seed_player(hunter);

        let mut distant = Player::new(PlayerId::new("distant"), "distant", Utc::now());
        distant.status = PlayerStatus::It;
        distant.location = Some(here.offset(0.2, 0.2));
        backend.seed_player(distant);

        let session = GameSession::with_backend(Arc::new(backend), GameConfig::default());
        session.report_location(here.lat, here.lng, 10.0);
        session
            .signup("nightjar".into(), "hunter22".into(), None)
            .await
            .unwrap();

        let geojson = session.activity_geojson();
        assert!(!geojson.contains("Danger Zone"));
        assert!(geojson.contains("Activity Zone"));

        let json: serde_json::Value = serde_json::from_str(&geojson).unwrap();
        assert_eq!(json["features"].as_array().unwrap().len(), 1);
    }
}
