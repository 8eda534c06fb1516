//! # shadow-tag-core
//!
//! The game client minus any UI: a [`GameStore`](store::GameStore) holding
//! the state every screen renders, location tracking that feeds the backend
//! the player's position, and the small rules the screens use to decide what
//! to show.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use shadow_tag_backend::{BackendConfig, RestBackend};
//! use shadow_tag_core::location::SimulatedGeolocation;
//! use shadow_tag_core::store::GameStore;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = Arc::new(RestBackend::new(BackendConfig::from_env()?)?);
//! let store = GameStore::new(backend, Arc::new(SimulatedGeolocation::new()));
//!
//! store.init_game().await?;
//! store.login("nightjar", "hunter2").await?;
//! println!("{} players nearby", store.snapshot().nearby_players.len());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod location;
pub mod notifications;
pub mod rules;
pub mod store;

pub mod prelude {
    pub use crate::config::{ConfigError, GameConfig};
    pub use crate::error::{AuthError, GameError, Result};
    pub use crate::location::{
        AlwaysOnline, Connectivity, Geolocation, GeolocationError, LocationError, LocationFix,
        LocationOptions, SimulatedGeolocation,
    };
    pub use crate::notifications::{ChannelNotifier, LogNotifier, Notification, Notifier};
    pub use crate::store::{GameSnapshot, GameStore, LocationOutcome};
    pub use shadow_tag_api_types::prelude::*;
}
