//! # shadow-tag-backend
//!
//! The contract between the game client and its hosted backend, and two
//! implementations of it.
//!
//! ## Features
//!
//! - **Contract traits**: auth, table access, named procedures and realtime
//!   player changes, object safe so the store can hold `Arc<dyn GameBackend>`
//! - **REST client**: PostgREST tables and procedures plus GoTrue auth
//! - **In-memory backend**: the full rule set in-process for tests and demos
//! - **Spatial queries**: R-tree candidate search with a haversine filter
//!
//! ## Example
//!
//! ```
//! use shadow_tag_backend::prelude::*;
//!
//! let backend = InMemoryBackend::new();
//! let mut hunter = Player::new(PlayerId::new("hunter"), "Nightjar", backend.now());
//! hunter.status = PlayerStatus::It;
//! hunter.location = Some(Coordinates::new(51.5, -0.12));
//! backend.seed_player(hunter);
//!
//! let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
//! let nearby = runtime
//!     .block_on(backend.get_nearby_players(NearbyPlayersArgs {
//!         user_lat: 51.5005,
//!         user_lng: -0.12,
//!         radius_meters: 500.0,
//!     }))
//!     .unwrap();
//! assert_eq!(nearby[0].codename, "Nightjar");
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod provider;
pub mod spatial;
pub mod traits;

pub mod prelude {
    pub use crate::auth::{AuthUser, FileSessionStorage, NoSessionStorage, Session, SessionStorage};
    pub use crate::config::BackendConfig;
    pub use crate::error::{BackendError, Result};
    pub use crate::provider::{InMemoryBackend, RestBackend};
    pub use crate::traits::*;
    pub use shadow_tag_api_types::prelude::*;
}

pub use prelude::*;
