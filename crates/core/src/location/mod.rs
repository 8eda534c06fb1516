//! Device position: the provider seam, the update throttle, and the
//! user-facing messages for everything that can go wrong on the way.

mod simulated;
mod throttle;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_core::Stream;
use shadow_tag_api_types::Coordinates;

pub use simulated::SimulatedGeolocation;
pub use throttle::{LocationThrottle, SkipReason};

pub const OFFLINE_MESSAGE: &str = "No internet connection. Please check your network settings.";
pub const LOW_ACCURACY_MESSAGE: &str = "Low location accuracy. Please check your GPS settings.";
pub const START_FAILED_MESSAGE: &str =
    "Failed to start location tracking. Please check your location settings.";

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LocationFix {
    pub coordinates: Coordinates,
    /// Radius of the 68% confidence circle, in meters.
    pub accuracy_m: f64,
    pub timestamp: DateTime<Utc>,
}

impl LocationFix {
    pub fn new(coordinates: Coordinates, accuracy_m: f64) -> Self {
        Self {
            coordinates,
            accuracy_m,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LocationOptions {
    pub enable_high_accuracy: bool,
    pub timeout: Duration,
    /// Cached fixes up to this old are acceptable.
    pub maximum_age: Duration,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum GeolocationError {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Position unavailable")]
    PositionUnavailable,

    #[error("Location request timed out")]
    Timeout,

    #[error("Geolocation is not supported on this device")]
    Unsupported,

    #[error("{0}")]
    Other(String),
}

/// Why a location update produced no fix the backend could use.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum LocationError {
    #[error("No network connection")]
    Offline,

    #[error("Fix accuracy of {0:.0} m is too low")]
    LowAccuracy(f64),

    #[error(transparent)]
    Geolocation(#[from] GeolocationError),
}

impl LocationError {
    /// Shown when a one-shot update fails.
    pub fn update_message(&self) -> &'static str {
        match self {
            Self::Offline => OFFLINE_MESSAGE,
            Self::LowAccuracy(_) => LOW_ACCURACY_MESSAGE,
            Self::Geolocation(GeolocationError::PermissionDenied) => {
                "Location access denied. Please enable location services in your browser settings and refresh the page."
            }
            Self::Geolocation(GeolocationError::PositionUnavailable) => {
                "Location information is unavailable. Please check your GPS signal and internet connection."
            }
            Self::Geolocation(GeolocationError::Timeout) => {
                "Location request timed out. Please check your GPS signal and try again."
            }
            Self::Geolocation(_) => "Failed to update location",
        }
    }

    /// Shown when the continuous watch reports an error.
    pub fn watch_message(&self) -> &'static str {
        match self {
            Self::Offline => OFFLINE_MESSAGE,
            Self::LowAccuracy(_) => LOW_ACCURACY_MESSAGE,
            Self::Geolocation(GeolocationError::PermissionDenied) => {
                "Location access denied. Please enable location services and refresh the page."
            }
            Self::Geolocation(GeolocationError::PositionUnavailable) => {
                "Location information is unavailable. Please check your GPS signal."
            }
            Self::Geolocation(GeolocationError::Timeout) => {
                "Location request timed out. Please check your connection."
            }
            Self::Geolocation(_) => "Location tracking failed",
        }
    }
}

pub type PositionFuture<'a> =
    Pin<Box<dyn Future<Output = Result<LocationFix, GeolocationError>> + Send + 'a>>;

/// Fixes (or errors) in the order the device reports them. Dropping the
/// stream stops the watch.
pub type PositionStream = Pin<Box<dyn Stream<Item = Result<LocationFix, GeolocationError>> + Send>>;

/// A source of device positions.
pub trait Geolocation: Send + Sync {
    fn current_position(&self, options: LocationOptions) -> PositionFuture<'_>;

    fn watch_position(&self, options: LocationOptions) -> PositionStream;
}

pub trait Connectivity: Send + Sync {
    fn is_online(&self) -> bool;
}

#[derive(Clone, Copy, Debug, Default)]
pub struct AlwaysOnline;

impl Connectivity for AlwaysOnline {
    fn is_online(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_differ_by_flavour() {
        let denied = LocationError::from(GeolocationError::PermissionDenied);

        assert!(denied.update_message().contains("browser settings"));
        assert!(!denied.watch_message().contains("browser settings"));
    }

    #[test]
    fn test_fallback_messages() {
        let other = LocationError::from(GeolocationError::Other("boom".into()));

        assert_eq!(other.update_message(), "Failed to update location");
        assert_eq!(other.watch_message(), "Location tracking failed");
        assert_eq!(LocationError::Offline.watch_message(), OFFLINE_MESSAGE);
        assert_eq!(LocationError::LowAccuracy(250.0).update_message(), LOW_ACCURACY_MESSAGE);
    }
}
