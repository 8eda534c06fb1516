use std::time::Duration;

use chrono::Utc;
use futures_util::stream;
use shadow_tag_api_types::Coordinates;
use tokio::sync::watch;

use super::{Geolocation, GeolocationError, LocationFix, LocationOptions, PositionFuture, PositionStream};

type Reading = Option<Result<LocationFix, GeolocationError>>;

/// Positions fed in by hand: tests, the admin tool's demo, or a native shell
/// forwarding its platform location callbacks.
///
/// Watchers see the latest reading; readings set faster than a watcher polls
/// are coalesced.
#[derive(Debug)]
pub struct SimulatedGeolocation {
    reading: watch::Sender<Reading>,
}

impl Default for SimulatedGeolocation {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedGeolocation {
    pub fn new() -> Self {
        let (reading, _) = watch::channel(None);
        Self { reading }
    }

    pub fn set_fix(&self, fix: LocationFix) {
        self.reading.send_replace(Some(Ok(fix)));
    }

    pub fn move_to(&self, coordinates: Coordinates, accuracy_m: f64) {
        self.set_fix(LocationFix::new(coordinates, accuracy_m));
    }

    pub fn fail(&self, error: GeolocationError) {
        self.reading.send_replace(Some(Err(error)));
    }
}

impl Geolocation for SimulatedGeolocation {
    /// Resolves with the current reading when it is younger than
    /// `maximum_age`. A stale fix waits up to `timeout` for a newer one.
    fn current_position(&self, options: LocationOptions) -> PositionFuture<'_> {
        let mut receiver = self.reading.subscribe();

        Box::pin(async move {
            let fresh = async {
                loop {
                    let reading = receiver.borrow_and_update().clone();
                    match reading {
                        None => return Err(GeolocationError::PositionUnavailable),
                        Some(Ok(fix)) if !is_fresh(&fix, options.maximum_age) => {}
                        Some(reading) => return reading,
                    }
                    if receiver.changed().await.is_err() {
                        return Err(GeolocationError::PositionUnavailable);
                    }
                }
            };

            tokio::time::timeout(options.timeout, fresh)
                .await
                .unwrap_or(Err(GeolocationError::Timeout))
        })
    }

    fn watch_position(&self, _options: LocationOptions) -> PositionStream {
        let mut receiver = self.reading.subscribe();
        // deliver the current reading first
        receiver.mark_changed();

        Box::pin(stream::unfold(receiver, |mut receiver| async move {
            loop {
                receiver.changed().await.ok()?;
                let reading = receiver.borrow_and_update().clone();
                if let Some(reading) = reading {
                    return Some((reading, receiver));
                }
            }
        }))
    }
}

fn is_fresh(fix: &LocationFix, maximum_age: Duration) -> bool {
    // a timestamp ahead of our clock counts as fresh
    (Utc::now() - fix.timestamp)
        .to_std()
        .map_or(true, |age| age <= maximum_age)
}

#[cfg(test)]
mod tests {
    use futures_util::StreamExt;

    use super::*;
    use crate::config::GameConfig;

    #[tokio::test]
    async fn test_current_position_without_reading() {
        let geo = SimulatedGeolocation::new();
        let options = GameConfig::default().location_options();

        assert_eq!(
            geo.current_position(options).await,
            Err(GeolocationError::PositionUnavailable)
        );

        geo.move_to(Coordinates::new(51.5, -0.12), 10.0);
        let fix = geo.current_position(options).await.unwrap();
        assert_eq!(fix.coordinates, Coordinates::new(51.5, -0.12));
    }

    fn short_wait() -> LocationOptions {
        LocationOptions {
            timeout: Duration::from_millis(50),
            ..GameConfig::default().location_options()
        }
    }

    fn hours_old(coordinates: Coordinates, hours: i64) -> LocationFix {
        LocationFix {
            timestamp: Utc::now() - chrono::Duration::hours(hours),
            ..LocationFix::new(coordinates, 10.0)
        }
    }

    #[tokio::test]
    async fn test_stale_fix_times_out() {
        let geo = SimulatedGeolocation::new();
        geo.set_fix(hours_old(Coordinates::new(51.5, -0.12), 3));

        assert_eq!(
            geo.current_position(short_wait()).await,
            Err(GeolocationError::Timeout)
        );
    }

    #[tokio::test]
    async fn test_stale_fix_waits_for_fresh_one() {
        let geo = SimulatedGeolocation::new();
        geo.set_fix(hours_old(Coordinates::new(51.5, -0.12), 3));

        let options = LocationOptions {
            timeout: Duration::from_secs(5),
            ..short_wait()
        };
        let (fix, ()) = tokio::join!(geo.current_position(options), async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            geo.move_to(Coordinates::new(51.6, -0.13), 8.0);
        });

        let fix = fix.unwrap();
        assert_eq!(fix.coordinates, Coordinates::new(51.6, -0.13));
        assert_eq!(fix.accuracy_m, 8.0);
    }

    #[tokio::test]
    async fn test_stale_fix_ignored_when_error_follows() {
        let geo = SimulatedGeolocation::new();
        geo.set_fix(hours_old(Coordinates::new(51.5, -0.12), 3));

        let options = LocationOptions {
            timeout: Duration::from_secs(5),
            ..short_wait()
        };
        let (reading, ()) = tokio::join!(geo.current_position(options), async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            geo.fail(GeolocationError::PermissionDenied);
        });

        assert_eq!(reading, Err(GeolocationError::PermissionDenied));
    }

    #[tokio::test]
    async fn test_watch_yields_current_then_updates() {
        let geo = SimulatedGeolocation::new();
        geo.move_to(Coordinates::new(1.0, 1.0), 10.0);

        let mut watch = geo.watch_position(GameConfig::default().location_options());
        let first = watch.next().await.unwrap().unwrap();
        assert_eq!(first.coordinates, Coordinates::new(1.0, 1.0));

        geo.fail(GeolocationError::Timeout);
        let second = tokio::time::timeout(Duration::from_secs(1), watch.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second, Err(GeolocationError::Timeout));
    }

    #[tokio::test]
    async fn test_watch_ends_with_provider() {
        let geo = SimulatedGeolocation::new();
        let mut watch = geo.watch_position(GameConfig::default().location_options());
        drop(geo);

        assert!(watch.next().await.is_none());
    }
}
