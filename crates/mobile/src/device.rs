//! Adapters between what the app reports and the traits the store expects.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use shadow_tag_core::location::Connectivity;
use shadow_tag_core::notifications::{Notification, Notifier};
use tracing::info;

use crate::session::GameListener;

/// Network state as last reported by the app. Starts online.
#[derive(Debug)]
pub(crate) struct DeviceConnectivity {
    online: AtomicBool,
}

impl DeviceConnectivity {
    pub(crate) fn new() -> Self {
        Self {
            online: AtomicBool::new(true),
        }
    }

    pub(crate) fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::Relaxed);
    }
}

impl Connectivity for DeviceConnectivity {
    fn is_online(&self) -> bool {
        self.online.load(Ordering::Relaxed)
    }
}

/// The listener the app registered, if any.
#[derive(Clone, Default)]
pub(crate) struct ListenerSlot(Arc<Mutex<Option<Arc<dyn GameListener>>>>);

impl ListenerSlot {
    fn lock(&self) -> MutexGuard<'_, Option<Arc<dyn GameListener>>> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn set(&self, listener: Option<Arc<dyn GameListener>>) {
        *self.lock() = listener;
    }

    pub(crate) fn get(&self) -> Option<Arc<dyn GameListener>> {
        self.lock().clone()
    }
}

impl Notifier for ListenerSlot {
    fn notify(&self, notification: Notification) {
        match self.get() {
            Some(listener) => listener.on_notification(notification.title, notification.body),
            None => info!("{}: {}", notification.title, notification.body),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<String>>);

    impl GameListener for Recorder {
        fn on_notification(&self, title: String, body: String) {
            self.0.lock().unwrap().push(format!("{title}: {body}"));
        }

        fn on_snapshot(&self, _snapshot_json: String) {}
    }

    #[test]
    fn test_notifications_reach_listener() {
        let slot = ListenerSlot::default();
        slot.notify(Notification::status_changed());

        let recorder = Arc::new(Recorder::default());
        slot.set(Some(recorder.clone()));
        slot.notify(Notification::status_changed());

        assert_eq!(
            *recorder.0.lock().unwrap(),
            vec!["Status Changed: Your game status has been updated.".to_owned()]
        );
    }

    #[test]
    fn test_connectivity_toggle() {
        let device = DeviceConnectivity::new();
        assert!(device.is_online());
        device.set_online(false);
        assert!(!device.is_online());
    }
}
