//! Alerts raised by the store for the host to show (push notification,
//! toast, terminal line).

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::info;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
}

impl Notification {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }

    pub fn status_changed() -> Self {
        Self::new("Status Changed", "Your game status has been updated.")
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Writes notifications to the log and nowhere else.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) {
        info!("{}: {}", notification.title, notification.body);
    }
}

/// Forwards notifications to a receiver the host drains.
#[derive(Clone, Debug)]
pub struct ChannelNotifier {
    sender: mpsc::UnboundedSender<Notification>,
}

impl ChannelNotifier {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender }, receiver)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notification: Notification) {
        // nobody listening is fine
        let _ = self.sender.send(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_notifier_delivers() {
        let (notifier, mut receiver) = ChannelNotifier::new();
        notifier.notify(Notification::status_changed());

        let received = receiver.try_recv().unwrap();
        assert_eq!(received.title, "Status Changed");

        drop(receiver);
        notifier.notify(Notification::status_changed());
    }
}
