use chrono::Utc;
use tokio::sync::broadcast;

use super::Notifier;
use crate::models::document::TIMESTAMP_FORMAT;
use crate::models::{Notification, NotificationKind};

/// Logs each notification and fans it out to the live event feed.
#[derive(Clone)]
pub struct BroadcastNotifier {
    tx: broadcast::Sender<Notification>,
}

impl BroadcastNotifier {
    pub fn new(tx: broadcast::Sender<Notification>) -> Self {
        Self { tx }
    }

    fn publish(&self, kind: NotificationKind, message: &str) {
        match kind {
            NotificationKind::Success => tracing::info!(kind = kind.as_str(), "{message}"),
            NotificationKind::Error => tracing::warn!(kind = kind.as_str(), "{message}"),
        }

        let notification = Notification {
            kind,
            message: message.to_string(),
            created_at: Utc::now().format(TIMESTAMP_FORMAT).to_string(),
        };
        // No subscribers is fine
        let _ = self.tx.send(notification);
    }
}

impl Notifier for BroadcastNotifier {
    fn notify_success(&self, message: &str) {
        self.publish(NotificationKind::Success, message);
    }

    fn notify_error(&self, message: &str) {
        self.publish(NotificationKind::Error, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_subscribers_receive_notifications_in_order() {
        let (tx, mut rx) = broadcast::channel(8);
        let notifier = BroadcastNotifier::new(tx);

        notifier.notify_success("Appointment has been scheduled!");
        notifier.notify_error("This time slot is full. Please select a different time slot.");

        let first = rx.recv().await.unwrap();
        assert_eq!(first.kind, NotificationKind::Success);
        assert_eq!(first.message, "Appointment has been scheduled!");

        let second = rx.recv().await.unwrap();
        assert_eq!(second.kind, NotificationKind::Error);
    }

    #[test]
    fn test_send_without_subscribers_does_not_panic() {
        let (tx, rx) = broadcast::channel(1);
        drop(rx);
        BroadcastNotifier::new(tx).notify_error("nobody listening");
    }
}
