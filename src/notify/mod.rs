//! Change notifications for live dashboards
//!
//! Ledger writes publish a `FarmingEvent` on a broadcast channel. Delivery is best-effort: with no
//! subscribers the event is dropped, and a slow subscriber skips whatever it lagged behind on.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, warn};

/// Events buffered per subscriber before the oldest are dropped
const EVENT_BUFFER: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FarmingEvent {
    #[serde(rename_all = "camelCase")]
    UserClaimed {
        user_id: i64,
        amount: i64,
        new_points: i64,
    },

    #[serde(rename_all = "camelCase")]
    TaskCompleted {
        user_id: i64,
        task_id: i64,
        new_points: i64,
    },
}

impl FarmingEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::UserClaimed { .. } => "user_claimed",
            Self::TaskCompleted { .. } => "task_completed",
        }
    }

    /// User whose action produced the event
    pub fn origin(&self) -> i64 {
        match self {
            Self::UserClaimed { user_id, .. } | Self::TaskCompleted { user_id, .. } => *user_id,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Notifier {
    sender: broadcast::Sender<FarmingEvent>,
}

impl Notifier {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_BUFFER);
        Self { sender }
    }

    pub fn publish(&self, event: FarmingEvent) {
        let event_type = event.event_type();
        match self.sender.send(event) {
            Ok(subscribers) => debug!(event_type, subscribers, "Event published"),
            Err(_) => debug!(event_type, "Event published with no subscribers"),
        }
    }

    /// New subscription; the caller may declare its user id later
    pub fn subscribe(&self, user_id: Option<i64>) -> Subscription {
        Subscription {
            receiver: self.sender.subscribe(),
            user_id,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

pub struct Subscription {
    receiver: broadcast::Receiver<FarmingEvent>,
    user_id: Option<i64>,
}

impl Subscription {
    pub fn set_user(&mut self, user_id: i64) {
        self.user_id = Some(user_id);
    }

    pub fn user_id(&self) -> Option<i64> {
        self.user_id
    }

    /// Next event not originated by this subscriber; `None` once the notifier is gone
    pub async fn recv(&mut self) -> Option<FarmingEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if Some(event.origin()) == self.user_id => continue,
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Subscriber lagged, events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_event_wire_format() {
        let claimed = FarmingEvent::UserClaimed {
            user_id: 7,
            amount: 250,
            new_points: 500,
        };
        assert_eq!(
            serde_json::to_value(&claimed).unwrap(),
            json!({"type": "user_claimed", "userId": 7, "amount": 250, "newPoints": 500})
        );

        let completed = FarmingEvent::TaskCompleted {
            user_id: 7,
            task_id: 3,
            new_points: 600,
        };
        assert_eq!(
            serde_json::to_value(&completed).unwrap(),
            json!({"type": "task_completed", "userId": 7, "taskId": 3, "newPoints": 600})
        );
    }

    #[tokio::test]
    async fn test_subscriber_skips_own_events() {
        let notifier = Notifier::new();
        let mut own = notifier.subscribe(Some(1));
        let mut other = notifier.subscribe(None);

        notifier.publish(FarmingEvent::UserClaimed { user_id: 1, amount: 250, new_points: 250 });
        notifier.publish(FarmingEvent::UserClaimed { user_id: 2, amount: 250, new_points: 250 });

        assert_eq!(own.recv().await.map(|e| e.origin()), Some(2));
        assert_eq!(other.recv().await.map(|e| e.origin()), Some(1));
        assert_eq!(other.recv().await.map(|e| e.origin()), Some(2));
    }

    #[tokio::test]
    async fn test_publish_without_subscribers() {
        let notifier = Notifier::new();
        assert_eq!(notifier.subscriber_count(), 0);
        notifier.publish(FarmingEvent::TaskCompleted { user_id: 1, task_id: 1, new_points: 100 });
    }

    #[tokio::test]
    async fn test_lagged_subscriber_recovers() {
        let notifier = Notifier::new();
        let mut subscription = notifier.subscribe(None);

        for i in 0..(EVENT_BUFFER as i64 + 10) {
            notifier.publish(FarmingEvent::UserClaimed {
                user_id: i,
                amount: 250,
                new_points: 250,
            });
        }

        let first = subscription.recv().await.unwrap();
        assert_eq!(first.origin(), 10);
    }

    #[tokio::test]
    async fn test_recv_ends_when_notifier_dropped() {
        let notifier = Notifier::new();
        let mut subscription = notifier.subscribe(None);
        drop(notifier);
        assert!(subscription.recv().await.is_none());
    }
}
