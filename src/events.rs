use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Events emitted by the services after their transactions commit.
///
/// Consumers must tolerate loss: a send failure is logged by the producer and
/// never rolls back the work the event describes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Item lifecycle
    ItemCreated(i64),
    ItemUpdated(i64),
    ItemDeleted(i64),

    // Request lifecycle
    RequestCreated(i64),
    RequestStatusChanged {
        request_id: i64,
        old_status: String,
        new_status: String,
    },
    RequestPromoted {
        request_id: i64,
        group_id: i32,
    },

    // Request-row groups
    GroupMemberAppended {
        group_id: i32,
        position: i32,
    },
    GroupStatusChanged {
        group_id: i32,
        new_status: String,
        members: usize,
    },

    // Stock ledger
    StockDecremented {
        item_id: i64,
        amount: i32,
        remaining: i32,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }
}

/// Drains the event channel, logging each event. Runs until every sender is
/// dropped.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    info!("Event processor started");
    while let Some(event) = receiver.recv().await {
        debug!(?event, "Processing event");
    }
    info!("Event processor stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn events_flow_through_the_channel() {
        let (tx, mut rx) = mpsc::channel(8);
        let sender = EventSender::new(tx);

        sender
            .send(Event::RequestCreated(11))
            .await
            .expect("send should succeed");
        sender
            .send(Event::StockDecremented {
                item_id: 3,
                amount: 2,
                remaining: 5,
            })
            .await
            .expect("send should succeed");

        match rx.recv().await {
            Some(Event::RequestCreated(id)) => assert_eq!(id, 11),
            other => panic!("unexpected event: {other:?}"),
        }
        match rx.recv().await {
            Some(Event::StockDecremented { remaining, .. }) => assert_eq!(remaining, 5),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[tokio::test]
    async fn send_fails_once_receiver_is_gone() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);
        assert!(sender.send(Event::ItemCreated(1)).await.is_err());
    }
}
