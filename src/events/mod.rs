use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::info;
use uuid::Uuid;

/// Default capacity of the event channel
pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 1024;

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

/// Creates a bounded event channel
pub fn channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender::new(tx), rx)
}

// Define the various events that can occur in the system.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    BatchesImported {
        count: usize,
    },
    GroupCreated {
        group_id: Uuid,
        name: String,
        total_price: Decimal,
        item_count: usize,
    },
    GroupingRunCompleted {
        groups_created: usize,
        batches_exhausted: usize,
        cancelled: bool,
    },
}

/// Drains the channel, logging every event until all senders are dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::BatchesImported { count } => {
                info!(count, "Batches imported");
            }
            Event::GroupCreated {
                group_id,
                name,
                total_price,
                item_count,
            } => {
                info!(%group_id, name = %name, %total_price, item_count, "Group created");
            }
            Event::GroupingRunCompleted {
                groups_created,
                batches_exhausted,
                cancelled,
            } => {
                info!(
                    groups_created,
                    batches_exhausted, cancelled, "Grouping run completed"
                );
            }
        }
    }

    info!("Event processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sent_events_reach_the_receiver() {
        let (sender, mut rx) = channel(4);
        sender
            .send(Event::BatchesImported { count: 3 })
            .await
            .unwrap();
        assert_eq!(rx.recv().await, Some(Event::BatchesImported { count: 3 }));
    }

    #[tokio::test]
    async fn send_fails_once_receiver_is_gone() {
        let (sender, rx) = channel(1);
        drop(rx);
        assert!(sender
            .send(Event::BatchesImported { count: 1 })
            .await
            .is_err());
    }

    #[tokio::test]
    async fn processor_stops_when_senders_drop() {
        let (sender, rx) = channel(4);
        let handle = tokio::spawn(process_events(rx));
        sender
            .send(Event::GroupingRunCompleted {
                groups_created: 2,
                batches_exhausted: 1,
                cancelled: false,
            })
            .await
            .unwrap();
        drop(sender);
        handle.await.unwrap();
    }
}
