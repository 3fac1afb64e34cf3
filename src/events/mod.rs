use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info};
use uuid::Uuid;

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

/// Events emitted by the services. Consumed in-process by the logging
/// drain spawned from `main`; integrations subscribe by swapping the drain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    TransferCreated {
        transfer_id: Uuid,
        from_branch_id: Uuid,
        to_branch_id: Uuid,
        line_count: usize,
    },
    TransferUpdated {
        transfer_id: Uuid,
        version: i32,
    },
    TransferDispatched {
        transfer_id: Uuid,
        from_branch_id: Uuid,
        to_branch_id: Uuid,
    },
    TransferReceiptRecorded {
        transfer_id: Uuid,
        to_branch_id: Uuid,
    },
    TransferReceived {
        transfer_id: Uuid,
        to_branch_id: Uuid,
    },
    TransferCancelled {
        transfer_id: Uuid,
        restocked: bool,
    },
    InventoryLevelSet {
        product_id: Uuid,
        branch_id: Uuid,
        old_on_hand: Decimal,
        new_on_hand: Decimal,
    },
    BranchCreated(Uuid),
    ProductCreated(Uuid),
}

/// Drains the event channel, logging every event. Runs until all senders
/// are dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::TransferDispatched {
                transfer_id,
                from_branch_id,
                to_branch_id,
            } => {
                info!(
                    transfer_id = %transfer_id,
                    from = %from_branch_id,
                    to = %to_branch_id,
                    "transfer dispatched"
                );
            }
            Event::TransferReceived {
                transfer_id,
                to_branch_id,
            } => {
                info!(transfer_id = %transfer_id, to = %to_branch_id, "transfer received");
            }
            Event::TransferCancelled {
                transfer_id,
                restocked,
            } => {
                info!(transfer_id = %transfer_id, restocked = restocked, "transfer cancelled");
            }
            other => debug!(event = ?other, "event processed"),
        }
    }

    info!("Event processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sender_delivers_to_processor() {
        let (tx, mut rx) = mpsc::channel(8);
        let sender = EventSender::new(tx);

        sender
            .send(Event::BranchCreated(Uuid::new_v4()))
            .await
            .expect("send should succeed");

        let received = rx.recv().await.expect("event expected");
        assert!(matches!(received, Event::BranchCreated(_)));
    }

    #[tokio::test]
    async fn send_fails_after_receiver_dropped() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);

        let result = sender.send(Event::ProductCreated(Uuid::new_v4())).await;
        assert!(result.is_err());
    }
}
