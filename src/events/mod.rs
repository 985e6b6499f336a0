use chrono::{DateTime, Utc};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};

/// Sends domain events to the in-process event loop
#[derive(Clone, Debug)]
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

    /// Sends an event after a commit. The purchase is already durable at
    /// that point, so a closed channel is logged and otherwise ignored.
    pub async fn send_or_log(&self, event: Event) {
        let kind = event.kind();
        if let Err(e) = self.send(event).await {
            counter!("tutuplapak.events.dropped", 1, "event" => kind);
            warn!(event = kind, error = %e, "Domain event dropped");
        }
    }
}

/// Purchase lifecycle events, emitted once the owning transaction commits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    PurchaseCreated {
        purchase_id: i32,
        total: i64,
        seller_ids: Vec<i32>,
        timestamp: DateTime<Utc>,
    },
    PaymentConfirmed {
        purchase_id: i32,
        proof_count: usize,
        timestamp: DateTime<Utc>,
    },
}

impl Event {
    pub fn kind(&self) -> &'static str {
        match self {
            Event::PurchaseCreated { .. } => "purchase_created",
            Event::PaymentConfirmed { .. } => "payment_confirmed",
        }
    }
}

/// Drains the event channel until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        counter!("tutuplapak.events.processed", 1, "event" => event.kind());
        match event {
            Event::PurchaseCreated {
                purchase_id,
                total,
                seller_ids,
                timestamp,
            } => {
                info!(
                    purchase_id,
                    total,
                    sellers = seller_ids.len(),
                    %timestamp,
                    "Purchase awaiting payment"
                );
            }
            Event::PaymentConfirmed {
                purchase_id,
                proof_count,
                timestamp,
            } => {
                info!(purchase_id, proof_count, %timestamp, "Purchase paid");
            }
        }
    }

    info!("Event channel closed; event processing loop stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_delivers_to_receiver() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);
        let event = Event::PaymentConfirmed {
            purchase_id: 3,
            proof_count: 2,
            timestamp: Utc::now(),
        };

        sender.send(event.clone()).await.unwrap();
        assert_eq!(rx.recv().await, Some(event));
    }

    #[tokio::test]
    async fn send_or_log_tolerates_closed_channel() {
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let sender = EventSender::new(tx);

        assert!(sender
            .send(Event::PaymentConfirmed {
                purchase_id: 1,
                proof_count: 1,
                timestamp: Utc::now(),
            })
            .await
            .is_err());
        sender
            .send_or_log(Event::PurchaseCreated {
                purchase_id: 1,
                total: 10,
                seller_ids: vec![4],
                timestamp: Utc::now(),
            })
            .await;
    }

    #[tokio::test]
    async fn process_events_stops_when_senders_drop() {
        let (tx, rx) = mpsc::channel(2);
        let handle = tokio::spawn(process_events(rx));
        EventSender::new(tx)
            .send_or_log(Event::PaymentConfirmed {
                purchase_id: 9,
                proof_count: 1,
                timestamp: Utc::now(),
            })
            .await;
        // the sender was moved into the temporary above and is dropped now
        handle.await.unwrap();
    }
}
