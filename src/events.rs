//! Domain events emitted by the services, consumed by a background
//! processor. Delivery is best-effort: a full or closed channel is
//! logged and never fails the originating request.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::entities::order::{OrderStatus, PaymentMethod, PaymentStatus};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    OrderCreated(Uuid),
    OrderCancelled(Uuid),
    OrderStatusChanged {
        order_id: Uuid,
        old_status: OrderStatus,
        new_status: OrderStatus,
    },
    PaymentStatusChanged {
        order_id: Uuid,
        status: PaymentStatus,
    },
    PaymentSessionOpened {
        buyer_id: Uuid,
        method: PaymentMethod,
        amount: Decimal,
    },
    TrackingAssigned {
        order_id: Uuid,
    },
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Creates a sender plus the receiving half for `process_events`.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Event>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }

    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Fire-and-forget helper for call sites that only want to log a
    /// delivery failure.
    pub async fn emit(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!(error = %e, "Event delivery failed");
        }
    }
}

/// Background consumer. Downstream fan-out (notifications, analytics)
/// hangs off this loop; here it logs each event.
pub async fn process_events(mut receiver: mpsc::Receiver<Event>) {
    while let Some(event) = receiver.recv().await {
        match &event {
            Event::OrderCreated(order_id) => info!(%order_id, "Order created"),
            Event::OrderCancelled(order_id) => info!(%order_id, "Order cancelled"),
            Event::OrderStatusChanged {
                order_id,
                old_status,
                new_status,
            } => info!(%order_id, %old_status, %new_status, "Order status changed"),
            Event::PaymentStatusChanged { order_id, status } => {
                info!(%order_id, %status, "Payment status changed")
            }
            Event::PaymentSessionOpened {
                buyer_id,
                method,
                amount,
            } => info!(%buyer_id, %method, %amount, "Payment session opened"),
            Event::TrackingAssigned { order_id } => info!(%order_id, "Tracking assigned"),
        }
    }
    info!("Event channel closed; processor stopping");
}
