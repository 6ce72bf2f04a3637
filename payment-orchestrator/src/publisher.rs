//! Event fan-out seam
//!
//! Dashboards and other observers subscribe through whatever transport the
//! deployment wires in; the orchestrator only sees this trait and publishes
//! best-effort.

use async_trait::async_trait;
use payment_core::{OrderStatus, PaymentStatus};
use rust_decimal::Decimal;
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Events emitted by the orchestrator
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GatewayEvent {
    /// A payment attempt finished
    PaymentResult {
        /// Order id
        order_id: Uuid,
        /// Payment row for this attempt
        payment_id: Uuid,
        /// PSP used
        psp: String,
        /// Normalized status
        status: PaymentStatus,
        /// Attempt latency (ms)
        latency_ms: u64,
        /// Amount (major units)
        amount: Decimal,
        /// ISO 4217 currency code
        currency: String,
        /// Attempt number
        attempt: u32,
    },
    /// An order changed status
    OrderUpdate {
        /// Order id
        order_id: Uuid,
        /// Merchant
        merchant_id: String,
        /// New status
        status: OrderStatus,
    },
    /// A failed payment was queued for retry
    RetryQueued {
        /// Order id
        order_id: Uuid,
        /// Upcoming attempt number
        attempt: u32,
        /// Backoff before resubmission (ms)
        delay_ms: u64,
    },
    /// A refund settled
    Refund {
        /// Order id
        order_id: Uuid,
        /// Provider refund id
        refund_id: String,
        /// Amount refunded (major units)
        amount: Decimal,
        /// Order status after the refund
        order_status: OrderStatus,
    },
}

/// Publish interface; fire-and-forget from the orchestrator's point of view
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Deliver one event. Failures are the publisher's problem to report;
    /// the orchestrator logs and swallows them.
    async fn publish(&self, event: &GatewayEvent) -> Result<(), String>;
}

/// Publisher that drops every event. Test default.
pub struct NullPublisher;

#[async_trait]
impl EventPublisher for NullPublisher {
    async fn publish(&self, _event: &GatewayEvent) -> Result<(), String> {
        Ok(())
    }
}

/// Fan-out over a tokio broadcast channel
pub struct BroadcastPublisher {
    sender: broadcast::Sender<GatewayEvent>,
}

impl BroadcastPublisher {
    /// Create a publisher with the given channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe a new observer
    pub fn subscribe(&self) -> broadcast::Receiver<GatewayEvent> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl EventPublisher for BroadcastPublisher {
    async fn publish(&self, event: &GatewayEvent) -> Result<(), String> {
        // send only fails when there are no subscribers; that is not a
        // delivery obligation for a best-effort broadcast
        let _ = self.sender.send(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_broadcast_fan_out() {
        let publisher = BroadcastPublisher::new(8);
        let mut rx_a = publisher.subscribe();
        let mut rx_b = publisher.subscribe();

        let event = GatewayEvent::RetryQueued {
            order_id: Uuid::new_v4(),
            attempt: 2,
            delay_ms: 1000,
        };
        publisher.publish(&event).await.unwrap();

        assert!(matches!(
            rx_a.recv().await.unwrap(),
            GatewayEvent::RetryQueued { attempt: 2, .. }
        ));
        assert!(matches!(
            rx_b.recv().await.unwrap(),
            GatewayEvent::RetryQueued { attempt: 2, .. }
        ));
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_ok() {
        let publisher = BroadcastPublisher::new(8);
        let event = GatewayEvent::RetryQueued {
            order_id: Uuid::new_v4(),
            attempt: 1,
            delay_ms: 500,
        };
        assert!(publisher.publish(&event).await.is_ok());
    }
}
