//! Metrics event types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What kind of pipeline event this is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A payment attempt finished (success or failure)
    PaymentResult,
    /// An order changed status
    OrderUpdate,
    /// A failed payment was queued for retry
    RetryQueued,
}

/// Outcome recorded in the counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Attempt succeeded
    Succeeded,
    /// Attempt failed
    Failed,
    /// Attempt queued for retry
    QueuedForRetry,
}

/// One entry in the rolling buffer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsEvent {
    /// Event kind
    pub kind: EventKind,
    /// Order id
    pub order_id: Uuid,
    /// PSP that handled the attempt
    pub psp: String,
    /// Selling agent, if any
    pub agent_id: Option<String>,
    /// Merchant
    pub merchant_id: String,
    /// Outcome
    pub status: EventStatus,
    /// Attempt latency in milliseconds
    pub latency_ms: u64,
    /// Attempt number (1 = original submission)
    pub attempt: u32,
    /// Amount (major units)
    pub amount: Decimal,
    /// ISO 4217 currency code
    pub currency: String,
    /// When the event was recorded
    pub timestamp: DateTime<Utc>,
}
