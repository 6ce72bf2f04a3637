//! Domain types shared across the gateway

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

// =========================================================================
// NEUTRAL PAYMENT MODEL
// =========================================================================

/// Neutral payment status every PSP maps into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Not yet settled (also the safe default for unknown provider statuses)
    Pending,
    /// Funds captured
    Succeeded,
    /// Provider reported failure (declined, invalid, expired)
    Failed,
    /// Cancelled before capture
    Cancelled,
    /// Provider requires an explicit confirmation step (3DS etc.)
    RequiresAction,
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaymentStatus::Pending => write!(f, "pending"),
            PaymentStatus::Succeeded => write!(f, "succeeded"),
            PaymentStatus::Failed => write!(f, "failed"),
            PaymentStatus::Cancelled => write!(f, "cancelled"),
            PaymentStatus::RequiresAction => write!(f, "requires_action"),
        }
    }
}

/// Order lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Created, payment not yet settled
    Pending,
    /// Payment captured
    Paid,
    /// Last payment attempt failed
    Failed,
    /// Cancelled before payment
    Cancelled,
    /// Fully refunded
    Refunded,
    /// Partially refunded
    PartiallyRefunded,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "pending"),
            OrderStatus::Paid => write!(f, "paid"),
            OrderStatus::Failed => write!(f, "failed"),
            OrderStatus::Cancelled => write!(f, "cancelled"),
            OrderStatus::Refunded => write!(f, "refunded"),
            OrderStatus::PartiallyRefunded => write!(f, "partially_refunded"),
        }
    }
}

// =========================================================================
// REQUEST / RESULT (transient, per attempt)
// =========================================================================

/// Provider-neutral payment request, built once per attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentRequest {
    /// Amount in major currency units
    pub amount: Decimal,
    /// ISO 4217 currency code
    pub currency: String,
    /// Customer email
    pub customer_email: String,
    /// Payment method hint (e.g. "card", "ideal")
    pub payment_method: Option<String>,
    /// Order this attempt belongs to
    pub order_id: Uuid,
    /// Free-form metadata forwarded to the provider
    pub metadata: Map<String, Value>,
}

/// Normalized result of one adapter call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentResult {
    /// Provider accepted the charge
    pub success: bool,
    /// Provider-assigned transaction id (None on failure)
    pub transaction_id: Option<String>,
    /// Normalized status
    pub status: PaymentStatus,
    /// Provider fee (major units)
    pub fee: Decimal,
    /// Human-readable error (None on success)
    pub error: Option<String>,
    /// Raw provider payload, kept for audit only
    pub raw: Option<Value>,
}

impl PaymentResult {
    /// Failed result with a populated error message
    pub fn failure(status: PaymentStatus, error: impl Into<String>) -> Self {
        Self {
            success: false,
            transaction_id: None,
            status,
            fee: Decimal::ZERO,
            error: Some(error.into()),
            raw: None,
        }
    }
}

// =========================================================================
// PERSISTED RECORDS
// =========================================================================

/// One line item on an order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    /// SKU or product id
    pub sku: String,
    /// Display name
    pub name: String,
    /// Quantity
    pub quantity: u32,
    /// Unit price (major units)
    pub unit_price: Decimal,
}

/// A merchant sale; soft lifecycle, never deleted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Order id
    pub id: Uuid,
    /// Merchant id
    pub merchant_id: String,
    /// Selling agent, if any
    pub agent_id: Option<String>,
    /// Customer email
    pub customer_email: String,
    /// Total amount (major units)
    pub total_amount: Decimal,
    /// Cumulative amount refunded so far (major units)
    pub refunded_amount: Decimal,
    /// ISO 4217 currency code
    pub currency: String,
    /// Customer country, when known (routing input, kept for retries)
    pub customer_country: Option<String>,
    /// Lifecycle status
    pub status: OrderStatus,
    /// Line items
    pub items: Vec<OrderItem>,
    /// Chosen payment method hint
    pub payment_method: Option<String>,
    /// PSP that handled (or last attempted) the payment
    pub psp: Option<String>,
    /// Created at
    pub created_at: DateTime<Utc>,
    /// Last updated at
    pub updated_at: DateTime<Utc>,
    /// Free-form metadata
    pub metadata: Map<String, Value>,
}

/// One attempt to charge for an order.
///
/// An order accumulates one row per attempt across retries; at most one row
/// may ever hold [`PaymentStatus::Succeeded`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    /// Payment id
    pub id: Uuid,
    /// Order this attempt charges for
    pub order_id: Uuid,
    /// Amount (major units)
    pub amount: Decimal,
    /// ISO 4217 currency code
    pub currency: String,
    /// PSP that executed the attempt
    pub psp: String,
    /// Normalized status
    pub status: PaymentStatus,
    /// Provider transaction id
    pub transaction_id: Option<String>,
    /// Provider fee (major units)
    pub fee: Decimal,
    /// Attempt number (1 = original submission)
    pub attempt: u32,
    /// Created at
    pub created_at: DateTime<Utc>,
    /// Free-form metadata
    pub metadata: Map<String, Value>,
}

// =========================================================================
// ORCHESTRATION RESULTS
// =========================================================================

/// Outcome of a process/retry call, returned to the controller layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestrationResult {
    /// Payment settled
    pub success: bool,
    /// Order id
    pub order_id: Uuid,
    /// Payment row recorded for this attempt (None if rejected pre-submit)
    pub payment_id: Option<Uuid>,
    /// PSP used (None if selection failed)
    pub psp: Option<String>,
    /// Provider transaction id
    pub transaction_id: Option<String>,
    /// Amount (major units)
    pub amount: Decimal,
    /// ISO 4217 currency code
    pub currency: String,
    /// Provider fee (major units)
    pub fee: Decimal,
    /// Human-readable error (None on success)
    pub error: Option<String>,
}

/// Outcome of a refund call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundResult {
    /// Refund accepted by the provider (or short-circuited as already done)
    pub success: bool,
    /// Order id
    pub order_id: Uuid,
    /// Provider refund id
    pub refund_id: Option<String>,
    /// Amount refunded by this call (major units)
    pub amount: Decimal,
    /// Order status after the call
    pub order_status: OrderStatus,
    /// Refund was a no-op because the order was already refunded
    pub already_refunded: bool,
    /// Human-readable error (None on success)
    pub error: Option<String>,
}
