//! Error types for payment orchestration

use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

/// Result type for orchestration operations
pub type Result<T> = std::result::Result<T, Error>;

/// Orchestration errors.
///
/// Adapter-level faults never appear here on the process path; the
/// orchestrator converts them into failed results. These variants cover
/// requests rejected before any PSP contact and fatal persistence faults.
#[derive(Error, Debug)]
pub enum Error {
    /// Request failed validation; no PSP was contacted
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Order does not exist
    #[error("Order not found: {0}")]
    OrderNotFound(Uuid),

    /// Payment row does not exist
    #[error("Payment not found: {0}")]
    PaymentNotFound(Uuid),

    /// Retry cap reached; terminal
    #[error("Maximum retries exceeded for order {order_id} (cap {max})")]
    MaxRetriesExceeded {
        /// Order id
        order_id: Uuid,
        /// Configured cap on retries
        max: u32,
    },

    /// Refund request exceeds the refundable balance; rejected pre-adapter
    #[error("Refund of {requested} exceeds refundable balance {available} (original total {total})")]
    RefundExceedsOriginal {
        /// Requested refund amount
        requested: Decimal,
        /// Balance still refundable (total minus prior refunds)
        available: Decimal,
        /// Original order total
        total: Decimal,
    },

    /// Order is not in a refundable status
    #[error("Order {order_id} is not refundable (status {status})")]
    NotRefundable {
        /// Order id
        order_id: Uuid,
        /// Current status
        status: String,
    },

    /// No succeeded payment exists to refund against
    #[error("Order {0} has no settled payment to refund")]
    NoSettledPayment(Uuid),

    /// Persistence fault. Fatal for the request: a payment that cannot be
    /// recorded must not be reported as successful.
    #[error("Repository error: {0}")]
    Repository(String),

    /// Routing/selection fault (no eligible PSP, unknown or disabled
    /// preference) or adapter misuse outside the submit path
    #[error(transparent)]
    Adapter(#[from] psp_adapters::Error),

    /// Core domain error
    #[error(transparent)]
    Core(#[from] payment_core::Error),
}
