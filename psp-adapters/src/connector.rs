//! PSP connector interface

use crate::Result;
use async_trait::async_trait;
use payment_core::{PaymentRequest, PaymentResult, PaymentStatus};
use rust_decimal::Decimal;

/// PSP connector trait.
///
/// Every provider implements this uniformly; there is no capability
/// introspection anywhere in the gateway. Contract:
///
/// - `create_payment_intent` reports provider-side business failures
///   (declined card, invalid key) as `Ok(PaymentResult { success: false })`
///   with a populated error message. Only transport faults return `Err`,
///   which the orchestrator treats as retryable.
/// - Status mapping is a total function into [`PaymentStatus`]; unknown
///   provider statuses map to `Pending`, never to `Succeeded`.
/// - `test_connection` must not create financial side effects.
#[async_trait]
pub trait PspConnector: Send + Sync {
    /// Stable PSP identifier (registry key, e.g. "stripe")
    fn psp_id(&self) -> &str;

    /// Human-readable connector name
    fn name(&self) -> &str;

    /// Initiate a charge or hosted-payment session.
    ///
    /// Amounts arrive in major currency units; the connector converts to the
    /// provider's minor-unit convention internally.
    async fn create_payment_intent(&self, request: &PaymentRequest) -> Result<PaymentResult>;

    /// Advance a payment that requires an explicit confirmation step.
    ///
    /// Providers without a confirmation step implement this as a no-op
    /// returning the current status.
    async fn confirm_payment(
        &self,
        transaction_id: &str,
        payment_method_id: &str,
    ) -> Result<PaymentStatus>;

    /// Idempotent status query, safe to call arbitrarily many times
    async fn get_status(&self, transaction_id: &str) -> Result<PaymentStatus>;

    /// Refund a charge; full when `amount` is `None`, partial otherwise.
    ///
    /// Returns the provider refund id. A refund the provider rejects
    /// (amount exceeds the charge) surfaces as [`crate::Error::RefundRejected`].
    async fn refund(
        &self,
        transaction_id: &str,
        amount: Option<Decimal>,
        currency: &str,
        reason: Option<&str>,
    ) -> Result<String>;

    /// Lightweight reachability/credential check, no financial side effects
    async fn test_connection(&self) -> Result<()>;
}
