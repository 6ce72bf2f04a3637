//! Payment orchestration state machine

use crate::{
    config::OrchestratorConfig,
    policy::MerchantPolicy,
    publisher::{EventPublisher, GatewayEvent},
    repository::{OrderRepository, RepoCounts},
    Error, Result,
};
use chrono::Utc;
use metrics_store::{EventKind, EventStatus, MetricsEvent, MetricsStore, Scope};
use payment_core::{
    currency, Order, OrderItem, OrderStatus, OrchestrationResult, Payment, PaymentRequest,
    PaymentResult, PaymentStatus, RefundResult,
};
use psp_adapters::{metrics as psp_metrics, PspRegistry, PspStatus, RouteRequest};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};
use uuid::Uuid;

/// Inbound order description, as received from the controller layer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderData {
    /// Merchant id
    pub merchant_id: String,
    /// Selling agent, if any
    pub agent_id: Option<String>,
    /// Customer email
    pub customer_email: String,
    /// Total amount (major units)
    pub total_amount: Decimal,
    /// ISO 4217 currency code
    pub currency: String,
    /// Line items
    pub items: Vec<OrderItem>,
    /// Payment method hint
    pub payment_method: Option<String>,
    /// Customer country, when known (routing input)
    pub customer_country: Option<String>,
    /// Free-form metadata
    pub metadata: Map<String, Value>,
}

/// Aggregate view for the admin/status surface
#[derive(Debug, Clone, Serialize)]
pub struct OrchestrationStatus {
    /// Per-PSP enabled/health read model
    pub psp_statuses: Vec<PspStatus>,
    /// Retries currently waiting out their backoff
    pub retry_queue_size: usize,
    /// Stored row counts
    pub totals: RepoCounts,
}

/// Top-level coordinator: validates, routes, submits, persists, emits.
///
/// This is the error boundary for adapter faults: the submit path converts
/// every adapter `Err` into a failed result; callers only ever see typed
/// pre-submit errors or a structured [`OrchestrationResult`].
pub struct PaymentOrchestrator {
    registry: Arc<PspRegistry>,
    repository: Arc<dyn OrderRepository>,
    publisher: Arc<dyn EventPublisher>,
    metrics: Arc<MetricsStore>,
    policy: Arc<dyn MerchantPolicy>,
    config: OrchestratorConfig,
    retry_queue_size: AtomicUsize,
}

impl PaymentOrchestrator {
    /// Wire up an orchestrator
    pub fn new(
        registry: Arc<PspRegistry>,
        repository: Arc<dyn OrderRepository>,
        publisher: Arc<dyn EventPublisher>,
        metrics: Arc<MetricsStore>,
        policy: Arc<dyn MerchantPolicy>,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            registry,
            repository,
            publisher,
            metrics,
            policy,
            config,
            retry_queue_size: AtomicUsize::new(0),
        }
    }

    /// Process a new order end to end: validate, create the order record,
    /// select a PSP, submit, persist the attempt, emit events.
    pub async fn process_order_payment(
        &self,
        order_data: OrderData,
        preferred_psp: Option<String>,
    ) -> Result<OrchestrationResult> {
        Self::validate(&order_data)?;

        let now = Utc::now();
        let order = Order {
            id: Uuid::new_v4(),
            merchant_id: order_data.merchant_id.clone(),
            agent_id: order_data.agent_id.clone(),
            customer_email: order_data.customer_email.clone(),
            total_amount: order_data.total_amount,
            refunded_amount: Decimal::ZERO,
            currency: order_data.currency.clone(),
            customer_country: order_data.customer_country.clone(),
            status: OrderStatus::Pending,
            items: order_data.items.clone(),
            payment_method: order_data.payment_method.clone(),
            psp: None,
            created_at: now,
            updated_at: now,
            metadata: order_data.metadata.clone(),
        };
        self.repository.create_order(order.clone()).await?;
        info!(order_id = %order.id, merchant = %order.merchant_id, "Order created");

        self.submit_attempt(&order, 1, preferred_psp).await
    }

    /// Retry a failed payment. Hard-capped; waits out a linear backoff, then
    /// re-runs the full selection + submission path, so the PSP may change
    /// between attempts.
    pub async fn retry_failed_payment(
        &self,
        order_id: Uuid,
        retry_count: u32,
    ) -> Result<OrchestrationResult> {
        if retry_count == 0 {
            return Err(Error::Validation("retry count must be at least 1".to_string()));
        }
        if retry_count > self.config.max_retries {
            warn!(order_id = %order_id, retry_count, "Retry cap exceeded");
            return Err(Error::MaxRetriesExceeded {
                order_id,
                max: self.config.max_retries,
            });
        }

        let order = self
            .repository
            .get_order(order_id)
            .await?
            .ok_or(Error::OrderNotFound(order_id))?;
        if order.status == OrderStatus::Paid {
            return Err(Error::Validation(format!("order {order_id} is already paid")));
        }

        let attempt = retry_count + 1;
        let delay_ms = self.config.retry_base_delay_ms * u64::from(retry_count);
        info!(order_id = %order_id, attempt, delay_ms, "Retry queued");
        let last_psp = order.psp.clone().unwrap_or_else(|| "unrouted".to_string());
        self.record_metrics(&order, &last_psp, EventKind::RetryQueued, EventStatus::QueuedForRetry, 0, attempt);
        self.publish_best_effort(GatewayEvent::RetryQueued {
            order_id,
            attempt,
            delay_ms,
        })
        .await;

        // Blocking wait from the caller's perspective
        self.retry_queue_size.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        self.retry_queue_size.fetch_sub(1, Ordering::SeqCst);

        self.submit_attempt(&order, attempt, None).await
    }

    /// Refund a paid order, fully or partially.
    ///
    /// Idempotent at the order level: refunding an already-refunded order
    /// short-circuits without a second provider call. A request exceeding
    /// the refundable balance (original total minus prior refunds) is
    /// rejected before contacting any adapter.
    pub async fn process_refund(
        &self,
        order_id: Uuid,
        amount: Option<Decimal>,
        reason: Option<&str>,
    ) -> Result<RefundResult> {
        let order = self
            .repository
            .get_order(order_id)
            .await?
            .ok_or(Error::OrderNotFound(order_id))?;

        if order.status == OrderStatus::Refunded {
            info!(order_id = %order_id, "Refund short-circuited: already refunded");
            return Ok(RefundResult {
                success: true,
                order_id,
                refund_id: None,
                amount: Decimal::ZERO,
                order_status: OrderStatus::Refunded,
                already_refunded: true,
                error: None,
            });
        }
        if !matches!(order.status, OrderStatus::Paid | OrderStatus::PartiallyRefunded) {
            return Err(Error::NotRefundable {
                order_id,
                status: order.status.to_string(),
            });
        }

        // Cap against the refundable balance, not the original total:
        // partial refunds must never sum past what was charged
        let available = order.total_amount - order.refunded_amount;
        let requested = amount.unwrap_or(available);
        if requested <= Decimal::ZERO {
            return Err(Error::Validation("refund amount must be positive".to_string()));
        }
        if requested > available {
            return Err(Error::RefundExceedsOriginal {
                requested,
                available,
                total: order.total_amount,
            });
        }

        let settled = self
            .repository
            .payments_for_order(order_id)
            .await?
            .into_iter()
            .find(|p| p.status == PaymentStatus::Succeeded)
            .ok_or(Error::NoSettledPayment(order_id))?;
        let transaction_id = settled
            .transaction_id
            .clone()
            .ok_or(Error::NoSettledPayment(order_id))?;

        let connector = self.registry.get(&settled.psp).await?;
        let start = Instant::now();
        let refund = connector
            .refund(&transaction_id, amount, &order.currency, reason)
            .await;
        psp_metrics::observe_request(&settled.psp, "refund", refund.is_ok(), start.elapsed());

        match refund {
            Ok(refund_id) => {
                let new_status = if order.refunded_amount + requested >= order.total_amount {
                    OrderStatus::Refunded
                } else {
                    OrderStatus::PartiallyRefunded
                };
                self.repository
                    .record_refund(order_id, requested, new_status)
                    .await?;
                info!(order_id = %order_id, refund_id = %refund_id, amount = %requested, "Refund settled");
                self.publish_best_effort(GatewayEvent::Refund {
                    order_id,
                    refund_id: refund_id.clone(),
                    amount: requested,
                    order_status: new_status,
                })
                .await;
                Ok(RefundResult {
                    success: true,
                    order_id,
                    refund_id: Some(refund_id),
                    amount: requested,
                    order_status: new_status,
                    already_refunded: false,
                    error: None,
                })
            }
            Err(e) => {
                // Order status stays untouched; the failure is surfaced
                warn!(order_id = %order_id, error = %e, "Refund failed");
                Ok(RefundResult {
                    success: false,
                    order_id,
                    refund_id: None,
                    amount: Decimal::ZERO,
                    order_status: order.status,
                    already_refunded: false,
                    error: Some(Self::human_error(&e)),
                })
            }
        }
    }

    /// Advance a requires-action payment through the provider's
    /// confirmation step and fold the outcome into the stored records.
    pub async fn confirm_payment(
        &self,
        payment_id: Uuid,
        payment_method_id: &str,
    ) -> Result<PaymentStatus> {
        let payment = self
            .repository
            .get_payment(payment_id)
            .await?
            .ok_or(Error::PaymentNotFound(payment_id))?;
        // A settled payment is terminal; re-confirming is a no-op
        if payment.status == PaymentStatus::Succeeded {
            return Ok(PaymentStatus::Succeeded);
        }

        let connector = self.registry.get(&payment.psp).await?;
        let transaction_id = payment
            .transaction_id
            .clone()
            .ok_or_else(|| Error::Validation(format!("payment {payment_id} has no transaction id")))?;

        let start = Instant::now();
        let status = connector
            .confirm_payment(&transaction_id, payment_method_id)
            .await;
        psp_metrics::observe_request(&payment.psp, "confirm_payment", status.is_ok(), start.elapsed());
        let status = status?;

        self.settle_payment_status(&payment, status).await
    }

    /// Idempotent reconciliation poll: fetch the provider-side status and
    /// fold any change back into the stored payment.
    pub async fn reconcile_payment(&self, payment_id: Uuid) -> Result<PaymentStatus> {
        let payment = self
            .repository
            .get_payment(payment_id)
            .await?
            .ok_or(Error::PaymentNotFound(payment_id))?;

        let transaction_id = match payment.transaction_id.clone() {
            Some(id) => id,
            // Nothing provider-side to reconcile against
            None => return Ok(payment.status),
        };

        let connector = self.registry.get(&payment.psp).await?;
        let start = Instant::now();
        let status = connector.get_status(&transaction_id).await;
        psp_metrics::observe_request(&payment.psp, "get_status", status.is_ok(), start.elapsed());
        let status = status?;

        if status == payment.status {
            return Ok(status);
        }
        self.settle_payment_status(&payment, status).await
    }

    /// Aggregate status surface for admin/ops
    pub async fn status(&self) -> Result<OrchestrationStatus> {
        Ok(OrchestrationStatus {
            psp_statuses: self.registry.statuses().await,
            retry_queue_size: self.retry_queue_size.load(Ordering::SeqCst),
            totals: self.repository.counts().await?,
        })
    }

    /// Windowed metrics snapshot for the given scope
    pub fn metrics_snapshot(&self, scope: &Scope) -> metrics_store::MetricsSnapshot {
        self.metrics.snapshot(scope)
    }

    // ---------------------------------------------------------------------
    // internals
    // ---------------------------------------------------------------------

    fn validate(order_data: &OrderData) -> Result<()> {
        if order_data.total_amount <= Decimal::ZERO {
            return Err(Error::Validation(format!(
                "amount must be positive, got {}",
                order_data.total_amount
            )));
        }
        if !currency::is_recognized(&order_data.currency) {
            return Err(Error::Validation(format!(
                "unrecognized currency code {}",
                order_data.currency
            )));
        }
        if order_data.customer_email.trim().is_empty() {
            return Err(Error::Validation("customer email is required".to_string()));
        }
        Ok(())
    }

    /// One submission attempt against an existing order record.
    ///
    /// The routing country comes from the order itself, so retries filter
    /// against the same constraints as the original submission.
    async fn submit_attempt(
        &self,
        order: &Order,
        attempt: u32,
        preferred_psp: Option<String>,
    ) -> Result<OrchestrationResult> {
        let allowed_psps = self.policy.enabled_psps(&order.merchant_id).await;
        let route = RouteRequest {
            amount: order.total_amount,
            currency: order.currency.clone(),
            country: order.customer_country.clone(),
            preferred_psp,
            allowed_psps,
        };

        let psp = match self.registry.select_psp(&route).await {
            Ok(psp) => psp,
            Err(e) => {
                // Routing errors are pre-submit and terminal for this path
                self.repository
                    .transition_order_status(order.id, &[OrderStatus::Pending], OrderStatus::Failed)
                    .await?;
                self.publish_order_update(order, OrderStatus::Failed).await;
                return Err(e.into());
            }
        };
        self.repository.set_order_psp(order.id, &psp).await?;

        let request = PaymentRequest {
            amount: order.total_amount,
            currency: order.currency.clone(),
            customer_email: order.customer_email.clone(),
            payment_method: order.payment_method.clone(),
            order_id: order.id,
            metadata: order.metadata.clone(),
        };

        let connector = self.registry.get(&psp).await?;
        let start = Instant::now();
        let outcome = connector.create_payment_intent(&request).await;
        let elapsed = start.elapsed();
        let latency_ms = elapsed.as_millis() as u64;
        psp_metrics::observe_request(&psp, "create_payment_intent", outcome.is_ok(), elapsed);

        // Error boundary: adapter faults become failed results, never
        // exceptions to our caller
        let result = match outcome {
            Ok(result) => result,
            Err(e) => {
                error!(order_id = %order.id, psp = %psp, error = %e, "Adapter fault during submission");
                PaymentResult::failure(PaymentStatus::Failed, Self::human_error(&e))
            }
        };

        let payment = Payment {
            id: Uuid::new_v4(),
            order_id: order.id,
            amount: order.total_amount,
            currency: order.currency.clone(),
            psp: psp.clone(),
            status: result.status,
            transaction_id: result.transaction_id.clone(),
            fee: result.fee,
            attempt,
            created_at: Utc::now(),
            metadata: order.metadata.clone(),
        };
        // Every attempt is recorded, failures included
        self.repository.create_payment(payment.clone()).await?;

        let (final_success, final_error, final_status) = if result.success {
            // Conditional transition enforces at-most-one-success even under
            // concurrent duplicate submissions
            let won = self
                .repository
                .transition_order_status(
                    order.id,
                    &[OrderStatus::Pending, OrderStatus::Failed],
                    OrderStatus::Paid,
                )
                .await?;
            if won {
                info!(order_id = %order.id, psp = %psp, attempt, "Payment settled");
                self.publish_order_update(order, OrderStatus::Paid).await;
                (true, None, PaymentStatus::Succeeded)
            } else {
                // A concurrent attempt already paid this order; demote this
                // row so at most one succeeded payment exists
                warn!(order_id = %order.id, psp = %psp, "Duplicate settlement detected");
                self.repository
                    .update_payment_status(payment.id, PaymentStatus::Cancelled)
                    .await?;
                (
                    false,
                    Some("order already paid by a concurrent attempt".to_string()),
                    PaymentStatus::Cancelled,
                )
            }
        } else {
            self.repository
                .transition_order_status(order.id, &[OrderStatus::Pending], OrderStatus::Failed)
                .await?;
            self.publish_order_update(order, OrderStatus::Failed).await;
            let message = result
                .error
                .clone()
                .unwrap_or_else(|| "payment failed".to_string());
            (false, Some(message), result.status)
        };

        let event_status = if final_success {
            EventStatus::Succeeded
        } else {
            EventStatus::Failed
        };
        self.record_metrics(order, &psp, EventKind::PaymentResult, event_status, latency_ms, attempt);
        self.publish_best_effort(GatewayEvent::PaymentResult {
            order_id: order.id,
            payment_id: payment.id,
            psp: psp.clone(),
            status: final_status,
            latency_ms,
            amount: order.total_amount,
            currency: order.currency.clone(),
            attempt,
        })
        .await;

        Ok(OrchestrationResult {
            success: final_success,
            order_id: order.id,
            payment_id: Some(payment.id),
            psp: Some(psp),
            transaction_id: result.transaction_id,
            amount: order.total_amount,
            currency: order.currency.clone(),
            fee: result.fee,
            error: final_error,
        })
    }

    /// Fold a provider-reported status into a stored payment, keeping the
    /// at-most-one-success invariant through the repository CAS
    async fn settle_payment_status(
        &self,
        payment: &Payment,
        status: PaymentStatus,
    ) -> Result<PaymentStatus> {
        // A row that already settled must never be demoted: it is the one
        // the order's paid status points at
        if payment.status == PaymentStatus::Succeeded {
            return Ok(PaymentStatus::Succeeded);
        }
        if status == PaymentStatus::Succeeded {
            let won = self
                .repository
                .transition_order_status(
                    payment.order_id,
                    &[OrderStatus::Pending, OrderStatus::Failed],
                    OrderStatus::Paid,
                )
                .await?;
            if won {
                self.repository
                    .update_payment_status(payment.id, PaymentStatus::Succeeded)
                    .await?;
                info!(order_id = %payment.order_id, payment_id = %payment.id, "Payment settled via {}", payment.psp);
                return Ok(PaymentStatus::Succeeded);
            }
            // Another attempt already paid the order
            self.repository
                .update_payment_status(payment.id, PaymentStatus::Cancelled)
                .await?;
            return Ok(PaymentStatus::Cancelled);
        }

        self.repository.update_payment_status(payment.id, status).await?;
        Ok(status)
    }

    fn record_metrics(
        &self,
        order: &Order,
        psp: &str,
        kind: EventKind,
        status: EventStatus,
        latency_ms: u64,
        attempt: u32,
    ) {
        self.metrics.record_event(MetricsEvent {
            kind,
            order_id: order.id,
            psp: psp.to_string(),
            agent_id: order.agent_id.clone(),
            merchant_id: order.merchant_id.clone(),
            status,
            latency_ms,
            attempt,
            amount: order.total_amount,
            currency: order.currency.clone(),
            timestamp: Utc::now(),
        });
    }

    async fn publish_order_update(&self, order: &Order, status: OrderStatus) {
        self.publish_best_effort(GatewayEvent::OrderUpdate {
            order_id: order.id,
            merchant_id: order.merchant_id.clone(),
            status,
        })
        .await;
    }

    /// Best-effort publish: a failure here must never overturn a recorded
    /// payment outcome
    async fn publish_best_effort(&self, event: GatewayEvent) {
        if let Err(e) = self.publisher.publish(&event).await {
            warn!(error = %e, "Event publish failed; continuing");
        }
    }

    /// Provider-neutral, human-readable failure message
    fn human_error(e: &psp_adapters::Error) -> String {
        if e.is_transport() {
            "payment system temporarily unavailable, please retry".to_string()
        } else {
            e.to_string()
        }
    }
}
