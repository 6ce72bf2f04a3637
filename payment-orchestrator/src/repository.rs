//! Persistence seam for orders and payments
//!
//! The orchestrator only talks to this trait; the storage engine behind it
//! is a deployment concern. The one hard requirement is the conditional
//! transition: "at most one succeeded payment per order" is enforced here,
//! not by call ordering.

use crate::{Error, Result};
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use payment_core::{Order, OrderStatus, Payment, PaymentStatus};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Row counts for the status read model
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RepoCounts {
    /// Orders stored
    pub orders: u64,
    /// Payment attempts stored
    pub payments: u64,
    /// Payment attempts with status succeeded
    pub succeeded_payments: u64,
    /// Payment attempts with status failed
    pub failed_payments: u64,
}

/// Order/payment persistence interface
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Insert a new order
    async fn create_order(&self, order: Order) -> Result<()>;

    /// Fetch an order by id
    async fn get_order(&self, order_id: Uuid) -> Result<Option<Order>>;

    /// Conditionally transition an order's status: applied only when the
    /// current status is in `from`. Returns whether the transition applied.
    ///
    /// Must be atomic with respect to concurrent callers; two racing
    /// submissions for one order see exactly one `true`.
    async fn transition_order_status(
        &self,
        order_id: Uuid,
        from: &[OrderStatus],
        to: OrderStatus,
    ) -> Result<bool>;

    /// Record the PSP chosen for an order
    async fn set_order_psp(&self, order_id: Uuid, psp: &str) -> Result<()>;

    /// Record a settled refund: adds `amount` to the order's cumulative
    /// refunded total and sets the new status, atomically per order
    async fn record_refund(
        &self,
        order_id: Uuid,
        amount: Decimal,
        status: OrderStatus,
    ) -> Result<()>;

    /// Insert a payment attempt row
    async fn create_payment(&self, payment: Payment) -> Result<()>;

    /// Update a payment row's status
    async fn update_payment_status(&self, payment_id: Uuid, status: PaymentStatus) -> Result<()>;

    /// Fetch a payment by id
    async fn get_payment(&self, payment_id: Uuid) -> Result<Option<Payment>>;

    /// All payment attempts for an order, oldest first
    async fn payments_for_order(&self, order_id: Uuid) -> Result<Vec<Payment>>;

    /// Row counts for the status read model
    async fn counts(&self) -> Result<RepoCounts>;
}

/// In-memory repository on sharded maps.
///
/// The conditional transition holds the entry's shard lock across the
/// check-and-set, which gives the required atomicity per order.
#[derive(Default)]
pub struct InMemoryRepository {
    orders: DashMap<Uuid, Order>,
    payments: DashMap<Uuid, Payment>,
}

impl InMemoryRepository {
    /// Create an empty repository
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderRepository for InMemoryRepository {
    async fn create_order(&self, order: Order) -> Result<()> {
        if self.orders.contains_key(&order.id) {
            return Err(Error::Repository(format!("duplicate order id {}", order.id)));
        }
        self.orders.insert(order.id, order);
        Ok(())
    }

    async fn get_order(&self, order_id: Uuid) -> Result<Option<Order>> {
        Ok(self.orders.get(&order_id).map(|o| o.clone()))
    }

    async fn transition_order_status(
        &self,
        order_id: Uuid,
        from: &[OrderStatus],
        to: OrderStatus,
    ) -> Result<bool> {
        let mut order = self
            .orders
            .get_mut(&order_id)
            .ok_or(Error::OrderNotFound(order_id))?;
        if !from.contains(&order.status) {
            return Ok(false);
        }
        order.status = to;
        order.updated_at = Utc::now();
        Ok(true)
    }

    async fn set_order_psp(&self, order_id: Uuid, psp: &str) -> Result<()> {
        let mut order = self
            .orders
            .get_mut(&order_id)
            .ok_or(Error::OrderNotFound(order_id))?;
        order.psp = Some(psp.to_string());
        order.updated_at = Utc::now();
        Ok(())
    }

    async fn record_refund(
        &self,
        order_id: Uuid,
        amount: Decimal,
        status: OrderStatus,
    ) -> Result<()> {
        let mut order = self
            .orders
            .get_mut(&order_id)
            .ok_or(Error::OrderNotFound(order_id))?;
        order.refunded_amount += amount;
        order.status = status;
        order.updated_at = Utc::now();
        Ok(())
    }

    async fn create_payment(&self, payment: Payment) -> Result<()> {
        if self.payments.contains_key(&payment.id) {
            return Err(Error::Repository(format!(
                "duplicate payment id {}",
                payment.id
            )));
        }
        self.payments.insert(payment.id, payment);
        Ok(())
    }

    async fn update_payment_status(&self, payment_id: Uuid, status: PaymentStatus) -> Result<()> {
        let mut payment = self
            .payments
            .get_mut(&payment_id)
            .ok_or(Error::PaymentNotFound(payment_id))?;
        payment.status = status;
        Ok(())
    }

    async fn get_payment(&self, payment_id: Uuid) -> Result<Option<Payment>> {
        Ok(self.payments.get(&payment_id).map(|p| p.clone()))
    }

    async fn payments_for_order(&self, order_id: Uuid) -> Result<Vec<Payment>> {
        let mut payments: Vec<Payment> = self
            .payments
            .iter()
            .filter(|p| p.order_id == order_id)
            .map(|p| p.clone())
            .collect();
        payments.sort_by_key(|p| p.created_at);
        Ok(payments)
    }

    async fn counts(&self) -> Result<RepoCounts> {
        let mut counts = RepoCounts {
            orders: self.orders.len() as u64,
            payments: self.payments.len() as u64,
            ..Default::default()
        };
        for payment in self.payments.iter() {
            match payment.status {
                PaymentStatus::Succeeded => counts.succeeded_payments += 1,
                PaymentStatus::Failed => counts.failed_payments += 1,
                _ => {}
            }
        }
        Ok(counts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn order() -> Order {
        Order {
            id: Uuid::new_v4(),
            merchant_id: "merchant-1".to_string(),
            agent_id: None,
            customer_email: "buyer@example.com".to_string(),
            total_amount: dec!(50.00),
            refunded_amount: Decimal::ZERO,
            currency: "USD".to_string(),
            customer_country: None,
            status: OrderStatus::Pending,
            items: Vec::new(),
            payment_method: None,
            psp: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            metadata: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_conditional_transition() {
        let repo = InMemoryRepository::new();
        let o = order();
        let id = o.id;
        repo.create_order(o).await.unwrap();

        assert!(repo
            .transition_order_status(id, &[OrderStatus::Pending, OrderStatus::Failed], OrderStatus::Paid)
            .await
            .unwrap());
        // Second transition finds the order already paid
        assert!(!repo
            .transition_order_status(id, &[OrderStatus::Pending, OrderStatus::Failed], OrderStatus::Paid)
            .await
            .unwrap());
        assert_eq!(
            repo.get_order(id).await.unwrap().unwrap().status,
            OrderStatus::Paid
        );
    }

    #[tokio::test]
    async fn test_concurrent_transitions_single_winner() {
        let repo = std::sync::Arc::new(InMemoryRepository::new());
        let o = order();
        let id = o.id;
        repo.create_order(o).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..16 {
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                repo.transition_order_status(
                    id,
                    &[OrderStatus::Pending, OrderStatus::Failed],
                    OrderStatus::Paid,
                )
                .await
                .unwrap()
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_record_refund_accumulates() {
        let repo = InMemoryRepository::new();
        let o = order();
        let id = o.id;
        repo.create_order(o).await.unwrap();

        repo.record_refund(id, dec!(20.00), OrderStatus::PartiallyRefunded)
            .await
            .unwrap();
        repo.record_refund(id, dec!(30.00), OrderStatus::Refunded)
            .await
            .unwrap();

        let stored = repo.get_order(id).await.unwrap().unwrap();
        assert_eq!(stored.refunded_amount, dec!(50.00));
        assert_eq!(stored.status, OrderStatus::Refunded);
    }

    #[tokio::test]
    async fn test_missing_order_is_an_error() {
        let repo = InMemoryRepository::new();
        let result = repo
            .transition_order_status(Uuid::new_v4(), &[OrderStatus::Pending], OrderStatus::Paid)
            .await;
        assert!(matches!(result, Err(Error::OrderNotFound(_))));
    }
}
