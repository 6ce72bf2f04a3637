//! Shared test fixtures: a scriptable connector and a harness builder

use async_trait::async_trait;
use metrics_store::MetricsStore;
use parking_lot::Mutex;
use payment_core::{OrderItem, PaymentRequest, PaymentResult, PaymentStatus};
use payment_orchestrator::{
    AllowAllPolicy, InMemoryRepository, NullPublisher, OrchestratorConfig, OrderData,
    PaymentOrchestrator,
};
use psp_adapters::{
    Error, PspConnector, PspRegistry, Result, RoutingConstraints, RoutingPolicy,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::Map;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// What the scripted connector does on the next charge attempt
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Accept the charge
    Succeed,
    /// Provider-side decline with the given reason
    Decline(String),
    /// Transport fault (connection refused)
    Transport,
}

/// Scriptable in-process connector with call accounting
pub struct ScriptedConnector {
    id: String,
    behavior: Mutex<Behavior>,
    charge_calls: AtomicUsize,
    refund_calls: AtomicUsize,
}

impl ScriptedConnector {
    pub fn new(id: &str, behavior: Behavior) -> Arc<Self> {
        Arc::new(Self {
            id: id.to_string(),
            behavior: Mutex::new(behavior),
            charge_calls: AtomicUsize::new(0),
            refund_calls: AtomicUsize::new(0),
        })
    }

    pub fn set_behavior(&self, behavior: Behavior) {
        *self.behavior.lock() = behavior;
    }

    pub fn charge_calls(&self) -> usize {
        self.charge_calls.load(Ordering::SeqCst)
    }

    pub fn refund_calls(&self) -> usize {
        self.refund_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PspConnector for ScriptedConnector {
    fn psp_id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        "Scripted"
    }

    async fn create_payment_intent(&self, request: &PaymentRequest) -> Result<PaymentResult> {
        let n = self.charge_calls.fetch_add(1, Ordering::SeqCst) + 1;
        match self.behavior.lock().clone() {
            Behavior::Succeed => Ok(PaymentResult {
                success: true,
                transaction_id: Some(format!("{}_txn_{}_{}", self.id, request.order_id, n)),
                status: PaymentStatus::Succeeded,
                fee: dec!(0.30),
                error: None,
                raw: None,
            }),
            Behavior::Decline(reason) => {
                Ok(PaymentResult::failure(PaymentStatus::Failed, reason))
            }
            Behavior::Transport => Err(Error::Connection("connection refused".to_string())),
        }
    }

    async fn confirm_payment(&self, _transaction_id: &str, _method: &str) -> Result<PaymentStatus> {
        Ok(PaymentStatus::Succeeded)
    }

    async fn get_status(&self, _transaction_id: &str) -> Result<PaymentStatus> {
        Ok(PaymentStatus::Succeeded)
    }

    async fn refund(
        &self,
        transaction_id: &str,
        _amount: Option<Decimal>,
        _currency: &str,
        _reason: Option<&str>,
    ) -> Result<String> {
        self.refund_calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("refund_{transaction_id}"))
    }

    async fn test_connection(&self) -> Result<()> {
        Ok(())
    }
}

/// Orchestrator wired against in-memory everything
pub struct Harness {
    pub orchestrator: PaymentOrchestrator,
    pub repository: Arc<InMemoryRepository>,
    pub metrics: Arc<MetricsStore>,
}

/// Build an orchestrator over the given connectors, each registered with
/// its constraints in declaration order.
pub async fn harness(connectors: Vec<(Arc<ScriptedConnector>, RoutingConstraints)>) -> Harness {
    let registry = Arc::new(PspRegistry::new(RoutingPolicy::default()));
    for (connector, constraints) in connectors {
        registry.register(connector, constraints).await;
    }
    let repository = Arc::new(InMemoryRepository::new());
    let metrics = Arc::new(MetricsStore::new());
    let config = OrchestratorConfig {
        retry_base_delay_ms: 1, // keep backoff out of the test clock
        ..OrchestratorConfig::default()
    };
    let orchestrator = PaymentOrchestrator::new(
        registry,
        repository.clone(),
        Arc::new(NullPublisher),
        metrics.clone(),
        Arc::new(AllowAllPolicy),
        config,
    );
    Harness {
        orchestrator,
        repository,
        metrics,
    }
}

pub fn order_data(amount: Decimal, currency: &str) -> OrderData {
    OrderData {
        merchant_id: "merchant_1".to_string(),
        agent_id: Some("agent_1".to_string()),
        customer_email: "customer@example.com".to_string(),
        total_amount: amount,
        currency: currency.to_string(),
        items: vec![OrderItem {
            sku: "SKU-1".to_string(),
            name: "Widget".to_string(),
            quantity: 1,
            unit_price: amount,
        }],
        payment_method: Some("card".to_string()),
        customer_country: Some("US".to_string()),
        metadata: Map::new(),
    }
}
