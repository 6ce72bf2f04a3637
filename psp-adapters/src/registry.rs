//! PSP registry and selection policy
//!
//! The registry owns the configured connectors in declaration order and
//! implements the deterministic, tier-based routing described in the design
//! notes: filter by constraints, rank by fee or ceiling depending on the
//! amount tier, tie-break by declaration order. An explicit caller
//! preference overrides the policy entirely but is still validated against
//! existence and the enabled flag.

use crate::{connector::PspConnector, Error, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// Per-PSP routing constraints, configured at deployment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConstraints {
    /// Minimum admissible amount (major units)
    pub min_amount: Option<Decimal>,
    /// Maximum admissible amount (per-transaction ceiling, major units)
    pub max_amount: Option<Decimal>,
    /// Supported currencies (empty = all)
    pub currencies: Vec<String>,
    /// Supported countries (empty = all)
    pub countries: Vec<String>,
    /// Indicative fee in basis points, used by the low-amount tier
    pub fee_bps: u32,
    /// Static priority (lower wins) for ties within a tier
    pub priority: u32,
}

impl Default for RoutingConstraints {
    fn default() -> Self {
        Self {
            min_amount: None,
            max_amount: None,
            currencies: Vec::new(),
            countries: Vec::new(),
            fee_bps: 0,
            priority: 100,
        }
    }
}

/// Routing policy knobs.
///
/// The threshold is illustrative deployment policy, not a contract: below it
/// eligible PSPs rank by fee, at or above it by per-transaction ceiling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingPolicy {
    /// Amount below which the lowest-fee provider is preferred (major units)
    pub low_amount_threshold: Decimal,
}

impl Default for RoutingPolicy {
    fn default() -> Self {
        Self {
            low_amount_threshold: Decimal::from(100),
        }
    }
}

/// One selection request
#[derive(Debug, Clone)]
pub struct RouteRequest {
    /// Amount (major units)
    pub amount: Decimal,
    /// ISO 4217 currency code
    pub currency: String,
    /// Customer country, when known
    pub country: Option<String>,
    /// Explicit caller preference; overrides the policy when valid
    pub preferred_psp: Option<String>,
    /// Merchant allow-list (None = all configured PSPs)
    pub allowed_psps: Option<Vec<String>>,
}

/// Health read model for one PSP, derived from the last `test_connection`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PspStatus {
    /// PSP identifier
    pub psp_id: String,
    /// Connector name
    pub name: String,
    /// Enabled flag
    pub enabled: bool,
    /// Last health classification (None = never probed)
    pub healthy: Option<bool>,
    /// Failure message from the last probe, if any
    pub message: Option<String>,
    /// Last probe timestamp
    pub last_checked: Option<DateTime<Utc>>,
}

struct PspEntry {
    connector: Arc<dyn PspConnector>,
    constraints: RoutingConstraints,
    enabled: bool,
    healthy: Option<bool>,
    health_message: Option<String>,
    last_checked: Option<DateTime<Utc>>,
}

impl PspEntry {
    fn admits(&self, request: &RouteRequest) -> bool {
        if !self.enabled {
            return false;
        }
        if let Some(allowed) = &request.allowed_psps {
            if !allowed.iter().any(|p| p == self.connector.psp_id()) {
                return false;
            }
        }
        if let Some(min) = self.constraints.min_amount {
            if request.amount < min {
                return false;
            }
        }
        if let Some(max) = self.constraints.max_amount {
            if request.amount > max {
                return false;
            }
        }
        if !self.constraints.currencies.is_empty()
            && !self.constraints.currencies.iter().any(|c| c == &request.currency)
        {
            return false;
        }
        if !self.constraints.countries.is_empty() {
            // Unknown customer country is admitted; a listed mismatch is not
            if let Some(country) = &request.country {
                if !self.constraints.countries.iter().any(|c| c == country) {
                    return false;
                }
            }
        }
        true
    }
}

/// PSP registry
pub struct PspRegistry {
    /// Entries in declaration order (tie-break order)
    entries: RwLock<Vec<PspEntry>>,
    policy: RoutingPolicy,
}

impl PspRegistry {
    /// Create new registry
    pub fn new(policy: RoutingPolicy) -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            policy,
        }
    }

    /// Register a connector with its routing constraints.
    ///
    /// Re-registering an existing PSP id replaces the entry in place,
    /// keeping its declaration position.
    pub async fn register(&self, connector: Arc<dyn PspConnector>, constraints: RoutingConstraints) {
        let mut entries = self.entries.write().await;
        let entry = PspEntry {
            connector,
            constraints,
            enabled: true,
            healthy: None,
            health_message: None,
            last_checked: None,
        };
        if let Some(existing) = entries
            .iter_mut()
            .find(|e| e.connector.psp_id() == entry.connector.psp_id())
        {
            *existing = entry;
        } else {
            entries.push(entry);
        }
    }

    /// Enable or disable a PSP. The entry is replaced atomically under the
    /// write lock; in-flight reads never observe a partial update.
    pub async fn set_enabled(&self, psp_id: &str, enabled: bool) -> Result<()> {
        let mut entries = self.entries.write().await;
        let entry = entries
            .iter_mut()
            .find(|e| e.connector.psp_id() == psp_id)
            .ok_or_else(|| Error::UnknownPsp(psp_id.to_string()))?;
        entry.enabled = enabled;
        info!(psp = psp_id, enabled, "PSP enabled flag changed");
        Ok(())
    }

    /// Look up a connector by id, regardless of enabled flag.
    ///
    /// Refunds and reconciliation of already-made payments must keep working
    /// after a PSP is disabled for new traffic.
    pub async fn get(&self, psp_id: &str) -> Result<Arc<dyn PspConnector>> {
        let entries = self.entries.read().await;
        entries
            .iter()
            .find(|e| e.connector.psp_id() == psp_id)
            .map(|e| e.connector.clone())
            .ok_or_else(|| Error::UnknownPsp(psp_id.to_string()))
    }

    /// Select a PSP for the request. Deterministic: same inputs, same answer.
    pub async fn select_psp(&self, request: &RouteRequest) -> Result<String> {
        let entries = self.entries.read().await;

        // Explicit preference wins over policy, but never over existence,
        // the enabled flag, or the merchant allow-list
        if let Some(preferred) = &request.preferred_psp {
            let entry = entries
                .iter()
                .find(|e| e.connector.psp_id() == preferred.as_str())
                .ok_or_else(|| Error::UnknownPsp(preferred.clone()))?;
            if !entry.enabled {
                return Err(Error::PspDisabled {
                    psp: preferred.clone(),
                    reason: "disabled by configuration".to_string(),
                });
            }
            if let Some(allowed) = &request.allowed_psps {
                if !allowed.iter().any(|p| p == preferred) {
                    return Err(Error::PspDisabled {
                        psp: preferred.clone(),
                        reason: "not enabled for this merchant".to_string(),
                    });
                }
            }
            debug!(psp = %preferred, "Explicit PSP preference honored");
            return Ok(preferred.clone());
        }

        let eligible: Vec<(usize, &PspEntry)> = entries
            .iter()
            .enumerate()
            .filter(|(_, e)| e.admits(request))
            .collect();

        // Tier ranking; declaration index is always the final tie-break
        let selected = if request.amount < self.policy.low_amount_threshold {
            eligible
                .iter()
                .min_by_key(|(idx, e)| (e.constraints.fee_bps, e.constraints.priority, *idx))
        } else {
            eligible.iter().min_by_key(|(idx, e)| {
                let ceiling = e.constraints.max_amount.unwrap_or(Decimal::MAX);
                (Reverse(ceiling), e.constraints.priority, *idx)
            })
        };

        let entry = match selected {
            Some((_, entry)) => entry,
            None => {
                warn!(
                    amount = %request.amount,
                    currency = %request.currency,
                    "No eligible PSP for request"
                );
                return Err(Error::NoEligiblePsp {
                    amount: request.amount.to_string(),
                    currency: request.currency.clone(),
                });
            }
        };
        let psp = entry.connector.psp_id().to_string();
        debug!(psp = %psp, amount = %request.amount, "PSP selected by routing policy");
        Ok(psp)
    }

    /// Probe every connector and refresh the health read model
    pub async fn refresh_health(&self) {
        let connectors: Vec<(String, Arc<dyn PspConnector>)> = {
            let entries = self.entries.read().await;
            entries
                .iter()
                .map(|e| (e.connector.psp_id().to_string(), e.connector.clone()))
                .collect()
        };

        for (psp_id, connector) in connectors {
            let result = connector.test_connection().await;
            let checked_at = Utc::now();
            let mut entries = self.entries.write().await;
            if let Some(entry) = entries.iter_mut().find(|e| e.connector.psp_id() == psp_id) {
                match result {
                    Ok(()) => {
                        entry.healthy = Some(true);
                        entry.health_message = None;
                    }
                    Err(ref e) => {
                        warn!(psp = %psp_id, error = %e, "PSP health probe failed");
                        entry.healthy = Some(false);
                        entry.health_message = Some(e.to_string());
                    }
                }
                entry.last_checked = Some(checked_at);
            }
        }
    }

    /// Read model over all configured PSPs; never mutates adapter state
    pub async fn statuses(&self) -> Vec<PspStatus> {
        let entries = self.entries.read().await;
        entries
            .iter()
            .map(|e| PspStatus {
                psp_id: e.connector.psp_id().to_string(),
                name: e.connector.name().to_string(),
                enabled: e.enabled,
                healthy: e.healthy,
                message: e.health_message.clone(),
                last_checked: e.last_checked,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use payment_core::{PaymentRequest, PaymentResult, PaymentStatus};
    use rust_decimal_macros::dec;

    struct StubConnector {
        id: &'static str,
        reachable: bool,
    }

    #[async_trait]
    impl PspConnector for StubConnector {
        fn psp_id(&self) -> &str {
            self.id
        }

        fn name(&self) -> &str {
            self.id
        }

        async fn create_payment_intent(&self, _request: &PaymentRequest) -> Result<PaymentResult> {
            unimplemented!("selection tests never submit")
        }

        async fn confirm_payment(&self, _txn: &str, _method: &str) -> Result<PaymentStatus> {
            unimplemented!()
        }

        async fn get_status(&self, _txn: &str) -> Result<PaymentStatus> {
            unimplemented!()
        }

        async fn refund(
            &self,
            _txn: &str,
            _amount: Option<Decimal>,
            _currency: &str,
            _reason: Option<&str>,
        ) -> Result<String> {
            unimplemented!()
        }

        async fn test_connection(&self) -> Result<()> {
            if self.reachable {
                Ok(())
            } else {
                Err(Error::Connection("probe refused".to_string()))
            }
        }
    }

    fn stub(id: &'static str) -> Arc<dyn PspConnector> {
        Arc::new(StubConnector {
            id,
            reachable: true,
        })
    }

    fn usd_constraints(max: Decimal, fee_bps: u32) -> RoutingConstraints {
        RoutingConstraints {
            max_amount: Some(max),
            currencies: vec!["USD".to_string()],
            fee_bps,
            ..Default::default()
        }
    }

    fn route(amount: Decimal) -> RouteRequest {
        RouteRequest {
            amount,
            currency: "USD".to_string(),
            country: None,
            preferred_psp: None,
            allowed_psps: None,
        }
    }

    async fn two_psp_registry() -> PspRegistry {
        let registry = PspRegistry::new(RoutingPolicy::default());
        registry
            .register(stub("stripe"), usd_constraints(dec!(100000), 190))
            .await;
        registry
            .register(stub("adyen"), usd_constraints(dec!(50000), 250))
            .await;
        registry
    }

    #[tokio::test]
    async fn test_low_amount_prefers_lowest_fee() {
        let registry = two_psp_registry().await;
        let psp = registry.select_psp(&route(dec!(29.99))).await.unwrap();
        assert_eq!(psp, "stripe");
    }

    #[tokio::test]
    async fn test_high_amount_prefers_higher_ceiling() {
        let registry = two_psp_registry().await;
        let psp = registry.select_psp(&route(dec!(25000))).await.unwrap();
        assert_eq!(psp, "stripe");
    }

    #[tokio::test]
    async fn test_selection_is_deterministic() {
        let registry = two_psp_registry().await;
        let first = registry.select_psp(&route(dec!(42))).await.unwrap();
        for _ in 0..20 {
            assert_eq!(registry.select_psp(&route(dec!(42))).await.unwrap(), first);
        }
    }

    #[tokio::test]
    async fn test_tie_breaks_by_declaration_order() {
        let registry = PspRegistry::new(RoutingPolicy::default());
        registry
            .register(stub("adyen"), usd_constraints(dec!(50000), 200))
            .await;
        registry
            .register(stub("stripe"), usd_constraints(dec!(50000), 200))
            .await;
        let psp = registry.select_psp(&route(dec!(10))).await.unwrap();
        assert_eq!(psp, "adyen");
    }

    #[tokio::test]
    async fn test_explicit_preference_overrides_policy() {
        let registry = two_psp_registry().await;
        let mut request = route(dec!(29.99));
        request.preferred_psp = Some("adyen".to_string());
        assert_eq!(registry.select_psp(&request).await.unwrap(), "adyen");
    }

    #[tokio::test]
    async fn test_unknown_preference_is_hard_error() {
        let registry = two_psp_registry().await;
        let mut request = route(dec!(10));
        request.preferred_psp = Some("paypal".to_string());
        assert!(matches!(
            registry.select_psp(&request).await,
            Err(Error::UnknownPsp(_))
        ));
    }

    #[tokio::test]
    async fn test_disabled_preference_is_hard_error() {
        let registry = two_psp_registry().await;
        registry.set_enabled("adyen", false).await.unwrap();
        let mut request = route(dec!(10));
        request.preferred_psp = Some("adyen".to_string());
        assert!(matches!(
            registry.select_psp(&request).await,
            Err(Error::PspDisabled { .. })
        ));
    }

    #[tokio::test]
    async fn test_no_eligible_psp_is_hard_error() {
        let registry = two_psp_registry().await;
        let mut request = route(dec!(10));
        request.currency = "JPY".to_string();
        assert!(matches!(
            registry.select_psp(&request).await,
            Err(Error::NoEligiblePsp { .. })
        ));
    }

    #[tokio::test]
    async fn test_merchant_allow_list_restricts_selection() {
        let registry = two_psp_registry().await;
        let mut request = route(dec!(29.99));
        request.allowed_psps = Some(vec!["adyen".to_string()]);
        assert_eq!(registry.select_psp(&request).await.unwrap(), "adyen");
    }

    #[tokio::test]
    async fn test_amount_ceiling_filters() {
        let registry = two_psp_registry().await;
        // Above adyen's ceiling, below stripe's
        let psp = registry.select_psp(&route(dec!(75000))).await.unwrap();
        assert_eq!(psp, "stripe");
        // Above both ceilings
        assert!(matches!(
            registry.select_psp(&route(dec!(200000))).await,
            Err(Error::NoEligiblePsp { .. })
        ));
    }

    #[tokio::test]
    async fn test_health_read_model() {
        let registry = PspRegistry::new(RoutingPolicy::default());
        registry
            .register(
                Arc::new(StubConnector {
                    id: "stripe",
                    reachable: false,
                }),
                RoutingConstraints::default(),
            )
            .await;

        let before = registry.statuses().await;
        assert_eq!(before[0].healthy, None);

        registry.refresh_health().await;
        let after = registry.statuses().await;
        assert_eq!(after[0].healthy, Some(false));
        assert!(after[0].last_checked.is_some());
        assert!(after[0].message.is_some());
    }
}
