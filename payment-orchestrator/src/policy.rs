//! Merchant PSP policy seam
//!
//! Merchant onboarding owns which PSPs a merchant may route through; the
//! orchestrator fetches the allow-list per request through this trait and
//! feeds it into selection.

use async_trait::async_trait;
use std::collections::HashMap;

/// Per-merchant PSP allow-list lookup
#[async_trait]
pub trait MerchantPolicy: Send + Sync {
    /// Enabled PSP ids for the merchant; `None` means no restriction
    async fn enabled_psps(&self, merchant_id: &str) -> Option<Vec<String>>;
}

/// Policy that places no restriction on any merchant
pub struct AllowAllPolicy;

#[async_trait]
impl MerchantPolicy for AllowAllPolicy {
    async fn enabled_psps(&self, _merchant_id: &str) -> Option<Vec<String>> {
        None
    }
}

/// Fixed allow-lists, configured at startup.
///
/// A merchant absent from the map is unrestricted.
#[derive(Default)]
pub struct StaticMerchantPolicy {
    allow_lists: HashMap<String, Vec<String>>,
}

impl StaticMerchantPolicy {
    /// Create an empty policy
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict a merchant to the given PSPs
    pub fn restrict(mut self, merchant_id: impl Into<String>, psps: Vec<String>) -> Self {
        self.allow_lists.insert(merchant_id.into(), psps);
        self
    }
}

#[async_trait]
impl MerchantPolicy for StaticMerchantPolicy {
    async fn enabled_psps(&self, merchant_id: &str) -> Option<Vec<String>> {
        self.allow_lists.get(merchant_id).cloned()
    }
}
