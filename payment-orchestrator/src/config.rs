//! Orchestrator configuration

use config::{ConfigError, Environment};
use serde::{Deserialize, Serialize};

/// Orchestrator tunables, loadable from the environment
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct OrchestratorConfig {
    /// Cap on retry calls per order (original submission not counted)
    pub max_retries: u32,
    /// Linear backoff base; a retry waits `base × retry_count`
    pub retry_base_delay_ms: u64,
    /// Rolling metrics window
    pub metrics_window_seconds: u64,
    /// Default adapter request timeout
    pub default_timeout_seconds: u64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_retries: payment_core::MAX_PAYMENT_RETRIES,
            retry_base_delay_ms: 500,
            metrics_window_seconds: payment_core::DEFAULT_METRICS_WINDOW_SECONDS,
            default_timeout_seconds: psp_adapters::DEFAULT_REQUEST_TIMEOUT_SECONDS,
        }
    }
}

impl OrchestratorConfig {
    /// Load from `PAYMENT_GATEWAY__`-prefixed environment variables,
    /// falling back to the defaults above
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        config::Config::builder()
            .set_default("max_retries", defaults.max_retries as i64)?
            .set_default("retry_base_delay_ms", defaults.retry_base_delay_ms as i64)?
            .set_default("metrics_window_seconds", defaults.metrics_window_seconds as i64)?
            .set_default("default_timeout_seconds", defaults.default_timeout_seconds as i64)?
            .add_source(Environment::with_prefix("PAYMENT_GATEWAY").separator("__"))
            .build()?
            .try_deserialize()
    }
}
