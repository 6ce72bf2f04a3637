//! Snapshot read model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Caller scope for a snapshot request.
///
/// Elevated roles see global data; agent/merchant scopes see only their own
/// slice, with the summary recomputed from that slice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Full visibility
    Admin,
    /// Full visibility
    Operator,
    /// Full visibility, read-only dashboards
    Viewer,
    /// Single-agent slice
    Agent(String),
    /// Single-merchant slice
    Merchant(String),
}

impl Scope {
    /// Whether this scope sees global data
    pub fn is_global(&self) -> bool {
        matches!(self, Scope::Admin | Scope::Operator | Scope::Viewer)
    }
}

/// Aggregated counters for one entity (a PSP, agent or merchant)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityCounters {
    /// Succeeded attempts in the window
    pub success_count: u64,
    /// Failed attempts in the window
    pub fail_count: u64,
    /// Attempts queued for retry in the window
    pub retry_count: u64,
    /// Mean latency over the retained samples (ms)
    pub avg_latency_ms: f64,
}

impl EntityCounters {
    /// Total attempts in the window
    pub fn total(&self) -> u64 {
        self.success_count + self.fail_count + self.retry_count
    }

    /// Success rate over the window (1.0 when no attempts)
    pub fn success_rate(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 1.0;
        }
        self.success_count as f64 / total as f64
    }
}

/// Overall summary across the (possibly filtered) slice
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Summary {
    /// Total events
    pub total: u64,
    /// Succeeded
    pub succeeded: u64,
    /// Failed
    pub failed: u64,
    /// Queued for retry
    pub retried: u64,
    /// Mean latency (ms)
    pub avg_latency_ms: f64,
}

/// Point-in-time view of the rolling window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// When the snapshot was taken
    pub generated_at: DateTime<Utc>,
    /// Window length (seconds)
    pub window_seconds: u64,
    /// Per-PSP counters
    pub psp: HashMap<String, EntityCounters>,
    /// Per-agent counters
    pub agents: HashMap<String, EntityCounters>,
    /// Per-merchant counters
    pub merchants: HashMap<String, EntityCounters>,
    /// Global PSP usage (attempts routed per PSP)
    pub psp_usage: HashMap<String, u64>,
    /// Summary over the slice this snapshot covers
    pub summary: Summary,
}
