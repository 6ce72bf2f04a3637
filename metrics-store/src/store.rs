//! Rolling-window metrics store

use crate::{
    event::{EventKind, EventStatus, MetricsEvent},
    snapshot::{EntityCounters, MetricsSnapshot, Scope, Summary},
    DEFAULT_WINDOW_SECONDS, LATENCY_SAMPLE_CAP,
};
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use tracing::debug;

/// Incrementally maintained counters for one entity
#[derive(Debug, Default)]
struct Counters {
    success: u64,
    fail: u64,
    retry: u64,
    /// Most recent latency samples, capped for averaging
    latency: VecDeque<u64>,
}

impl Counters {
    fn record(&mut self, status: EventStatus, latency_ms: u64) {
        match status {
            EventStatus::Succeeded => self.success += 1,
            EventStatus::Failed => self.fail += 1,
            EventStatus::QueuedForRetry => self.retry += 1,
        }
        if self.latency.len() == LATENCY_SAMPLE_CAP {
            self.latency.pop_front();
        }
        self.latency.push_back(latency_ms);
    }

    /// Rewind one evicted event. Latency samples are a most-recent rolling
    /// sample and are deliberately not rewound.
    fn unrecord(&mut self, status: EventStatus) {
        match status {
            EventStatus::Succeeded => self.success = self.success.saturating_sub(1),
            EventStatus::Failed => self.fail = self.fail.saturating_sub(1),
            EventStatus::QueuedForRetry => self.retry = self.retry.saturating_sub(1),
        }
    }

    fn export(&self) -> EntityCounters {
        EntityCounters {
            success_count: self.success,
            fail_count: self.fail,
            retry_count: self.retry,
            avg_latency_ms: mean(self.latency.iter().copied()),
        }
    }
}

fn mean(samples: impl Iterator<Item = u64>) -> f64 {
    let (sum, count) = samples.fold((0u64, 0u64), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        0.0
    } else {
        sum as f64 / count as f64
    }
}

/// Whether this event kind feeds the success/fail/retry aggregates.
///
/// Order-update events land in the buffer for audit but do not count
/// attempts; counting them would double-book every settled payment.
fn counts_toward_aggregates(kind: EventKind) -> bool {
    matches!(kind, EventKind::PaymentResult | EventKind::RetryQueued)
}

#[derive(Default)]
struct Inner {
    events: VecDeque<MetricsEvent>,
    psp: HashMap<String, Counters>,
    agents: HashMap<String, Counters>,
    merchants: HashMap<String, Counters>,
    psp_usage: HashMap<String, u64>,
}

impl Inner {
    fn apply(&mut self, event: &MetricsEvent) {
        if !counts_toward_aggregates(event.kind) {
            return;
        }
        self.psp
            .entry(event.psp.clone())
            .or_default()
            .record(event.status, event.latency_ms);
        if let Some(agent) = &event.agent_id {
            self.agents
                .entry(agent.clone())
                .or_default()
                .record(event.status, event.latency_ms);
        }
        self.merchants
            .entry(event.merchant_id.clone())
            .or_default()
            .record(event.status, event.latency_ms);
        if event.kind == EventKind::PaymentResult {
            *self.psp_usage.entry(event.psp.clone()).or_default() += 1;
        }
    }

    fn unapply(&mut self, event: &MetricsEvent) {
        if !counts_toward_aggregates(event.kind) {
            return;
        }
        if let Some(counters) = self.psp.get_mut(&event.psp) {
            counters.unrecord(event.status);
        }
        if let Some(agent) = &event.agent_id {
            if let Some(counters) = self.agents.get_mut(agent) {
                counters.unrecord(event.status);
            }
        }
        if let Some(counters) = self.merchants.get_mut(&event.merchant_id) {
            counters.unrecord(event.status);
        }
        if event.kind == EventKind::PaymentResult {
            if let Some(usage) = self.psp_usage.get_mut(&event.psp) {
                *usage = usage.saturating_sub(1);
            }
        }
    }

    /// Drop entries older than the window, rewinding the aggregates
    fn evict(&mut self, cutoff: DateTime<Utc>) {
        while let Some(front) = self.events.front() {
            if front.timestamp >= cutoff {
                break;
            }
            // Front exists by the loop condition
            if let Some(expired) = self.events.pop_front() {
                self.unapply(&expired);
            }
        }
    }
}

/// In-memory rolling-window metrics store.
///
/// One mutex guards the buffer and the derived counters together, so the two
/// can never diverge under concurrent writers.
pub struct MetricsStore {
    inner: Mutex<Inner>,
    window: Duration,
}

impl Default for MetricsStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsStore {
    /// Create a store with the default one-hour window
    pub fn new() -> Self {
        Self::with_window_seconds(DEFAULT_WINDOW_SECONDS)
    }

    /// Create a store with a custom window
    pub fn with_window_seconds(seconds: u64) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            window: Duration::seconds(seconds as i64),
        }
    }

    /// Record one event, evicting expired entries first
    pub fn record_event(&self, event: MetricsEvent) {
        let mut inner = self.inner.lock();
        inner.evict(Utc::now() - self.window);
        inner.apply(&event);
        debug!(
            kind = ?event.kind,
            psp = %event.psp,
            status = ?event.status,
            "Metrics event recorded"
        );
        inner.events.push_back(event);
    }

    /// Point-in-time snapshot for the given scope
    pub fn snapshot(&self, scope: &Scope) -> MetricsSnapshot {
        let mut inner = self.inner.lock();
        inner.evict(Utc::now() - self.window);

        if scope.is_global() {
            self.global_snapshot(&inner)
        } else {
            self.scoped_snapshot(&inner, scope)
        }
    }

    /// Clear all state. Test isolation only.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        *inner = Inner::default();
    }

    fn global_snapshot(&self, inner: &Inner) -> MetricsSnapshot {
        let psp: HashMap<String, EntityCounters> =
            inner.psp.iter().map(|(k, v)| (k.clone(), v.export())).collect();
        let agents = inner.agents.iter().map(|(k, v)| (k.clone(), v.export())).collect();
        let merchants = inner
            .merchants
            .iter()
            .map(|(k, v)| (k.clone(), v.export()))
            .collect();

        // Summary is derived from the per-PSP counters, which keeps the
        // cross-check invariant (summary == Σ per-PSP) true by construction
        let mut summary = Summary::default();
        for counters in psp.values() {
            summary.succeeded += counters.success_count;
            summary.failed += counters.fail_count;
            summary.retried += counters.retry_count;
        }
        summary.total = summary.succeeded + summary.failed + summary.retried;
        summary.avg_latency_ms = mean(
            inner
                .psp
                .values()
                .flat_map(|c| c.latency.iter().copied()),
        );

        MetricsSnapshot {
            generated_at: Utc::now(),
            window_seconds: self.window.num_seconds() as u64,
            psp,
            agents,
            merchants,
            psp_usage: inner.psp_usage.clone(),
            summary,
        }
    }

    /// Rebuild a single entity's slice from the raw buffer. The summary is
    /// recomputed from the filtered slice, not taken from the global one.
    fn scoped_snapshot(&self, inner: &Inner, scope: &Scope) -> MetricsSnapshot {
        let matches_scope = |event: &MetricsEvent| match scope {
            Scope::Agent(id) => event.agent_id.as_deref() == Some(id.as_str()),
            Scope::Merchant(id) => &event.merchant_id == id,
            _ => false,
        };

        let mut psp: HashMap<String, Counters> = HashMap::new();
        let mut agents: HashMap<String, Counters> = HashMap::new();
        let mut merchants: HashMap<String, Counters> = HashMap::new();
        let mut psp_usage: HashMap<String, u64> = HashMap::new();
        let mut summary = Summary::default();
        let mut latencies: Vec<u64> = Vec::new();

        for event in inner.events.iter().filter(|e| matches_scope(e)) {
            if !counts_toward_aggregates(event.kind) {
                continue;
            }
            psp.entry(event.psp.clone())
                .or_default()
                .record(event.status, event.latency_ms);
            if let Some(agent) = &event.agent_id {
                agents
                    .entry(agent.clone())
                    .or_default()
                    .record(event.status, event.latency_ms);
            }
            merchants
                .entry(event.merchant_id.clone())
                .or_default()
                .record(event.status, event.latency_ms);
            if event.kind == EventKind::PaymentResult {
                *psp_usage.entry(event.psp.clone()).or_default() += 1;
            }
            match event.status {
                EventStatus::Succeeded => summary.succeeded += 1,
                EventStatus::Failed => summary.failed += 1,
                EventStatus::QueuedForRetry => summary.retried += 1,
            }
            latencies.push(event.latency_ms);
        }
        summary.total = summary.succeeded + summary.failed + summary.retried;
        summary.avg_latency_ms = mean(latencies.into_iter());

        MetricsSnapshot {
            generated_at: Utc::now(),
            window_seconds: self.window.num_seconds() as u64,
            psp: psp.into_iter().map(|(k, v)| (k, v.export())).collect(),
            agents: agents.into_iter().map(|(k, v)| (k, v.export())).collect(),
            merchants: merchants.into_iter().map(|(k, v)| (k, v.export())).collect(),
            psp_usage,
            summary,
        }
    }
}
