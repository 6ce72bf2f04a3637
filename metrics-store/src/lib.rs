//! # PayRail Metrics Store
//!
//! In-memory rolling-window aggregator for payment-pipeline observability.
//! Every payment attempt is recorded as an event in a time-bounded buffer;
//! per-PSP, per-agent and per-merchant counters are maintained incrementally
//! alongside it and stay consistent with the buffer: eviction decrements the
//! counters, so the aggregates are truly windowed rather than
//! lifetime-cumulative.
//!
//! All state sits behind a single mutex per store instance; operations are
//! short and never suspend, so concurrent writers cannot lose updates.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod event;
pub mod snapshot;
pub mod store;

pub use event::{EventKind, EventStatus, MetricsEvent};
pub use snapshot::{EntityCounters, MetricsSnapshot, Scope, Summary};
pub use store::MetricsStore;

/// Default rolling window (seconds)
pub const DEFAULT_WINDOW_SECONDS: u64 = 3600;

/// Latency samples retained per entity for averaging
pub const LATENCY_SAMPLE_CAP: usize = 100;
