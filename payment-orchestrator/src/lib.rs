//! # PayRail Orchestrator
//!
//! Drives an order through the payment pipeline:
//!
//! ```text
//! order data ──▶ validate ──▶ select PSP ──▶ submit ──▶ persist
//!                                                │
//!                                ┌───────────────┴─────────────┐
//!                                ▼                             ▼
//!                          metrics store              event publisher
//! ```
//!
//! The orchestrator is the error boundary for all adapter faults: its
//! callers see structured results and typed errors, never raw provider
//! failures. Financial truth is persisted before and independent of
//! observability; publish and metrics failures are logged and swallowed.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod policy;
pub mod publisher;
pub mod repository;

pub use config::OrchestratorConfig;
pub use error::{Error, Result};
pub use orchestrator::{OrchestrationStatus, OrderData, PaymentOrchestrator};
pub use policy::{AllowAllPolicy, MerchantPolicy, StaticMerchantPolicy};
pub use publisher::{BroadcastPublisher, EventPublisher, GatewayEvent, NullPublisher};
pub use repository::{InMemoryRepository, OrderRepository, RepoCounts};
