//! # PayRail PSP Adapters
//!
//! PSP connectivity layer with:
//! - A single connector trait every provider implements uniformly
//! - Stripe-, Adyen- and Checkout-style connectors
//! - Deterministic, tier-based PSP selection
//! - Health monitoring and Prometheus instrumentation
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │          PSP Registry (selection + health)          │
//! └────────────┬────────────────────────────────────────┘
//!              │
//!     ┌────────┼────────────────┐
//!     │        │                │
//! ┌───▼────┐ ┌─▼──────┐ ┌──────▼───┐
//! │ Stripe │ │ Adyen  │ │ Checkout │
//! │Adapter │ │Adapter │ │ Adapter  │
//! └───┬────┘ └─┬──────┘ └──────┬───┘
//!     │        │               │
//!     └────────┴───────┬───────┘
//!                      │
//!        neutral PaymentResult model
//! ```
//!
//! Connectors hold no mutable state beyond credentials and an HTTP client,
//! so a single instance is shared across concurrent requests.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod adyen;
pub mod checkout;
pub mod connector;
pub mod error;
pub mod metrics;
pub mod registry;
pub mod stripe;

pub use connector::PspConnector;
pub use error::{Error, Result};
pub use registry::{PspRegistry, PspStatus, RouteRequest, RoutingConstraints, RoutingPolicy};

/// Default request timeout (seconds)
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;

/// PSP identifier for the Stripe connector
pub const PSP_STRIPE: &str = "stripe";

/// PSP identifier for the Adyen connector
pub const PSP_ADYEN: &str = "adyen";

/// PSP identifier for the Checkout connector
pub const PSP_CHECKOUT: &str = "checkout";
