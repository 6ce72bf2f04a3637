//! # PayRail Core
//!
//! Shared domain types for the payment gateway:
//! - Neutral payment status model (every PSP maps into it)
//! - Order / Payment lifecycle records
//! - Provider-neutral request/result types
//! - ISO 4217 currency table and minor-unit conversion

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

pub mod currency;
pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::*;

/// Hard cap on retry submissions per order (original submission not counted)
pub const MAX_PAYMENT_RETRIES: u32 = 3;

/// Default rolling metrics window (seconds)
pub const DEFAULT_METRICS_WINDOW_SECONDS: u64 = 3600;
