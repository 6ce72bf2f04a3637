//! Error types for core domain operations

use thiserror::Error;

/// Result type for core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core domain errors
#[derive(Error, Debug)]
pub enum Error {
    /// Request failed validation before any PSP contact
    #[error("Invalid request: {0}")]
    Validation(String),

    /// Currency code not in the supported ISO 4217 table
    #[error("Unrecognized currency code: {0}")]
    UnknownCurrency(String),

    /// Amount cannot be represented in the currency's minor units
    #[error("Amount {amount} not representable in minor units of {currency}")]
    MinorUnitConversion {
        /// Requested amount (major units)
        amount: String,
        /// Currency code
        currency: String,
    },

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
