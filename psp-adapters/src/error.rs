//! Error types for PSP adapters

use thiserror::Error;

/// Result type for adapter operations
pub type Result<T> = std::result::Result<T, Error>;

/// Adapter errors.
///
/// Provider-side business failures (declined card, invalid credentials) are
/// NOT errors: connectors report them as `PaymentResult { success: false }`.
/// This enum covers transport faults, routing failures and misuse.
#[derive(Error, Debug)]
pub enum Error {
    /// Connection error
    #[error("Connection error: {0}")]
    Connection(String),

    /// Timeout
    #[error("Timeout after {seconds}s: {operation}")]
    Timeout {
        /// Timeout duration
        seconds: u64,
        /// Operation
        operation: String,
    },

    /// Provider API fault (5xx or malformed response)
    #[error("Provider API error {status_code}: {message}")]
    ProviderApi {
        /// HTTP status code
        status_code: u16,
        /// Error message
        message: String,
    },

    /// Response body did not match the provider's schema
    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),

    /// Provider rejected a refund (amount exceeds charge, already refunded)
    #[error("Refund rejected by provider: {0}")]
    RefundRejected(String),

    /// No configured PSP with this identifier
    #[error("Unknown PSP: {0}")]
    UnknownPsp(String),

    /// PSP exists but is disabled (or excluded for this merchant)
    #[error("PSP {psp} is not available: {reason}")]
    PspDisabled {
        /// PSP identifier
        psp: String,
        /// Reason
        reason: String,
    },

    /// No adapter satisfies the routing constraints
    #[error("No eligible PSP for {amount} {currency}")]
    NoEligiblePsp {
        /// Requested amount
        amount: String,
        /// Requested currency
        currency: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP client error
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Core domain error
    #[error(transparent)]
    Core(#[from] payment_core::Error),
}

impl Error {
    /// Whether this error is a transport-level fault, eligible for retry.
    ///
    /// Routing failures and misuse hit the same outcome on every attempt and
    /// are not retryable.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Connection(_)
                | Error::Timeout { .. }
                | Error::ProviderApi { .. }
                | Error::MalformedResponse(_)
                | Error::Http(_)
        )
    }
}
