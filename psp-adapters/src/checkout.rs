//! Checkout-style connector.
//!
//! Unlike Stripe and Adyen this provider has no separate confirmation step,
//! so `confirm_payment` is a no-op returning the current status.

use crate::{connector::PspConnector, Error, Result, PSP_CHECKOUT};
use async_trait::async_trait;
use payment_core::{currency, PaymentRequest, PaymentResult, PaymentStatus};
use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::info;

/// Checkout connector configuration
#[derive(Debug, Clone)]
pub struct CheckoutConfig {
    /// API base URL
    pub api_base: String,
    /// Secret key
    pub secret_key: String,
    /// Request timeout
    pub timeout_seconds: u64,
}

/// Checkout connector
pub struct CheckoutConnector {
    config: CheckoutConfig,
    client: Client,
}

impl CheckoutConnector {
    /// Create new Checkout connector
    pub fn new(config: CheckoutConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::Connection(e.to_string()))?;

        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base.trim_end_matches('/'), path)
    }

    /// Map Checkout payment statuses to the neutral model. Total; unknown → Pending.
    pub fn map_status(raw: &str) -> PaymentStatus {
        match raw {
            "Authorized" | "Captured" | "Paid" => PaymentStatus::Succeeded,
            "Declined" | "Expired" => PaymentStatus::Failed,
            "Canceled" | "Voided" => PaymentStatus::Cancelled,
            "Pending" | "Card Verified" => PaymentStatus::Pending,
            _ => PaymentStatus::Pending,
        }
    }

    fn result_from_payload(payload: Value) -> Result<PaymentResult> {
        let status_raw = payload
            .get("status")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::MalformedResponse("payment missing status".to_string()))?;
        let status = Self::map_status(status_raw);

        Ok(PaymentResult {
            success: status == PaymentStatus::Succeeded,
            transaction_id: payload.get("id").and_then(Value::as_str).map(str::to_string),
            status,
            fee: Decimal::ZERO,
            error: payload
                .get("response_summary")
                .and_then(Value::as_str)
                .filter(|s| status == PaymentStatus::Failed && !s.is_empty())
                .map(str::to_string),
            raw: Some(payload),
        })
    }
}

#[async_trait]
impl PspConnector for CheckoutConnector {
    fn psp_id(&self) -> &str {
        PSP_CHECKOUT
    }

    fn name(&self) -> &str {
        "Checkout"
    }

    async fn create_payment_intent(&self, request: &PaymentRequest) -> Result<PaymentResult> {
        info!(
            order_id = %request.order_id,
            amount = %request.amount,
            currency = %request.currency,
            "Submitting Checkout payment"
        );

        let minor = currency::to_minor_units(request.amount, &request.currency)?;
        let body = json!({
            "amount": minor,
            "currency": request.currency,
            "reference": request.order_id.to_string(),
            "customer": { "email": request.customer_email },
            "metadata": request.metadata,
        });

        let response = self
            .client
            .post(self.url("/payments"))
            .bearer_auth(&self.config.secret_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout {
                        seconds: self.config.timeout_seconds,
                        operation: "create_payment_intent".to_string(),
                    }
                } else {
                    Error::Connection(e.to_string())
                }
            })?;
        let status = response.status();

        if status.is_success() {
            let payload: Value = response
                .json()
                .await
                .map_err(|e| Error::MalformedResponse(e.to_string()))?;
            Self::result_from_payload(payload)
        } else if status.is_client_error() {
            let payload: Value = response.json().await.unwrap_or(Value::Null);
            let message = payload
                .get("response_summary")
                .and_then(Value::as_str)
                .unwrap_or("payment declined by provider")
                .to_string();
            Ok(PaymentResult::failure(PaymentStatus::Failed, message))
        } else {
            Err(Error::ProviderApi {
                status_code: status.as_u16(),
                message: response.text().await.unwrap_or_else(|_| "unknown error".to_string()),
            })
        }
    }

    async fn confirm_payment(
        &self,
        transaction_id: &str,
        _payment_method_id: &str,
    ) -> Result<PaymentStatus> {
        // No confirmation step on this provider
        self.get_status(transaction_id).await
    }

    async fn get_status(&self, transaction_id: &str) -> Result<PaymentStatus> {
        let response = self
            .client
            .get(self.url(&format!("/payments/{transaction_id}")))
            .bearer_auth(&self.config.secret_key)
            .send()
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::ProviderApi {
                status_code: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| Error::MalformedResponse(e.to_string()))?;
        let raw = payload
            .get("status")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::MalformedResponse("payment missing status".to_string()))?;
        Ok(Self::map_status(raw))
    }

    async fn refund(
        &self,
        transaction_id: &str,
        amount: Option<Decimal>,
        currency_code: &str,
        reason: Option<&str>,
    ) -> Result<String> {
        let mut body = json!({});
        if let Some(amount) = amount {
            body["amount"] = json!(currency::to_minor_units(amount, currency_code)?);
        }
        if let Some(reason) = reason {
            body["reference"] = json!(reason);
        }

        let response = self
            .client
            .post(self.url(&format!("/payments/{transaction_id}/refunds")))
            .bearer_auth(&self.config.secret_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;
        let status = response.status();

        if status.is_success() {
            let payload: Value = response
                .json()
                .await
                .map_err(|e| Error::MalformedResponse(e.to_string()))?;
            payload
                .get("action_id")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| Error::MalformedResponse("refund missing action_id".to_string()))
        } else if status.is_client_error() {
            let payload: Value = response.json().await.unwrap_or(Value::Null);
            let message = payload
                .get("response_summary")
                .and_then(Value::as_str)
                .unwrap_or("refund rejected")
                .to_string();
            Err(Error::RefundRejected(message))
        } else {
            Err(Error::ProviderApi {
                status_code: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            })
        }
    }

    async fn test_connection(&self) -> Result<()> {
        let response = self
            .client
            .get(self.url("/event-types"))
            .bearer_auth(&self.config.secret_key)
            .send()
            .await
            .map_err(|e| Error::Connection(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(Error::ProviderApi {
                status_code: response.status().as_u16(),
                message: "credential check failed".to_string(),
            })
        }
    }
}
