//! Adyen-style connector (result-code API shape)

use crate::{connector::PspConnector, Error, Result, PSP_ADYEN};
use async_trait::async_trait;
use payment_core::{currency, PaymentRequest, PaymentResult, PaymentStatus};
use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::info;

/// Adyen connector configuration
#[derive(Debug, Clone)]
pub struct AdyenConfig {
    /// API base URL
    pub api_base: String,
    /// API key
    pub api_key: String,
    /// Merchant account identifier
    pub merchant_account: String,
    /// Request timeout
    pub timeout_seconds: u64,
}

/// Adyen connector
pub struct AdyenConnector {
    config: AdyenConfig,
    client: Client,
}

impl AdyenConnector {
    /// Create new Adyen connector
    pub fn new(config: AdyenConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::Connection(e.to_string()))?;

        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base.trim_end_matches('/'), path)
    }

    /// Map Adyen result codes to the neutral model. Total; unknown → Pending.
    pub fn map_status(raw: &str) -> PaymentStatus {
        match raw {
            "Authorised" | "AuthorisedPending" => PaymentStatus::Succeeded,
            "Refused" | "Error" => PaymentStatus::Failed,
            "Cancelled" => PaymentStatus::Cancelled,
            "RedirectShopper" | "IdentifyShopper" | "ChallengeShopper" | "PresentToShopper" => {
                PaymentStatus::RequiresAction
            }
            "Pending" | "Received" => PaymentStatus::Pending,
            _ => PaymentStatus::Pending,
        }
    }

    async fn post(&self, path: &str, body: Value, operation: &str) -> Result<reqwest::Response> {
        self.client
            .post(self.url(path))
            .header("X-API-Key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::Timeout {
                        seconds: self.config.timeout_seconds,
                        operation: operation.to_string(),
                    }
                } else {
                    Error::Connection(e.to_string())
                }
            })
    }

    fn result_from_payload(payload: Value) -> Result<PaymentResult> {
        let result_code = payload
            .get("resultCode")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::MalformedResponse("payment missing resultCode".to_string()))?;
        let status = Self::map_status(result_code);

        let fee = payload
            .get("fee")
            .and_then(|f| {
                let value = f.get("value").and_then(Value::as_i64)?;
                let code = f.get("currency").and_then(Value::as_str)?;
                currency::from_minor_units(value, code).ok()
            })
            .unwrap_or(Decimal::ZERO);

        Ok(PaymentResult {
            success: status == PaymentStatus::Succeeded,
            transaction_id: payload
                .get("pspReference")
                .and_then(Value::as_str)
                .map(str::to_string),
            status,
            fee,
            error: payload
                .get("refusalReason")
                .and_then(Value::as_str)
                .map(str::to_string),
            raw: Some(payload),
        })
    }
}

#[async_trait]
impl PspConnector for AdyenConnector {
    fn psp_id(&self) -> &str {
        PSP_ADYEN
    }

    fn name(&self) -> &str {
        "Adyen"
    }

    async fn create_payment_intent(&self, request: &PaymentRequest) -> Result<PaymentResult> {
        info!(
            order_id = %request.order_id,
            amount = %request.amount,
            currency = %request.currency,
            "Submitting Adyen payment"
        );

        let minor = currency::to_minor_units(request.amount, &request.currency)?;
        let body = json!({
            "amount": { "value": minor, "currency": request.currency },
            "reference": request.order_id.to_string(),
            "merchantAccount": self.config.merchant_account,
            "shopperEmail": request.customer_email,
            "paymentMethod": { "type": request.payment_method.as_deref().unwrap_or("scheme") },
            "metadata": request.metadata,
        });

        let response = self.post("/v71/payments", body, "create_payment_intent").await?;
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
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("payment refused by provider")
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
        payment_method_id: &str,
    ) -> Result<PaymentStatus> {
        let body = json!({
            "paymentData": transaction_id,
            "details": { "paymentMethod": payment_method_id },
        });
        let response = self.post("/v71/payments/details", body, "confirm_payment").await?;
        let status = response.status();

        if status.is_success() {
            let payload: Value = response
                .json()
                .await
                .map_err(|e| Error::MalformedResponse(e.to_string()))?;
            let raw = payload
                .get("resultCode")
                .and_then(Value::as_str)
                .ok_or_else(|| Error::MalformedResponse("details missing resultCode".to_string()))?;
            Ok(Self::map_status(raw))
        } else if status.is_client_error() {
            Ok(PaymentStatus::Failed)
        } else {
            Err(Error::ProviderApi {
                status_code: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            })
        }
    }

    async fn get_status(&self, transaction_id: &str) -> Result<PaymentStatus> {
        let response = self
            .client
            .get(self.url(&format!("/v71/payments/{transaction_id}")))
            .header("X-API-Key", &self.config.api_key)
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
            .get("resultCode")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::MalformedResponse("payment missing resultCode".to_string()))?;
        Ok(Self::map_status(raw))
    }

    async fn refund(
        &self,
        transaction_id: &str,
        amount: Option<Decimal>,
        currency_code: &str,
        reason: Option<&str>,
    ) -> Result<String> {
        let mut body = json!({ "merchantAccount": self.config.merchant_account });
        if let Some(amount) = amount {
            body["amount"] = json!({
                "value": currency::to_minor_units(amount, currency_code)?,
                "currency": currency_code,
            });
        }
        if let Some(reason) = reason {
            body["merchantRefundReason"] = json!(reason);
        }

        let path = format!("/v71/payments/{transaction_id}/refunds");
        let response = self.post(&path, body, "refund").await?;
        let status = response.status();

        if status.is_success() {
            let payload: Value = response
                .json()
                .await
                .map_err(|e| Error::MalformedResponse(e.to_string()))?;
            payload
                .get("pspReference")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| Error::MalformedResponse("refund missing pspReference".to_string()))
        } else if status.is_client_error() {
            let payload: Value = response.json().await.unwrap_or(Value::Null);
            let message = payload
                .get("message")
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
            .get(self.url("/v71/me"))
            .header("X-API-Key", &self.config.api_key)
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_code_mapping_totality() {
        assert_eq!(AdyenConnector::map_status("Authorised"), PaymentStatus::Succeeded);
        assert_eq!(AdyenConnector::map_status("Refused"), PaymentStatus::Failed);
        assert_eq!(AdyenConnector::map_status("ChallengeShopper"), PaymentStatus::RequiresAction);
        assert_eq!(AdyenConnector::map_status("Received"), PaymentStatus::Pending);
        assert_eq!(AdyenConnector::map_status("SomethingNew"), PaymentStatus::Pending);
    }

    #[test]
    fn test_refusal_reason_surfaced() {
        let payload = serde_json::json!({
            "resultCode": "Refused",
            "pspReference": "883-refused",
            "refusalReason": "Not enough balance",
        });
        let result = AdyenConnector::result_from_payload(payload).unwrap();
        assert!(!result.success);
        assert_eq!(result.status, PaymentStatus::Failed);
        assert_eq!(result.error.as_deref(), Some("Not enough balance"));
        assert_eq!(result.transaction_id.as_deref(), Some("883-refused"));
    }
}
