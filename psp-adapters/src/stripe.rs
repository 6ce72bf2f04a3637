//! Stripe-style connector (payment-intent API shape)

use crate::{connector::PspConnector, Error, Result, PSP_STRIPE};
use async_trait::async_trait;
use payment_core::{currency, PaymentRequest, PaymentResult, PaymentStatus};
use reqwest::Client;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::info;

/// Stripe connector configuration
#[derive(Debug, Clone)]
pub struct StripeConfig {
    /// API base URL
    pub api_base: String,
    /// Secret API key
    pub api_key: String,
    /// Request timeout
    pub timeout_seconds: u64,
}

/// Stripe connector
pub struct StripeConnector {
    config: StripeConfig,
    client: Client,
}

impl StripeConnector {
    /// Create new Stripe connector
    pub fn new(config: StripeConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .map_err(|e| Error::Connection(e.to_string()))?;

        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base.trim_end_matches('/'), path)
    }

    async fn post(&self, path: &str, body: Value, operation: &str) -> Result<reqwest::Response> {
        self.client
            .post(self.url(path))
            .bearer_auth(&self.config.api_key)
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

    /// Map Stripe's payment-intent status vocabulary to the neutral model.
    ///
    /// Total: anything unrecognized is `Pending`, never `Succeeded`.
    pub fn map_status(raw: &str) -> PaymentStatus {
        match raw {
            "succeeded" => PaymentStatus::Succeeded,
            "processing" | "requires_capture" => PaymentStatus::Pending,
            "requires_action" | "requires_confirmation" | "requires_payment_method" => {
                PaymentStatus::RequiresAction
            }
            "canceled" => PaymentStatus::Cancelled,
            "payment_failed" => PaymentStatus::Failed,
            _ => PaymentStatus::Pending,
        }
    }

    fn result_from_intent(payload: Value) -> Result<PaymentResult> {
        let status_raw = payload
            .get("status")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::MalformedResponse("intent missing status".to_string()))?;
        let status = Self::map_status(status_raw);

        let transaction_id = payload
            .get("id")
            .and_then(Value::as_str)
            .map(str::to_string);
        if transaction_id.is_none() {
            return Err(Error::MalformedResponse("intent missing id".to_string()));
        }

        let currency_code = payload
            .get("currency")
            .and_then(Value::as_str)
            .map(str::to_uppercase);
        let fee = match (payload.get("fee").and_then(Value::as_i64), currency_code) {
            (Some(minor), Some(code)) => {
                currency::from_minor_units(minor, &code).unwrap_or(Decimal::ZERO)
            }
            _ => Decimal::ZERO,
        };

        Ok(PaymentResult {
            success: status == PaymentStatus::Succeeded,
            transaction_id,
            status,
            fee,
            error: payload
                .get("last_payment_error")
                .and_then(|e| e.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string),
            raw: Some(payload),
        })
    }

    /// Extract the provider error message from a 4xx body
    fn decline_message(payload: &Value) -> String {
        payload
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(Value::as_str)
            .unwrap_or("payment declined by provider")
            .to_string()
    }
}

#[async_trait]
impl PspConnector for StripeConnector {
    fn psp_id(&self) -> &str {
        PSP_STRIPE
    }

    fn name(&self) -> &str {
        "Stripe"
    }

    async fn create_payment_intent(&self, request: &PaymentRequest) -> Result<PaymentResult> {
        info!(
            order_id = %request.order_id,
            amount = %request.amount,
            currency = %request.currency,
            "Creating Stripe payment intent"
        );

        let minor = currency::to_minor_units(request.amount, &request.currency)?;
        let body = json!({
            "amount": minor,
            "currency": request.currency.to_lowercase(),
            "receipt_email": request.customer_email,
            "payment_method_types": [request.payment_method.as_deref().unwrap_or("card")],
            "metadata": request.metadata,
        });

        let response = self.post("/v1/payment_intents", body, "create_payment_intent").await?;
        let status = response.status();

        if status.is_success() {
            let payload: Value = response
                .json()
                .await
                .map_err(|e| Error::MalformedResponse(e.to_string()))?;
            Self::result_from_intent(payload)
        } else if status.is_client_error() {
            // Business failure (declined card, bad key): data, not an error
            let payload: Value = response.json().await.unwrap_or(Value::Null);
            Ok(PaymentResult::failure(
                PaymentStatus::Failed,
                Self::decline_message(&payload),
            ))
        } else {
            let message = response.text().await.unwrap_or_else(|_| "unknown error".to_string());
            Err(Error::ProviderApi {
                status_code: status.as_u16(),
                message,
            })
        }
    }

    async fn confirm_payment(
        &self,
        transaction_id: &str,
        payment_method_id: &str,
    ) -> Result<PaymentStatus> {
        let body = json!({ "payment_method": payment_method_id });
        let path = format!("/v1/payment_intents/{transaction_id}/confirm");
        let response = self.post(&path, body, "confirm_payment").await?;
        let status = response.status();

        if status.is_success() {
            let payload: Value = response
                .json()
                .await
                .map_err(|e| Error::MalformedResponse(e.to_string()))?;
            let raw = payload
                .get("status")
                .and_then(Value::as_str)
                .ok_or_else(|| Error::MalformedResponse("confirm missing status".to_string()))?;
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
            .get(self.url(&format!("/v1/payment_intents/{transaction_id}")))
            .bearer_auth(&self.config.api_key)
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
            .ok_or_else(|| Error::MalformedResponse("intent missing status".to_string()))?;
        Ok(Self::map_status(raw))
    }

    async fn refund(
        &self,
        transaction_id: &str,
        amount: Option<Decimal>,
        currency_code: &str,
        reason: Option<&str>,
    ) -> Result<String> {
        let mut body = json!({ "payment_intent": transaction_id });
        if let Some(amount) = amount {
            body["amount"] = json!(currency::to_minor_units(amount, currency_code)?);
        }
        if let Some(reason) = reason {
            body["reason"] = json!(reason);
        }

        let response = self.post("/v1/refunds", body, "refund").await?;
        let status = response.status();

        if status.is_success() {
            let payload: Value = response
                .json()
                .await
                .map_err(|e| Error::MalformedResponse(e.to_string()))?;
            payload
                .get("id")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| Error::MalformedResponse("refund missing id".to_string()))
        } else if status.is_client_error() {
            let payload: Value = response.json().await.unwrap_or(Value::Null);
            Err(Error::RefundRejected(Self::decline_message(&payload)))
        } else {
            Err(Error::ProviderApi {
                status_code: status.as_u16(),
                message: response.text().await.unwrap_or_default(),
            })
        }
    }

    async fn test_connection(&self) -> Result<()> {
        // Read-only balance probe; no financial side effects
        let response = self
            .client
            .get(self.url("/v1/balance"))
            .bearer_auth(&self.config.api_key)
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
    use payment_core::PaymentRequest;
    use rust_decimal_macros::dec;
    use uuid::Uuid;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request(amount: Decimal, currency: &str) -> PaymentRequest {
        PaymentRequest {
            amount,
            currency: currency.to_string(),
            customer_email: "buyer@example.com".to_string(),
            payment_method: Some("card".to_string()),
            order_id: Uuid::new_v4(),
            metadata: Default::default(),
        }
    }

    fn connector(base: &str) -> StripeConnector {
        StripeConnector::new(StripeConfig {
            api_base: base.to_string(),
            api_key: "sk_test_123".to_string(),
            timeout_seconds: 5,
        })
        .unwrap()
    }

    #[test]
    fn test_status_mapping_totality() {
        assert_eq!(StripeConnector::map_status("succeeded"), PaymentStatus::Succeeded);
        assert_eq!(StripeConnector::map_status("canceled"), PaymentStatus::Cancelled);
        assert_eq!(StripeConnector::map_status("requires_action"), PaymentStatus::RequiresAction);
        // Unknown vocabulary never promotes to Succeeded
        assert_eq!(StripeConnector::map_status("definitely_not_a_status"), PaymentStatus::Pending);
        assert_eq!(StripeConnector::map_status(""), PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn test_create_payment_intent_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/payment_intents"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "pi_123",
                "status": "succeeded",
                "currency": "usd",
                "fee": 117,
            })))
            .mount(&server)
            .await;

        let result = connector(&server.uri())
            .create_payment_intent(&request(dec!(29.99), "USD"))
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.transaction_id.as_deref(), Some("pi_123"));
        assert_eq!(result.status, PaymentStatus::Succeeded);
        assert_eq!(result.fee, dec!(1.17));
    }

    #[tokio::test]
    async fn test_decline_is_data_not_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/payment_intents"))
            .respond_with(ResponseTemplate::new(402).set_body_json(serde_json::json!({
                "error": { "message": "Your card was declined." }
            })))
            .mount(&server)
            .await;

        let result = connector(&server.uri())
            .create_payment_intent(&request(dec!(10.00), "USD"))
            .await
            .unwrap();

        assert!(!result.success);
        assert_eq!(result.status, PaymentStatus::Failed);
        assert_eq!(result.error.as_deref(), Some("Your card was declined."));
    }

    #[tokio::test]
    async fn test_server_fault_is_transport_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/payment_intents"))
            .respond_with(ResponseTemplate::new(503).set_body_string("upstream down"))
            .mount(&server)
            .await;

        let err = connector(&server.uri())
            .create_payment_intent(&request(dec!(10.00), "USD"))
            .await
            .unwrap_err();

        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_refund_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/refunds"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "error": { "message": "Refund amount exceeds charge." }
            })))
            .mount(&server)
            .await;

        let err = connector(&server.uri())
            .refund("pi_123", Some(dec!(60.00)), "USD", None)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::RefundRejected(_)));
        assert!(!err.is_transport());
    }
}
