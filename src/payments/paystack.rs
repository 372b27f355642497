//! Paystack client: hosted-widget configuration, transaction verification,
//! and webhook signature checks.

use super::{PaymentError, PaymentVerifier, VerifiedPayment};
use crate::config::PaymentConfig;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha512;

type HmacSha512 = Hmac<Sha512>;

/// Configuration object the storefront client feeds to the hosted popup.
/// Field names follow the provider's inline-js contract verbatim.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WidgetConfig {
    pub key: String,
    pub email: String,
    /// Integer minor units (kobo).
    pub amount: i64,
    #[serde(rename = "ref")]
    pub reference: String,
    pub currency: String,
    pub metadata: serde_json::Value,
}

#[derive(Clone)]
pub struct PaystackClient {
    http: reqwest::Client,
    base_url: String,
    secret_key: String,
    public_key: String,
    currency: String,
}

impl PaystackClient {
    pub fn new(config: &PaymentConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            secret_key: config.secret_key.clone(),
            public_key: config.public_key.clone(),
            currency: config.currency.clone(),
        }
    }

    pub fn currency(&self) -> &str {
        &self.currency
    }

    /// Builds the popup configuration for a draft order. The reference is
    /// the draft order id, so the provider's records correlate one-to-one
    /// with ours.
    pub fn widget_config(
        &self,
        email: &str,
        amount_minor: i64,
        reference: &str,
        metadata: serde_json::Value,
    ) -> WidgetConfig {
        WidgetConfig {
            key: self.public_key.clone(),
            email: email.to_string(),
            amount: amount_minor,
            reference: reference.to_string(),
            currency: self.currency.clone(),
            metadata,
        }
    }

    /// Checks the `x-paystack-signature` header: HMAC-SHA512 of the raw
    /// body under the secret key, hex-encoded.
    pub fn verify_webhook_signature(
        &self,
        body: &[u8],
        signature_header: &str,
    ) -> Result<(), PaymentError> {
        let expected = hex::decode(signature_header.trim())
            .map_err(|_| PaymentError::InvalidSignature)?;
        let mut mac = HmacSha512::new_from_slice(self.secret_key.as_bytes())
            .expect("HMAC accepts any key length");
        mac.update(body);
        mac.verify_slice(&expected)
            .map_err(|_| PaymentError::InvalidSignature)
    }
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    status: bool,
    message: Option<String>,
    data: Option<VerifyData>,
}

#[derive(Debug, Deserialize)]
struct VerifyData {
    status: String,
    reference: String,
    amount: i64,
    currency: String,
    channel: Option<String>,
    paid_at: Option<DateTime<Utc>>,
}

#[async_trait::async_trait]
impl PaymentVerifier for PaystackClient {
    #[tracing::instrument(skip(self))]
    async fn verify(&self, reference: &str) -> Result<VerifiedPayment, PaymentError> {
        let url = format!("{}/transaction/verify/{}", self.base_url, reference);
        let response = self
            .http
            .get(&url)
            .bearer_auth(&self.secret_key)
            .send()
            .await?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(PaymentError::UnknownReference {
                reference: reference.to_string(),
            });
        }
        let body: VerifyResponse = response.error_for_status()?.json().await?;
        if !body.status {
            return Err(PaymentError::Malformed(
                body.message.unwrap_or_else(|| "status false".to_string()),
            ));
        }
        let data = body
            .data
            .ok_or_else(|| PaymentError::Malformed("missing data".to_string()))?;
        if data.status != "success" {
            return Err(PaymentError::Declined {
                status: data.status,
            });
        }
        Ok(VerifiedPayment {
            reference: data.reference,
            amount_minor: data.amount,
            currency: data.currency,
            channel: data.channel,
            paid_at: data.paid_at.unwrap_or_else(Utc::now),
        })
    }
}

/// Webhook envelope the provider posts. Only `charge.success` matters to
/// the checkout workflow; other events are acknowledged and dropped.
#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    pub event: String,
    pub data: WebhookCharge,
}

#[derive(Debug, Deserialize)]
pub struct WebhookCharge {
    pub reference: String,
    pub amount: i64,
    pub currency: String,
    pub channel: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client() -> PaystackClient {
        PaystackClient::new(&PaymentConfig {
            public_key: "pk_test_xxx".to_string(),
            secret_key: "sk_test_secret123".to_string(),
            base_url: "https://api.example.test".to_string(),
            currency: "NGN".to_string(),
        })
    }

    fn sign(body: &[u8], secret: &str) -> String {
        let mut mac = HmacSha512::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn valid_signature_accepted() {
        let client = test_client();
        let body = br#"{"event":"charge.success"}"#;
        let sig = sign(body, "sk_test_secret123");
        assert!(client.verify_webhook_signature(body, &sig).is_ok());
    }

    #[test]
    fn wrong_secret_rejected() {
        let client = test_client();
        let body = br#"{"event":"charge.success"}"#;
        let sig = sign(body, "sk_other_secret");
        assert!(client.verify_webhook_signature(body, &sig).is_err());
    }

    #[test]
    fn modified_payload_rejected() {
        let client = test_client();
        let sig = sign(br#"{"event":"charge.success"}"#, "sk_test_secret123");
        let tampered = br#"{"event":"charge.success","extra":true}"#;
        assert!(client.verify_webhook_signature(tampered, &sig).is_err());
    }

    #[test]
    fn garbage_header_rejected() {
        let client = test_client();
        assert!(client
            .verify_webhook_signature(b"{}", "not-even-hex!")
            .is_err());
    }

    #[test]
    fn widget_config_uses_provider_field_names() {
        let client = test_client();
        let cfg = client.widget_config(
            "ada@example.com",
            15_000_00,
            "ORDER-123",
            serde_json::json!({"order_id": "ORDER-123"}),
        );
        let json = serde_json::to_value(&cfg).unwrap();
        assert_eq!(json["key"], "pk_test_xxx");
        assert_eq!(json["amount"], 15_000_00);
        assert_eq!(json["ref"], "ORDER-123");
        assert_eq!(json["currency"], "NGN");
    }

    #[test]
    fn verify_response_parses_provider_shape() {
        let raw = r#"{
            "status": true,
            "message": "Verification successful",
            "data": {
                "status": "success",
                "reference": "ORDER-123",
                "amount": 1500000,
                "currency": "NGN",
                "channel": "card",
                "paid_at": "2026-08-01T10:15:00Z"
            }
        }"#;
        let parsed: VerifyResponse = serde_json::from_str(raw).unwrap();
        let data = parsed.data.unwrap();
        assert_eq!(data.amount, 1_500_000);
        assert_eq!(data.status, "success");
    }
}
