//! Provider contract: widget configuration, webhook authentication, and
//! the verifier seam used by checkout convergence.

use beauty_store::config::PaymentConfig;
use beauty_store::payments::{PaymentError, PaymentVerifier, PaystackClient, VerifiedPayment};
use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha512;

fn config() -> PaymentConfig {
    PaymentConfig {
        public_key: "pk_test_abcdef".to_string(),
        secret_key: "sk_test_topsecret".to_string(),
        base_url: "https://api.example.test".to_string(),
        currency: "NGN".to_string(),
    }
}

fn sign(body: &[u8], secret: &str) -> String {
    let mut mac = Hmac::<Sha512>::new_from_slice(secret.as_bytes()).unwrap();
    mac.update(body);
    hex::encode(mac.finalize().into_bytes())
}

#[test]
fn widget_config_carries_draft_identity() {
    let client = PaystackClient::new(&config());
    let cfg = client.widget_config(
        "ada@example.com",
        35_900_00,
        "0190a1b2-order-id",
        serde_json::json!({"order_number": "BS-00000042"}),
    );
    let json = serde_json::to_value(&cfg).unwrap();
    // The provider's inline contract: `ref`, integer minor units.
    assert_eq!(json["ref"], "0190a1b2-order-id");
    assert_eq!(json["amount"], 35_900_00);
    assert_eq!(json["email"], "ada@example.com");
    assert_eq!(json["metadata"]["order_number"], "BS-00000042");
}

#[test]
fn webhook_round_trip_accepts_genuine_posts() {
    let client = PaystackClient::new(&config());
    let body = br#"{"event":"charge.success","data":{"reference":"o-1","amount":100,"currency":"NGN","status":"success"}}"#;
    let sig = sign(body, "sk_test_topsecret");
    assert!(client.verify_webhook_signature(body, &sig).is_ok());
}

#[test]
fn webhook_rejects_forged_and_replayed_variants() {
    let client = PaystackClient::new(&config());
    let body = br#"{"event":"charge.success","data":{"reference":"o-1","amount":100,"currency":"NGN","status":"success"}}"#;

    // Forged: signed with a guessed secret.
    let forged = sign(body, "sk_test_guess");
    assert!(client.verify_webhook_signature(body, &forged).is_err());

    // Tampered: amount inflated after signing.
    let genuine = sign(body, "sk_test_topsecret");
    let tampered = br#"{"event":"charge.success","data":{"reference":"o-1","amount":999999,"currency":"NGN","status":"success"}}"#;
    assert!(client.verify_webhook_signature(tampered, &genuine).is_err());

    // Garbage header.
    assert!(client.verify_webhook_signature(body, "zz-not-hex").is_err());
}

/// Stub provider standing in for the hosted widget's backend, proving the
/// verifier seam is usable as a trait object the way `AppState` holds it.
struct StubVerifier {
    settled: Option<VerifiedPayment>,
}

#[async_trait::async_trait]
impl PaymentVerifier for StubVerifier {
    async fn verify(&self, reference: &str) -> Result<VerifiedPayment, PaymentError> {
        match &self.settled {
            Some(p) if p.reference == reference => Ok(p.clone()),
            Some(_) | None => Err(PaymentError::UnknownReference {
                reference: reference.to_string(),
            }),
        }
    }
}

#[tokio::test]
async fn stub_verifier_resolves_known_reference() {
    let verifier: std::sync::Arc<dyn PaymentVerifier> = std::sync::Arc::new(StubVerifier {
        settled: Some(VerifiedPayment {
            reference: "order-1".into(),
            amount_minor: 35_900_00,
            currency: "NGN".into(),
            channel: Some("card".into()),
            paid_at: Utc::now(),
        }),
    });

    let payment = verifier.verify("order-1").await.unwrap();
    assert_eq!(payment.amount_minor, 35_900_00);

    let missing = verifier.verify("order-2").await;
    assert!(matches!(
        missing,
        Err(PaymentError::UnknownReference { .. })
    ));
}
