//! Payment provider integration.
//!
//! The hosted widget runs entirely on the client; the service's side of the
//! contract is (a) handing the client a widget configuration, (b) verifying
//! references against the provider before any state converges, and
//! (c) authenticating provider webhooks.

pub mod paystack;

pub use paystack::{PaystackClient, WidgetConfig};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A charge the provider has confirmed as settled.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VerifiedPayment {
    pub reference: String,
    pub amount_minor: i64,
    pub currency: String,
    pub channel: Option<String>,
    pub paid_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("provider has no transaction for reference {reference}")]
    UnknownReference { reference: String },

    #[error("charge not successful (provider status: {status})")]
    Declined { status: String },

    #[error("provider request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("provider response malformed: {0}")]
    Malformed(String),

    #[error("webhook signature invalid")]
    InvalidSignature,
}

/// Seam between checkout and the concrete provider, so the convergence
/// logic is testable with a stub verifier.
#[async_trait::async_trait]
pub trait PaymentVerifier: Send + Sync {
    /// Resolves a reference to a settled charge, or a typed failure.
    async fn verify(&self, reference: &str) -> Result<VerifiedPayment, PaymentError>;
}
