//! Shared application state.

use crate::config::AppConfig;
use crate::payments::{PaymentVerifier, PaystackClient};
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub nats: Option<async_nats::Client>,
    pub config: AppConfig,
    pub paystack: PaystackClient,
    /// Dyn seam so tests converge orders against a stub provider.
    pub verifier: Arc<dyn PaymentVerifier>,
}

impl AppState {
    pub fn new(db: PgPool, nats: Option<async_nats::Client>, config: AppConfig) -> Self {
        let paystack = PaystackClient::new(&config.payment);
        let verifier: Arc<dyn PaymentVerifier> = Arc::new(paystack.clone());
        Self {
            db,
            nats,
            config,
            paystack,
            verifier,
        }
    }
}
