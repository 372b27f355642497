//! Environment-driven configuration.

use anyhow::{Context, Result};
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub nats_url: Option<String>,
    pub payment: PaymentConfig,
    pub pricing: PricingConfig,
    /// How long a receipt token resolves after checkout completes.
    pub receipt_ttl: Duration,
    /// Age at which a pending draft becomes eligible for expiry.
    pub draft_ttl: Duration,
    pub sweep_interval: Duration,
}

#[derive(Clone, Debug)]
pub struct PaymentConfig {
    pub public_key: String,
    pub secret_key: String,
    /// Provider API base, overridable so tests and staging point elsewhere.
    pub base_url: String,
    pub currency: String,
}

#[derive(Clone, Debug)]
pub struct PricingConfig {
    /// Flat shipping fee in minor units.
    pub shipping_fee_minor: i64,
    /// Subtotal at or above which shipping is free.
    pub free_shipping_threshold_minor: i64,
    /// VAT rate in basis points (750 = 7.5%).
    pub tax_rate_bps: i64,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let database_url =
            std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let port = env_parse("PORT", 8083u16)?;
        let nats_url = std::env::var("NATS_URL").ok();
        let payment = PaymentConfig {
            public_key: std::env::var("PAYMENT_PUBLIC_KEY")
                .context("PAYMENT_PUBLIC_KEY must be set")?,
            secret_key: std::env::var("PAYMENT_SECRET_KEY")
                .context("PAYMENT_SECRET_KEY must be set")?,
            base_url: std::env::var("PAYMENT_BASE_URL")
                .unwrap_or_else(|_| "https://api.paystack.co".to_string()),
            currency: std::env::var("CURRENCY").unwrap_or_else(|_| "NGN".to_string()),
        };
        let pricing = PricingConfig {
            shipping_fee_minor: env_parse("SHIPPING_FEE_MINOR", 1_500_00i64)?,
            free_shipping_threshold_minor: env_parse(
                "FREE_SHIPPING_THRESHOLD_MINOR",
                50_000_00i64,
            )?,
            tax_rate_bps: env_parse("TAX_RATE_BPS", 750i64)?,
        };
        Ok(Self {
            database_url,
            port,
            nats_url,
            payment,
            pricing,
            receipt_ttl: Duration::from_secs(env_parse("RECEIPT_TTL_SECS", 300u64)?),
            draft_ttl: Duration::from_secs(env_parse("DRAFT_TTL_SECS", 1_800u64)?),
            sweep_interval: Duration::from_secs(env_parse("SWEEP_INTERVAL_SECS", 60u64)?),
        })
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(v) => v.parse::<T>().with_context(|| format!("invalid {key}")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_parse_falls_back_to_default() {
        assert_eq!(env_parse("BEAUTY_STORE_UNSET_KEY", 42u64).unwrap(), 42);
    }
}
