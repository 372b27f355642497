//! Value objects shared across the storefront domain.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Monetary amount in integer minor units (kobo, cents).
///
/// The payment provider's contract is integer minor units, so money stays
/// integral end to end; display formatting is a client concern.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Money(i64);

impl Money {
    pub fn from_minor(amount: i64) -> Self {
        Self(amount)
    }

    pub fn zero() -> Self {
        Self(0)
    }

    pub fn minor(&self) -> i64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn add(&self, other: Money) -> Money {
        Money(self.0.saturating_add(other.0))
    }

    pub fn multiply(&self, qty: u32) -> Money {
        Money(self.0.saturating_mul(i64::from(qty)))
    }

    /// Percentage in basis points, rounded half-up. Used for VAT.
    pub fn percent_bps(&self, bps: i64) -> Money {
        Money((self.0 * bps + 5_000) / 10_000)
    }
}

impl Default for Money {
    fn default() -> Self {
        Self::zero()
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Payment/booking reference correlating a provider charge with a draft.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Reference(String);

impl Reference {
    pub fn new(value: impl Into<String>) -> Result<Self, ReferenceError> {
        let value = value.into().trim().to_string();
        if value.is_empty() {
            return Err(ReferenceError::Empty);
        }
        if value.len() > 64 {
            return Err(ReferenceError::TooLong);
        }
        if !value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ReferenceError::InvalidChar);
        }
        Ok(Self(value))
    }

    /// Generates a reference like `BS-9F2K71X0Q4`.
    pub fn generate(prefix: &str) -> Self {
        const ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTVWXYZ0123456789";
        let mut rng = rand::thread_rng();
        let tail: String = (0..10)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect();
        Self(format!("{prefix}-{tail}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Reference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ReferenceError {
    #[error("reference empty")]
    Empty,
    #[error("reference too long")]
    TooLong,
    #[error("reference contains invalid characters")]
    InvalidChar,
}

/// Stock quantity that cannot go below zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quantity(u32);

impl Quantity {
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u32 {
        self.0
    }

    pub fn add(&self, other: u32) -> Self {
        Self(self.0.saturating_add(other))
    }

    pub fn subtract(&self, other: u32) -> Option<Self> {
        if other > self.0 {
            None
        } else {
            Some(Self(self.0 - other))
        }
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_arithmetic() {
        let a = Money::from_minor(150_00);
        let b = Money::from_minor(50_00);
        assert_eq!(a.add(b).minor(), 200_00);
        assert_eq!(b.multiply(3).minor(), 150_00);
    }

    #[test]
    fn vat_rounds_half_up() {
        assert_eq!(Money::from_minor(1000).percent_bps(750).minor(), 75);
        assert_eq!(Money::from_minor(999).percent_bps(750).minor(), 75);
        assert_eq!(Money::from_minor(990).percent_bps(750).minor(), 74);
    }

    #[test]
    fn reference_validation() {
        assert!(Reference::new("BS-ABC123").is_ok());
        assert!(Reference::new("").is_err());
        assert!(Reference::new("has space").is_err());
        assert!(Reference::new("x".repeat(65)).is_err());
    }

    #[test]
    fn generated_reference_is_valid() {
        let r = Reference::generate("BS");
        assert!(Reference::new(r.as_str()).is_ok());
        assert!(r.as_str().starts_with("BS-"));
    }

    #[test]
    fn quantity_floor() {
        let q = Quantity::new(5);
        assert_eq!(q.subtract(5).unwrap().value(), 0);
        assert!(q.subtract(6).is_none());
    }
}
