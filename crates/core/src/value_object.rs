//! Value objects: equality by value, not identity.

use serde::{Deserialize, Serialize};

use crate::error::{DomainError, DomainResult};

/// Marker trait for value objects.
///
/// Value objects have **no identity**; two instances with the same attribute
/// values are interchangeable. To "modify" one, build a new one.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}

/// A price in the smallest currency unit (e.g. cents).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub value: u64,
    /// ISO currency code (e.g. "EUR").
    pub currency: String,
}

impl ValueObject for Money {}

impl Money {
    pub fn new(value: u64, currency: impl Into<String>) -> DomainResult<Self> {
        let currency = currency.into();
        if currency.len() != 3 || !currency.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(DomainError::validation(format!(
                "currency must be a 3-letter ISO code, got {currency:?}"
            )));
        }
        Ok(Self { value, currency })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn money_requires_iso_currency() {
        assert!(Money::new(100, "EUR").is_ok());
        assert!(Money::new(100, "eur").is_err());
        assert!(Money::new(100, "EURO").is_err());
    }

    #[test]
    fn money_compares_by_value() {
        assert_eq!(Money::new(5, "USD").unwrap(), Money::new(5, "USD").unwrap());
        assert_ne!(Money::new(5, "USD").unwrap(), Money::new(5, "EUR").unwrap());
    }
}
