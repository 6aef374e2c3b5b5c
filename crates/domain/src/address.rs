//! Postal addresses, shared by orders and user profiles.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from address validation.
#[derive(Debug, Error)]
pub enum AddressError {
    /// A required address field was empty.
    #[error("Address field is required: {field}")]
    MissingField { field: &'static str },

    /// Country code was not a two-letter ISO code.
    #[error("Invalid country code: {0} (expected two-letter ISO code)")]
    InvalidCountry(String),
}

/// A validated postal address.
///
/// Orders snapshot addresses at placement time; users keep saved copies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    line1: String,
    line2: Option<String>,
    city: String,
    region: String,
    postal_code: String,
    country: String,
}

impl Address {
    /// Creates a validated address.
    ///
    /// `line1`, `city` and `postal_code` must be non-empty; `country`
    /// must be a two-letter ISO 3166-1 code and is stored uppercased.
    pub fn new(
        line1: impl Into<String>,
        line2: Option<String>,
        city: impl Into<String>,
        region: impl Into<String>,
        postal_code: impl Into<String>,
        country: impl Into<String>,
    ) -> Result<Self, AddressError> {
        let line1 = line1.into().trim().to_string();
        if line1.is_empty() {
            return Err(AddressError::MissingField { field: "line1" });
        }

        let city = city.into().trim().to_string();
        if city.is_empty() {
            return Err(AddressError::MissingField { field: "city" });
        }

        let postal_code = postal_code.into().trim().to_string();
        if postal_code.is_empty() {
            return Err(AddressError::MissingField {
                field: "postal_code",
            });
        }

        let country = country.into().trim().to_uppercase();
        if country.len() != 2 || !country.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(AddressError::InvalidCountry(country));
        }

        Ok(Self {
            line1,
            line2: line2.map(|l| l.trim().to_string()).filter(|l| !l.is_empty()),
            city,
            region: region.into().trim().to_string(),
            postal_code,
            country,
        })
    }

    /// Returns the first address line.
    pub fn line1(&self) -> &str {
        &self.line1
    }

    /// Returns the optional second address line.
    pub fn line2(&self) -> Option<&str> {
        self.line2.as_deref()
    }

    /// Returns the city.
    pub fn city(&self) -> &str {
        &self.city
    }

    /// Returns the region, state or province.
    pub fn region(&self) -> &str {
        &self.region
    }

    /// Returns the postal code.
    pub fn postal_code(&self) -> &str {
        &self.postal_code
    }

    /// Returns the two-letter country code.
    pub fn country(&self) -> &str {
        &self.country
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}, {} {}, {}", self.line1, self.city, self.postal_code, self.country)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_address() -> Address {
        Address::new(
            "100 Main St",
            Some("Apt 4".to_string()),
            "Springfield",
            "IL",
            "62704",
            "us",
        )
        .unwrap()
    }

    #[test]
    fn test_valid_address() {
        let address = valid_address();
        assert_eq!(address.line1(), "100 Main St");
        assert_eq!(address.line2(), Some("Apt 4"));
        assert_eq!(address.country(), "US");
    }

    #[test]
    fn test_missing_line1_rejected() {
        let result = Address::new("  ", None, "Springfield", "IL", "62704", "US");
        assert!(matches!(
            result,
            Err(AddressError::MissingField { field: "line1" })
        ));
    }

    #[test]
    fn test_missing_postal_code_rejected() {
        let result = Address::new("100 Main St", None, "Springfield", "IL", "", "US");
        assert!(matches!(
            result,
            Err(AddressError::MissingField {
                field: "postal_code"
            })
        ));
    }

    #[test]
    fn test_invalid_country_rejected() {
        let result = Address::new("100 Main St", None, "Springfield", "IL", "62704", "USA");
        assert!(matches!(result, Err(AddressError::InvalidCountry(_))));
    }

    #[test]
    fn test_empty_line2_becomes_none() {
        let address = Address::new(
            "100 Main St",
            Some("   ".to_string()),
            "Springfield",
            "IL",
            "62704",
            "US",
        )
        .unwrap();
        assert!(address.line2().is_none());
    }

    #[test]
    fn test_display() {
        let address = valid_address();
        assert_eq!(address.to_string(), "100 Main St, Springfield 62704, US");
    }

    #[test]
    fn test_serialization_roundtrip() {
        let address = valid_address();
        let json = serde_json::to_string(&address).unwrap();
        let deserialized: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(address, deserialized);
    }
}
