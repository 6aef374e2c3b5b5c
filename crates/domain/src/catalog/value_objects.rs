//! Value objects for the catalog domain.

use common::AttributeId;
use serde::{Deserialize, Serialize};

use super::CatalogError;

/// URL-safe identifier for products and categories.
///
/// Lowercase ASCII letters, digits and single hyphens; no leading or
/// trailing hyphen; at most 120 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Slug(String);

impl Slug {
    /// Parses and validates a slug.
    pub fn parse(input: impl Into<String>) -> Result<Self, CatalogError> {
        let value = input.into().trim().to_lowercase();

        if value.is_empty() || value.len() > 120 {
            return Err(CatalogError::InvalidSlug(value));
        }
        if value.starts_with('-') || value.ends_with('-') || value.contains("--") {
            return Err(CatalogError::InvalidSlug(value));
        }
        if !value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        {
            return Err(CatalogError::InvalidSlug(value));
        }

        Ok(Self(value))
    }

    /// Returns the slug as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Slug {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Slug {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Stock keeping unit for a variant, stored uppercased.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Sku(String);

impl Sku {
    /// Parses and validates a SKU.
    ///
    /// Non-empty, at most 64 characters, ASCII letters, digits,
    /// hyphens and underscores only.
    pub fn parse(input: impl Into<String>) -> Result<Self, CatalogError> {
        let value = input.into().trim().to_uppercase();

        if value.is_empty() || value.len() > 64 {
            return Err(CatalogError::InvalidSku(value));
        }
        if !value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(CatalogError::InvalidSku(value));
        }

        Ok(Self(value))
    }

    /// Returns the SKU as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Sku {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Sku {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// An attribute value attached to a variant (e.g. color = "red").
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantAttribute {
    /// The attribute definition this value belongs to.
    pub attribute_id: AttributeId,

    /// The value, matching the attribute's kind.
    pub value: serde_json::Value,
}

impl VariantAttribute {
    /// Creates a new variant attribute value.
    pub fn new(attribute_id: AttributeId, value: serde_json::Value) -> Self {
        Self {
            attribute_id,
            value,
        }
    }
}

/// Per-variant inventory with on-hand and reserved counts.
///
/// The invariant `reserved <= on_hand` is maintained by the product
/// aggregate, which guards every mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StockLevel {
    on_hand: u32,
    reserved: u32,
}

impl StockLevel {
    /// Creates a stock level with the given on-hand quantity.
    pub fn new(on_hand: u32) -> Self {
        Self {
            on_hand,
            reserved: 0,
        }
    }

    /// Returns the physically held quantity.
    pub fn on_hand(&self) -> u32 {
        self.on_hand
    }

    /// Returns the quantity reserved for pending orders.
    pub fn reserved(&self) -> u32 {
        self.reserved
    }

    /// Returns the quantity available to sell.
    pub fn available(&self) -> u32 {
        self.on_hand.saturating_sub(self.reserved)
    }

    /// Returns true if `quantity` can be reserved.
    pub fn can_reserve(&self, quantity: u32) -> bool {
        self.available() >= quantity
    }

    pub(crate) fn reserve(&mut self, quantity: u32) {
        self.reserved += quantity;
    }

    pub(crate) fn release(&mut self, quantity: u32) {
        self.reserved = self.reserved.saturating_sub(quantity);
    }

    pub(crate) fn commit(&mut self, quantity: u32) {
        self.reserved -= quantity;
        self.on_hand -= quantity;
    }

    pub(crate) fn set_on_hand(&mut self, on_hand: u32) {
        self.on_hand = on_hand;
    }
}
