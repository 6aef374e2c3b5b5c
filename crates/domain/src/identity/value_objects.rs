//! Identity value objects.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::address::Address;

use super::IdentityError;

/// A validated, normalized email address. Stored lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    pub fn parse(input: impl Into<String>) -> Result<Self, IdentityError> {
        let value = input.into().trim().to_lowercase();
        let Some((local, domain)) = value.split_once('@') else {
            return Err(IdentityError::InvalidEmail(value));
        };
        if local.is_empty()
            || domain.is_empty()
            || !domain.contains('.')
            || domain.starts_with('.')
            || domain.ends_with('.')
            || value.chars().any(char::is_whitespace)
            || domain.contains('@')
        {
            return Err(IdentityError::InvalidEmail(value));
        }
        Ok(Email(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Domain part, after the `@`.
    pub fn domain(&self) -> &str {
        self.0.split_once('@').map_or("", |(_, domain)| domain)
    }
}

impl std::fmt::Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// An opaque, already-hashed password.
///
/// Hashing happens at the application edge; the domain only checks the hash
/// is present. Debug output never shows the value.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PasswordHash(String);

impl PasswordHash {
    pub fn parse(input: impl Into<String>) -> Result<Self, IdentityError> {
        let value = input.into();
        if value.trim().is_empty() {
            return Err(IdentityError::InvalidPasswordHash);
        }
        Ok(PasswordHash(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PasswordHash(***)")
    }
}

/// Whether a saved address is used for shipping or billing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressKind {
    Shipping,
    Billing,
}

impl AddressKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AddressKind::Shipping => "shipping",
            AddressKind::Billing => "billing",
        }
    }
}

impl std::fmt::Display for AddressKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An address saved on the user's account.
///
/// At most one address per kind is the default; the user aggregate maintains
/// that invariant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedAddress {
    pub id: Uuid,
    pub kind: AddressKind,
    pub address: Address,
    pub is_default: bool,
}
