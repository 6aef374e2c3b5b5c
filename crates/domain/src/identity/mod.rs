//! User accounts: credentials, profile, status and saved addresses.

mod aggregate;
mod events;
mod state;
mod value_objects;

pub use aggregate::{User, MAX_FAILED_LOGINS};
pub use events::UserEvent;
pub use state::{UserRole, UserStatus};
pub use value_objects::{AddressKind, Email, PasswordHash, SavedAddress};

use thiserror::Error;
use uuid::Uuid;

/// Errors raised by the user aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("invalid email address: {0:?}")]
    InvalidEmail(String),

    #[error("password hash must not be blank")]
    InvalidPasswordHash,

    #[error("name must not be blank")]
    InvalidName,

    #[error("account is locked")]
    AccountLocked,

    #[error("account is inactive")]
    AccountInactive,

    #[error("address not found: {address_id}")]
    AddressNotFound { address_id: Uuid },
}
