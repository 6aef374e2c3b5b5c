//! User domain events.
//!
//! Credential material never appears in events; password changes are
//! recorded as bare facts.

use chrono::{DateTime, Utc};
use common::UserId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::aggregate::DomainEvent;

use super::{AddressKind, UserRole};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum UserEvent {
    /// Account was created.
    UserRegistered { user_id: UserId, email: String },

    /// Email ownership was confirmed.
    UserEmailVerified,

    /// Email changed; verification resets.
    UserEmailChanged {
        old_email: String,
        new_email: String,
    },

    /// Password hash was replaced.
    UserPasswordChanged,

    /// Name or phone changed.
    UserProfileUpdated {
        first_name: String,
        last_name: String,
        phone: Option<String>,
    },

    /// Role changed.
    UserRoleChanged {
        old_role: UserRole,
        new_role: UserRole,
    },

    /// Account was disabled.
    UserDeactivated,

    /// Account was re-enabled.
    UserReactivated,

    /// Account locked after repeated failed logins.
    UserLocked { failed_attempts: u32 },

    /// Lock was lifted by an operator.
    UserUnlocked,

    /// Successful login.
    UserLoginRecorded { at: DateTime<Utc> },

    /// Address saved on the account.
    UserAddressAdded { address_id: Uuid, kind: AddressKind },

    /// Saved address removed.
    UserAddressRemoved { address_id: Uuid },
}

impl DomainEvent for UserEvent {
    fn event_type(&self) -> &'static str {
        match self {
            UserEvent::UserRegistered { .. } => "UserRegistered",
            UserEvent::UserEmailVerified => "UserEmailVerified",
            UserEvent::UserEmailChanged { .. } => "UserEmailChanged",
            UserEvent::UserPasswordChanged => "UserPasswordChanged",
            UserEvent::UserProfileUpdated { .. } => "UserProfileUpdated",
            UserEvent::UserRoleChanged { .. } => "UserRoleChanged",
            UserEvent::UserDeactivated => "UserDeactivated",
            UserEvent::UserReactivated => "UserReactivated",
            UserEvent::UserLocked { .. } => "UserLocked",
            UserEvent::UserUnlocked => "UserUnlocked",
            UserEvent::UserLoginRecorded { .. } => "UserLoginRecorded",
            UserEvent::UserAddressAdded { .. } => "UserAddressAdded",
            UserEvent::UserAddressRemoved { .. } => "UserAddressRemoved",
        }
    }
}
