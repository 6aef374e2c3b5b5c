//! User aggregate.
//!
//! Tracks credentials, profile, account status and saved addresses. Five
//! failed logins in a row lock the account; only an explicit unlock reopens
//! it.

use chrono::{DateTime, Utc};
use common::{UserId, Version};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::address::Address;
use crate::aggregate::AggregateRoot;

use super::{
    AddressKind, Email, IdentityError, PasswordHash, SavedAddress, UserEvent, UserRole, UserStatus,
};

/// Consecutive failed logins before the account locks.
pub const MAX_FAILED_LOGINS: u32 = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    id: UserId,
    #[serde(default)]
    version: Version,
    email: Email,
    email_verified: bool,
    password_hash: PasswordHash,
    first_name: String,
    last_name: String,
    phone: Option<String>,
    role: UserRole,
    status: UserStatus,
    failed_logins: u32,
    last_login_at: Option<DateTime<Utc>>,
    addresses: Vec<SavedAddress>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    pending: Vec<UserEvent>,
}

impl User {
    /// Registers a new customer account.
    pub fn register(
        email: Email,
        password_hash: PasswordHash,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Result<Self, IdentityError> {
        let first_name = validated_name(first_name)?;
        let last_name = validated_name(last_name)?;

        let now = Utc::now();
        let mut user = User {
            id: UserId::new(),
            version: Version::initial(),
            email: email.clone(),
            email_verified: false,
            password_hash,
            first_name,
            last_name,
            phone: None,
            role: UserRole::Customer,
            status: UserStatus::Active,
            failed_logins: 0,
            last_login_at: None,
            addresses: Vec::new(),
            created_at: now,
            updated_at: now,
            pending: Vec::new(),
        };

        user.record(UserEvent::UserRegistered {
            user_id: user.id,
            email: email.as_str().to_string(),
        });
        Ok(user)
    }

    /// Confirms email ownership. Idempotent.
    pub fn verify_email(&mut self) {
        if self.email_verified {
            return;
        }
        self.email_verified = true;
        self.record(UserEvent::UserEmailVerified);
        self.touch();
    }

    /// Changes the email and resets verification.
    pub fn change_email(&mut self, email: Email) {
        if email == self.email {
            return;
        }

        let old_email = self.email.as_str().to_string();
        let new_email = email.as_str().to_string();
        self.email = email;
        self.email_verified = false;
        self.record(UserEvent::UserEmailChanged {
            old_email,
            new_email,
        });
        self.touch();
    }

    /// Replaces the password hash.
    pub fn change_password(&mut self, password_hash: PasswordHash) {
        self.password_hash = password_hash;
        self.record(UserEvent::UserPasswordChanged);
        self.touch();
    }

    /// Updates name and phone.
    pub fn update_profile(
        &mut self,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        phone: Option<String>,
    ) -> Result<(), IdentityError> {
        let first_name = validated_name(first_name)?;
        let last_name = validated_name(last_name)?;
        let phone = phone.map(|p| p.trim().to_string()).filter(|p| !p.is_empty());

        if first_name == self.first_name && last_name == self.last_name && phone == self.phone {
            return Ok(());
        }

        self.first_name = first_name.clone();
        self.last_name = last_name.clone();
        self.phone = phone.clone();
        self.record(UserEvent::UserProfileUpdated {
            first_name,
            last_name,
            phone,
        });
        self.touch();
        Ok(())
    }

    /// Changes the account role. No-op when unchanged.
    pub fn change_role(&mut self, role: UserRole) {
        if role == self.role {
            return;
        }

        let old_role = self.role;
        self.role = role;
        self.record(UserEvent::UserRoleChanged {
            old_role,
            new_role: role,
        });
        self.touch();
    }

    /// Disables the account. Idempotent.
    pub fn deactivate(&mut self) {
        if self.status == UserStatus::Inactive {
            return;
        }
        self.status = UserStatus::Inactive;
        self.record(UserEvent::UserDeactivated);
        self.touch();
    }

    /// Re-enables an inactive account. Locked accounts must be unlocked
    /// instead.
    pub fn reactivate(&mut self) -> Result<(), IdentityError> {
        match self.status {
            UserStatus::Active => Ok(()),
            UserStatus::Locked => Err(IdentityError::AccountLocked),
            UserStatus::Inactive => {
                self.status = UserStatus::Active;
                self.record(UserEvent::UserReactivated);
                self.touch();
                Ok(())
            }
        }
    }

    /// Counts a failed login attempt, locking the account on the fifth.
    ///
    /// No-op on an already locked account.
    pub fn record_login_failure(&mut self) {
        if self.status == UserStatus::Locked {
            return;
        }

        self.failed_logins += 1;
        if self.failed_logins >= MAX_FAILED_LOGINS {
            self.status = UserStatus::Locked;
            self.record(UserEvent::UserLocked {
                failed_attempts: self.failed_logins,
            });
        }
        self.touch();
    }

    /// Records a successful login and resets the failure count.
    pub fn record_login_success(&mut self) -> Result<(), IdentityError> {
        match self.status {
            UserStatus::Locked => Err(IdentityError::AccountLocked),
            UserStatus::Inactive => Err(IdentityError::AccountInactive),
            UserStatus::Active => {
                self.failed_logins = 0;
                let at = Utc::now();
                self.last_login_at = Some(at);
                self.record(UserEvent::UserLoginRecorded { at });
                self.touch();
                Ok(())
            }
        }
    }

    /// Lifts a lock and resets the failure count. No-op when not locked.
    pub fn unlock(&mut self) {
        if self.status != UserStatus::Locked {
            return;
        }
        self.status = UserStatus::Active;
        self.failed_logins = 0;
        self.record(UserEvent::UserUnlocked);
        self.touch();
    }

    /// Saves an address on the account.
    ///
    /// The first address of a kind always becomes the default; marking a
    /// later one default demotes the previous default of that kind.
    pub fn add_address(&mut self, kind: AddressKind, address: Address, is_default: bool) -> Uuid {
        let is_default = is_default || !self.addresses.iter().any(|a| a.kind == kind);
        if is_default {
            self.clear_default(kind);
        }

        let address_id = Uuid::new_v4();
        self.addresses.push(SavedAddress {
            id: address_id,
            kind,
            address,
            is_default,
        });
        self.record(UserEvent::UserAddressAdded { address_id, kind });
        self.touch();
        address_id
    }

    /// Removes a saved address. When the default goes, the oldest remaining
    /// address of that kind takes over as default.
    pub fn remove_address(&mut self, address_id: Uuid) -> Result<(), IdentityError> {
        let position = self
            .addresses
            .iter()
            .position(|a| a.id == address_id)
            .ok_or(IdentityError::AddressNotFound { address_id })?;

        let removed = self.addresses.remove(position);
        if removed.is_default {
            if let Some(next) = self.addresses.iter_mut().find(|a| a.kind == removed.kind) {
                next.is_default = true;
            }
        }
        self.record(UserEvent::UserAddressRemoved { address_id });
        self.touch();
        Ok(())
    }

    /// Makes a saved address the default for its kind. State only, no event.
    pub fn set_default_address(&mut self, address_id: Uuid) -> Result<(), IdentityError> {
        let kind = self
            .addresses
            .iter()
            .find(|a| a.id == address_id)
            .map(|a| a.kind)
            .ok_or(IdentityError::AddressNotFound { address_id })?;

        self.clear_default(kind);
        if let Some(target) = self.addresses.iter_mut().find(|a| a.id == address_id) {
            target.is_default = true;
        }
        self.touch();
        Ok(())
    }

    pub fn id(&self) -> UserId {
        self.id
    }

    pub fn email(&self) -> &Email {
        &self.email
    }

    pub fn is_email_verified(&self) -> bool {
        self.email_verified
    }

    pub fn password_hash(&self) -> &PasswordHash {
        &self.password_hash
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub fn phone(&self) -> Option<&str> {
        self.phone.as_deref()
    }

    pub fn role(&self) -> UserRole {
        self.role
    }

    pub fn status(&self) -> UserStatus {
        self.status
    }

    pub fn failed_logins(&self) -> u32 {
        self.failed_logins
    }

    pub fn last_login_at(&self) -> Option<DateTime<Utc>> {
        self.last_login_at
    }

    pub fn addresses(&self) -> &[SavedAddress] {
        &self.addresses
    }

    pub fn default_address(&self, kind: AddressKind) -> Option<&SavedAddress> {
        self.addresses
            .iter()
            .find(|a| a.kind == kind && a.is_default)
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    fn clear_default(&mut self, kind: AddressKind) {
        for address in self.addresses.iter_mut().filter(|a| a.kind == kind) {
            address.is_default = false;
        }
    }

    fn record(&mut self, event: UserEvent) {
        self.pending.push(event);
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

fn validated_name(input: impl Into<String>) -> Result<String, IdentityError> {
    let name = input.into().trim().to_string();
    if name.is_empty() {
        return Err(IdentityError::InvalidName);
    }
    Ok(name)
}

impl AggregateRoot for User {
    type Event = UserEvent;

    fn aggregate_type() -> &'static str {
        "user"
    }

    fn aggregate_id(&self) -> Uuid {
        self.id.as_uuid()
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn pending_events(&self) -> &[UserEvent] {
        &self.pending
    }

    fn take_events(&mut self) -> Vec<UserEvent> {
        std::mem::take(&mut self.pending)
    }
}
