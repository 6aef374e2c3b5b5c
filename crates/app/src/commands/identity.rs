//! Identity commands.
//!
//! Password hashing and token issuance happen elsewhere; these handlers
//! take opaque hashes and keep the account state machine honest.

use std::sync::Arc;

use async_trait::async_trait;
use common::UserId;
use domain::Address;
use domain::AggregateRoot;
use domain::RepositoryError;
use domain::identity::{AddressKind, Email, PasswordHash, User, UserRole, UserStatus};
use domain::repository::UserRepository;
use uuid::Uuid;

use crate::error::AppError;
use crate::mediator::{Command, CommandHandler};

pub struct RegisterUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
}

impl Command for RegisterUser {
    type Output = UserId;
}

pub struct RegisterUserHandler {
    users: Arc<dyn UserRepository>,
}

impl RegisterUserHandler {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl CommandHandler<RegisterUser> for RegisterUserHandler {
    #[tracing::instrument(skip(self, command), fields(email = %command.email))]
    async fn handle(&self, command: RegisterUser) -> Result<UserId, AppError> {
        let email = Email::parse(command.email)?;
        if self.users.email_exists(&email).await? {
            return Err(RepositoryError::Duplicate {
                field: "email",
                value: email.as_str().to_string(),
            }
            .into());
        }
        let password_hash = PasswordHash::parse(command.password_hash)?;

        let mut user = User::register(
            email,
            password_hash,
            command.first_name,
            command.last_name,
        )?;
        self.users.save(&mut user).await?;

        tracing::info!(user_id = %user.id(), "user registered");
        Ok(user.id())
    }
}

pub struct VerifyEmail {
    pub user_id: UserId,
}

impl Command for VerifyEmail {
    type Output = ();
}

pub struct VerifyEmailHandler {
    users: Arc<dyn UserRepository>,
}

impl VerifyEmailHandler {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl CommandHandler<VerifyEmail> for VerifyEmailHandler {
    async fn handle(&self, command: VerifyEmail) -> Result<(), AppError> {
        let mut user = find_user(&self.users, command.user_id).await?;
        user.verify_email();
        if user.pending_events().is_empty() {
            return Ok(());
        }
        self.users.save(&mut user).await?;
        Ok(())
    }
}

/// Changes the address and resets verification.
pub struct ChangeUserEmail {
    pub user_id: UserId,
    pub email: String,
}

impl Command for ChangeUserEmail {
    type Output = ();
}

pub struct ChangeUserEmailHandler {
    users: Arc<dyn UserRepository>,
}

impl ChangeUserEmailHandler {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl CommandHandler<ChangeUserEmail> for ChangeUserEmailHandler {
    async fn handle(&self, command: ChangeUserEmail) -> Result<(), AppError> {
        let email = Email::parse(command.email)?;
        if let Some(existing) = self.users.find_by_email(&email).await? {
            if existing.id() != command.user_id {
                return Err(RepositoryError::Duplicate {
                    field: "email",
                    value: email.as_str().to_string(),
                }
                .into());
            }
        }

        let mut user = find_user(&self.users, command.user_id).await?;
        user.change_email(email);
        if user.pending_events().is_empty() {
            return Ok(());
        }
        self.users.save(&mut user).await?;
        Ok(())
    }
}

pub struct ChangeUserPassword {
    pub user_id: UserId,
    pub password_hash: String,
}

impl Command for ChangeUserPassword {
    type Output = ();
}

pub struct ChangeUserPasswordHandler {
    users: Arc<dyn UserRepository>,
}

impl ChangeUserPasswordHandler {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl CommandHandler<ChangeUserPassword> for ChangeUserPasswordHandler {
    async fn handle(&self, command: ChangeUserPassword) -> Result<(), AppError> {
        let password_hash = PasswordHash::parse(command.password_hash)?;
        let mut user = find_user(&self.users, command.user_id).await?;
        user.change_password(password_hash);
        self.users.save(&mut user).await?;
        Ok(())
    }
}

pub struct UpdateUserProfile {
    pub user_id: UserId,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
}

impl Command for UpdateUserProfile {
    type Output = ();
}

pub struct UpdateUserProfileHandler {
    users: Arc<dyn UserRepository>,
}

impl UpdateUserProfileHandler {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl CommandHandler<UpdateUserProfile> for UpdateUserProfileHandler {
    async fn handle(&self, command: UpdateUserProfile) -> Result<(), AppError> {
        let mut user = find_user(&self.users, command.user_id).await?;
        user.update_profile(command.first_name, command.last_name, command.phone)?;
        if user.pending_events().is_empty() {
            return Ok(());
        }
        self.users.save(&mut user).await?;
        Ok(())
    }
}

pub struct ChangeUserRole {
    pub user_id: UserId,
    pub role: UserRole,
}

impl Command for ChangeUserRole {
    type Output = ();
}

pub struct ChangeUserRoleHandler {
    users: Arc<dyn UserRepository>,
}

impl ChangeUserRoleHandler {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl CommandHandler<ChangeUserRole> for ChangeUserRoleHandler {
    #[tracing::instrument(skip(self, command), fields(user_id = %command.user_id))]
    async fn handle(&self, command: ChangeUserRole) -> Result<(), AppError> {
        let mut user = find_user(&self.users, command.user_id).await?;
        user.change_role(command.role);
        if user.pending_events().is_empty() {
            return Ok(());
        }
        self.users.save(&mut user).await?;
        Ok(())
    }
}

/// Records the outcome of a credential check done by the caller.
///
/// The fifth consecutive failure locks the account; a success while locked
/// is rejected so a stolen password cannot slip through mid-lockout.
pub struct RecordLogin {
    pub email: String,
    pub success: bool,
}

impl Command for RecordLogin {
    /// The account status after the attempt was recorded.
    type Output = UserStatus;
}

pub struct RecordLoginHandler {
    users: Arc<dyn UserRepository>,
}

impl RecordLoginHandler {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl CommandHandler<RecordLogin> for RecordLoginHandler {
    #[tracing::instrument(skip(self, command), fields(email = %command.email, success = command.success))]
    async fn handle(&self, command: RecordLogin) -> Result<UserStatus, AppError> {
        let email = Email::parse(command.email)?;
        let mut user = self
            .users
            .find_by_email(&email)
            .await?
            .ok_or_else(|| AppError::not_found("user", email.as_str()))?;

        if command.success {
            user.record_login_success()?;
        } else {
            user.record_login_failure();
        }
        self.users.save(&mut user).await?;
        Ok(user.status())
    }
}

pub struct UnlockUser {
    pub user_id: UserId,
}

impl Command for UnlockUser {
    type Output = ();
}

pub struct UnlockUserHandler {
    users: Arc<dyn UserRepository>,
}

impl UnlockUserHandler {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl CommandHandler<UnlockUser> for UnlockUserHandler {
    async fn handle(&self, command: UnlockUser) -> Result<(), AppError> {
        let mut user = find_user(&self.users, command.user_id).await?;
        user.unlock();
        if user.pending_events().is_empty() {
            return Ok(());
        }
        self.users.save(&mut user).await?;
        Ok(())
    }
}

pub struct AddUserAddress {
    pub user_id: UserId,
    pub kind: AddressKind,
    pub address: Address,
    pub is_default: bool,
}

impl Command for AddUserAddress {
    /// The saved address id.
    type Output = Uuid;
}

pub struct AddUserAddressHandler {
    users: Arc<dyn UserRepository>,
}

impl AddUserAddressHandler {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl CommandHandler<AddUserAddress> for AddUserAddressHandler {
    async fn handle(&self, command: AddUserAddress) -> Result<Uuid, AppError> {
        let mut user = find_user(&self.users, command.user_id).await?;
        let address_id = user.add_address(command.kind, command.address, command.is_default);
        self.users.save(&mut user).await?;
        Ok(address_id)
    }
}

pub struct RemoveUserAddress {
    pub user_id: UserId,
    pub address_id: Uuid,
}

impl Command for RemoveUserAddress {
    type Output = ();
}

pub struct RemoveUserAddressHandler {
    users: Arc<dyn UserRepository>,
}

impl RemoveUserAddressHandler {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl CommandHandler<RemoveUserAddress> for RemoveUserAddressHandler {
    async fn handle(&self, command: RemoveUserAddress) -> Result<(), AppError> {
        let mut user = find_user(&self.users, command.user_id).await?;
        user.remove_address(command.address_id)?;
        self.users.save(&mut user).await?;
        Ok(())
    }
}

pub struct SetDefaultUserAddress {
    pub user_id: UserId,
    pub address_id: Uuid,
}

impl Command for SetDefaultUserAddress {
    type Output = ();
}

pub struct SetDefaultUserAddressHandler {
    users: Arc<dyn UserRepository>,
}

impl SetDefaultUserAddressHandler {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl CommandHandler<SetDefaultUserAddress> for SetDefaultUserAddressHandler {
    async fn handle(&self, command: SetDefaultUserAddress) -> Result<(), AppError> {
        let mut user = find_user(&self.users, command.user_id).await?;
        user.set_default_address(command.address_id)?;
        if user.pending_events().is_empty() {
            return Ok(());
        }
        self.users.save(&mut user).await?;
        Ok(())
    }
}

async fn find_user(users: &Arc<dyn UserRepository>, user_id: UserId) -> Result<User, AppError> {
    users
        .find(user_id)
        .await?
        .ok_or_else(|| AppError::not_found("user", user_id))
}
