//! User roles and account status.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Customer,
    Manager,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Customer => "customer",
            UserRole::Manager => "manager",
            UserRole::Admin => "admin",
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Account status.
///
/// ```text
/// Active <-> Inactive
///   |  ^
///   v  | (unlock)
/// Locked
/// ```
///
/// Locked is entered automatically after repeated failed logins and left
/// only through an explicit unlock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    Active,
    Inactive,
    Locked,
}

impl UserStatus {
    pub fn can_login(&self) -> bool {
        matches!(self, UserStatus::Active)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Inactive => "inactive",
            UserStatus::Locked => "locked",
        }
    }
}

impl std::fmt::Display for UserStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_active_users_can_login() {
        assert!(UserStatus::Active.can_login());
        assert!(!UserStatus::Inactive.can_login());
        assert!(!UserStatus::Locked.can_login());
    }

    #[test]
    fn test_display_matches_serde() {
        assert_eq!(UserRole::Manager.to_string(), "manager");
        assert_eq!(
            serde_json::to_string(&UserStatus::Locked).unwrap(),
            "\"locked\""
        );
    }
}
