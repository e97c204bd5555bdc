//! User model - organization-scoped accounts with lockout bookkeeping.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::Role;

/// Account status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserStatus {
    Active,
    Locked,
}

impl UserStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserStatus::Active => "active",
            UserStatus::Locked => "locked",
        }
    }
}

/// User entity (organization-scoped).
///
/// `email` is stored normalised (trimmed, lowercase); uniqueness holds per
/// organization only.
#[derive(Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub role_id: Role,
    pub status: String,
    pub failed_login_attempts: i32,
    pub last_failed_login_at: Option<DateTime<Utc>>,
    pub locked_until: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new active user with the default role.
    pub fn new(organization_id: Uuid, email: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            organization_id,
            email: normalize_email(&email),
            password_hash,
            role_id: Role::DEFAULT,
            status: UserStatus::Active.as_str().to_string(),
            failed_login_attempts: 0,
            last_failed_login_at: None,
            locked_until: None,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn role(&self) -> Role {
        self.role_id
    }

    pub fn is_locked(&self) -> bool {
        self.status == UserStatus::Locked.as_str()
    }
}

// Keeps the password hash out of logs.
impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("organization_id", &self.organization_id)
            .field("email", &self.email)
            .field("role_id", &self.role_id)
            .field("status", &self.status)
            .field("failed_login_attempts", &self.failed_login_attempts)
            .field("locked_until", &self.locked_until)
            .finish_non_exhaustive()
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
