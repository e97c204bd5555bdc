//! Role model - fixed privilege ladder shared by every organization.
//!
//! Roles are ordered by ordinal: a LOWER ordinal is MORE privileged.
//! `Owner (1) > Admin (2) > Manager (3) > Member (4)`. The ordinal is what
//! travels in session tokens (`role_id`) and what is stored in the
//! `users.role_id` column.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(try_from = "i16", into = "i16")]
#[repr(i16)]
pub enum Role {
    Owner = 1,
    Admin = 2,
    Manager = 3,
    Member = 4,
}

impl Role {
    /// Role assigned at self-registration (least privileged).
    pub const DEFAULT: Role = Role::Member;

    pub fn ordinal(self) -> i16 {
        self as i16
    }

    /// True when this role is at least as privileged as `required`.
    pub fn satisfies(self, required: Role) -> bool {
        self.ordinal() <= required.ordinal()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Member => "member",
        }
    }
}

impl TryFrom<i16> for Role {
    type Error = String;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Role::Owner),
            2 => Ok(Role::Admin),
            3 => Ok(Role::Manager),
            4 => Ok(Role::Member),
            other => Err(format!("Unknown role ordinal: {}", other)),
        }
    }
}

impl From<Role> for i16 {
    fn from(role: Role) -> Self {
        role.ordinal()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
