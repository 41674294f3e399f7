use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};

/// Auth identity. At most one user per member (`member_id` is unique when
/// set); a user without a member is a pure staff/admin account.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub member_id: Option<Uuid>,
    pub is_verified: bool,
    #[serde(skip_serializing)]
    pub login_attempts: i64,
    #[serde(skip_serializing)]
    pub lock_until: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// True iff a lockout window is set and has not yet elapsed.
    pub fn is_locked(&self, now: DateTime<Utc>) -> bool {
        self.lock_until.map(|until| until > now).unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Role {
    Admin,
    Member,
    Staff,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Member => "Member",
            Role::Staff => "Staff",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "Admin" => Ok(Role::Admin),
            "Member" => Ok(Role::Member),
            "Staff" => Ok(Role::Staff),
            _ => Err(AppError::Validation(format!("Invalid role: {}", s))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CreateUserRequest {
    pub email: String,
    pub password_hash: String,
    pub role: Role,
    pub member_id: Option<Uuid>,
    pub is_verified: bool,
}
