use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::entities::{admin_users, login_attempts};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdminRole {
    #[default]
    Admin,
    Editor,
    Contributor,
}

impl AdminRole {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Editor => "editor",
            Self::Contributor => "contributor",
        }
    }
}

impl fmt::Display for AdminRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdminRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Self::Admin),
            "editor" => Ok(Self::Editor),
            "contributor" => Ok(Self::Contributor),
            other => anyhow::bail!("Unknown admin role: {other}"),
        }
    }
}

/// A privileged account as stored.
#[derive(Clone)]
pub struct AdminUser {
    pub id: i32,
    pub username: String,
    pub password_hash: String,
    pub email: Option<String>,
    pub role: AdminRole,
    pub is_active: bool,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Hand-written so the hash never ends up in logs.
impl fmt::Debug for AdminUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminUser")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("role", &self.role)
            .field("is_active", &self.is_active)
            .field("last_login_at", &self.last_login_at)
            .finish_non_exhaustive()
    }
}

impl TryFrom<admin_users::Model> for AdminUser {
    type Error = anyhow::Error;

    fn try_from(model: admin_users::Model) -> Result<Self, Self::Error> {
        Ok(Self {
            id: model.id,
            role: model.role.parse()?,
            username: model.username,
            password_hash: model.password_hash,
            email: model.email,
            is_active: model.is_active,
            last_login_at: model.last_login_at,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}

#[derive(Debug, Clone)]
pub struct NewAdminUser {
    pub username: String,
    pub password_hash: String,
    pub email: Option<String>,
    pub role: AdminRole,
    pub is_active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoginAttempt {
    pub id: i64,
    pub username: String,
    pub ip_address: Option<String>,
    pub successful: bool,
    pub attempted_at: DateTime<Utc>,
}

impl From<login_attempts::Model> for LoginAttempt {
    fn from(model: login_attempts::Model) -> Self {
        Self {
            id: model.id,
            username: model.username,
            ip_address: model.ip_address,
            successful: model.successful,
            attempted_at: model.attempted_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewLoginAttempt {
    pub username: String,
    pub ip_address: Option<String>,
    pub successful: bool,
    pub attempted_at: DateTime<Utc>,
}
