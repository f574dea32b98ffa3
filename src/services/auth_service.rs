//! Domain service for administrator authentication.
//!
//! Handles credential validation with lockout, token issuance and
//! verification, and out-of-band admin provisioning.

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::models::{AdminRole, AdminUser};

/// The one message shown for unknown users, inactive accounts and wrong
/// passwords alike.
pub const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid credentials";

/// Infrastructure failures. Expected rejections are not errors; they come
/// back as [`Rejection`] values.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authentication store unavailable: {0}")]
    Storage(String),

    #[error("Failed to issue token: {0}")]
    Token(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Storage(format!("{err:#}"))
    }
}

/// Why a login was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Too many recent failures for the submitted username.
    RateLimited { retry_after_minutes: u32 },

    /// Unknown user, inactive account or wrong password.
    InvalidCredentials,
}

impl Rejection {
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::RateLimited {
                retry_after_minutes,
            } => format!(
                "Too many failed login attempts. Please try again in {retry_after_minutes} minutes."
            ),
            Self::InvalidCredentials => INVALID_CREDENTIALS_MESSAGE.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum ValidationOutcome {
    Valid(AdminUser),
    Rejected(Rejection),
}

impl ValidationOutcome {
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        matches!(self, Self::Valid(_))
    }

    #[must_use]
    pub fn message(&self) -> Option<String> {
        match self {
            Self::Valid(_) => None,
            Self::Rejected(rejection) => Some(rejection.message()),
        }
    }
}

/// Successful login: a signed token plus who it belongs to.
#[derive(Debug, Clone, Serialize)]
pub struct LoginResult {
    pub token: String,
    pub username: String,
    pub role: AdminRole,
    pub user_id: i32,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub enum LoginOutcome {
    Success(LoginResult),
    Rejected(Rejection),
}

#[derive(Debug, Clone)]
pub struct NewAdmin {
    pub username: String,
    pub password: String,
    pub email: Option<String>,
    pub role: AdminRole,
}

#[derive(Debug, Clone)]
pub enum ProvisionOutcome {
    Created(AdminUser),
    AlreadyExists,
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Checks credentials under the lockout policy. Every call appends
    /// exactly one login attempt.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Storage`] when the store cannot be read or the
    /// attempt cannot be recorded. The login must then be refused.
    async fn validate(
        &self,
        username: &str,
        password: &str,
        source_address: Option<&str>,
    ) -> Result<ValidationOutcome, AuthError>;

    /// Validates credentials and, on success, issues a token.
    async fn login(
        &self,
        username: &str,
        password: &str,
        source_address: Option<&str>,
    ) -> Result<LoginOutcome, AuthError>;

    /// Creates an admin unless the username is taken.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Validation`] for an empty username or a password
    /// shorter than eight characters.
    async fn provision_admin(&self, admin: NewAdmin) -> Result<ProvisionOutcome, AuthError>;
}
