//! The persistence surface the authentication core depends on.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::Store;
use crate::models::{AdminUser, LoginAttempt, NewAdminUser, NewLoginAttempt};

/// Storage operations required by credential validation.
///
/// Any `Err` is treated by callers as the store being unavailable, and the
/// login that triggered it fails closed.
#[async_trait]
pub trait AuthStore: Send + Sync {
    async fn get_admin_user_by_username(&self, username: &str) -> Result<Option<AdminUser>>;

    async fn create_admin_user(&self, user: NewAdminUser) -> Result<AdminUser>;

    async fn update_admin_last_login(&self, username: &str, at: DateTime<Utc>) -> Result<()>;

    async fn record_login_attempt(&self, attempt: NewLoginAttempt) -> Result<LoginAttempt>;

    /// All attempts for `username` with `attempted_at >= since`.
    async fn get_recent_login_attempts(
        &self,
        username: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<LoginAttempt>>;
}

#[async_trait]
impl AuthStore for Store {
    async fn get_admin_user_by_username(&self, username: &str) -> Result<Option<AdminUser>> {
        Self::get_admin_user_by_username(self, username).await
    }

    async fn create_admin_user(&self, user: NewAdminUser) -> Result<AdminUser> {
        Self::create_admin_user(self, user).await
    }

    async fn update_admin_last_login(&self, username: &str, at: DateTime<Utc>) -> Result<()> {
        Self::update_admin_last_login(self, username, at).await
    }

    async fn record_login_attempt(&self, attempt: NewLoginAttempt) -> Result<LoginAttempt> {
        Self::record_login_attempt(self, attempt).await
    }

    async fn get_recent_login_attempts(
        &self,
        username: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<LoginAttempt>> {
        Self::get_recent_login_attempts(self, username, since).await
    }
}
