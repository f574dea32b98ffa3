use crate::entities::{login_attempts, prelude::*};
use crate::models::{LoginAttempt, NewLoginAttempt};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};

/// Append-only access to `login_attempts`.
pub struct LoginAttemptRepository {
    conn: DatabaseConnection,
}

impl LoginAttemptRepository {
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn record(&self, attempt: NewLoginAttempt) -> Result<LoginAttempt> {
        let active_model = login_attempts::ActiveModel {
            username: Set(attempt.username),
            ip_address: Set(attempt.ip_address),
            successful: Set(attempt.successful),
            attempted_at: Set(attempt.attempted_at),
            ..Default::default()
        };

        let model = active_model
            .insert(&self.conn)
            .await
            .context("Failed to record login attempt")?;

        Ok(LoginAttempt::from(model))
    }

    /// Attempts for `username` at or after `since`, oldest first.
    pub async fn since(&self, username: &str, since: DateTime<Utc>) -> Result<Vec<LoginAttempt>> {
        let rows = LoginAttempts::find()
            .filter(login_attempts::Column::Username.eq(username))
            .filter(login_attempts::Column::AttemptedAt.gte(since))
            .order_by_asc(login_attempts::Column::AttemptedAt)
            .all(&self.conn)
            .await
            .context("Failed to query recent login attempts")?;

        Ok(rows.into_iter().map(LoginAttempt::from).collect())
    }
}
