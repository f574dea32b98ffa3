use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::entities::admin_users;
use crate::models::{AdminRole, AdminUser, NewAdminUser};

pub struct AdminUserRepository {
    conn: DatabaseConnection,
}

impl AdminUserRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    async fn find_model(&self, username: &str) -> Result<Option<admin_users::Model>> {
        admin_users::Entity::find()
            .filter(admin_users::Column::Username.eq(username))
            .one(&self.conn)
            .await
            .context("Failed to query admin user by username")
    }

    /// Exact, case-sensitive match on username
    pub async fn get_by_username(&self, username: &str) -> Result<Option<AdminUser>> {
        self.find_model(username)
            .await?
            .map(AdminUser::try_from)
            .transpose()
    }

    pub async fn create(&self, user: NewAdminUser) -> Result<AdminUser> {
        if self.find_model(&user.username).await?.is_some() {
            anyhow::bail!("Admin user already exists: {}", user.username);
        }

        let now = Utc::now();
        let active = admin_users::ActiveModel {
            username: Set(user.username),
            password_hash: Set(user.password_hash),
            email: Set(user.email),
            role: Set(user.role.as_str().to_string()),
            is_active: Set(user.is_active),
            last_login_at: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert admin user")?;

        AdminUser::try_from(model)
    }

    pub async fn update_last_login(&self, username: &str, at: DateTime<Utc>) -> Result<()> {
        let user = self
            .find_model(username)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Admin user not found: {username}"))?;

        let mut active: admin_users::ActiveModel = user.into();
        active.last_login_at = Set(Some(at));
        active.updated_at = Set(at);
        active
            .update(&self.conn)
            .await
            .context("Failed to update admin last login")?;

        Ok(())
    }

    /// Soft (de)activation; accounts are never deleted.
    pub async fn set_active(&self, username: &str, is_active: bool) -> Result<bool> {
        let Some(user) = self.find_model(username).await? else {
            return Ok(false);
        };

        let mut active: admin_users::ActiveModel = user.into();
        active.is_active = Set(is_active);
        active.updated_at = Set(Utc::now());
        active
            .update(&self.conn)
            .await
            .context("Failed to update admin active flag")?;

        Ok(true)
    }

    pub async fn set_role(&self, username: &str, role: AdminRole) -> Result<bool> {
        let Some(user) = self.find_model(username).await? else {
            return Ok(false);
        };

        let mut active: admin_users::ActiveModel = user.into();
        active.role = Set(role.as_str().to_string());
        active.updated_at = Set(Utc::now());
        active
            .update(&self.conn)
            .await
            .context("Failed to update admin role")?;

        Ok(true)
    }
}
