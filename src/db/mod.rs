use crate::models::{AdminRole, AdminUser, LoginAttempt, NewAdminUser, NewLoginAttempt};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub mod auth_store;
pub mod migrator;
pub mod repositories;

pub use auth_store::AuthStore;

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        if !db_url.contains(":memory:") {
            let path_str = db_url.trim_start_matches("sqlite:").trim_start_matches("//");
            if let Some(parent) = Path::new(path_str).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_str).exists() {
                std::fs::File::create(path_str)
                    .with_context(|| format!("Failed to create database file: {path_str}"))?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt)
            .await
            .context("Failed to connect to database")?;

        migrator::Migrator::up(&conn, None)
            .await
            .context("Failed to apply migrations")?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn admin_user_repo(&self) -> repositories::admin_user::AdminUserRepository {
        repositories::admin_user::AdminUserRepository::new(self.conn.clone())
    }

    fn login_attempt_repo(&self) -> repositories::login_attempt::LoginAttemptRepository {
        repositories::login_attempt::LoginAttemptRepository::new(self.conn.clone())
    }

    pub async fn get_admin_user_by_username(&self, username: &str) -> Result<Option<AdminUser>> {
        self.admin_user_repo().get_by_username(username).await
    }

    pub async fn create_admin_user(&self, user: NewAdminUser) -> Result<AdminUser> {
        self.admin_user_repo().create(user).await
    }

    pub async fn update_admin_last_login(&self, username: &str, at: DateTime<Utc>) -> Result<()> {
        self.admin_user_repo().update_last_login(username, at).await
    }

    pub async fn set_admin_active(&self, username: &str, is_active: bool) -> Result<bool> {
        self.admin_user_repo().set_active(username, is_active).await
    }

    pub async fn set_admin_role(&self, username: &str, role: AdminRole) -> Result<bool> {
        self.admin_user_repo().set_role(username, role).await
    }

    pub async fn record_login_attempt(&self, attempt: NewLoginAttempt) -> Result<LoginAttempt> {
        self.login_attempt_repo().record(attempt).await
    }

    pub async fn get_recent_login_attempts(
        &self,
        username: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<LoginAttempt>> {
        self.login_attempt_repo().since(username, since).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    async fn test_store() -> Store {
        Store::with_pool_options("sqlite::memory:", 1, 1)
            .await
            .expect("in-memory store")
    }

    fn new_admin(username: &str) -> NewAdminUser {
        NewAdminUser {
            username: username.to_string(),
            password_hash: "$argon2id$v=19$placeholder".to_string(),
            email: Some(format!("{username}@example.com")),
            role: AdminRole::Editor,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn admin_users_are_unique_and_case_sensitive() {
        let store = test_store().await;

        let created = store.create_admin_user(new_admin("alice")).await.unwrap();
        assert_eq!(created.role, AdminRole::Editor);
        assert!(created.last_login_at.is_none());

        assert!(store.create_admin_user(new_admin("alice")).await.is_err());
        assert!(store.get_admin_user_by_username("Alice").await.unwrap().is_none());

        let fetched = store.get_admin_user_by_username("alice").await.unwrap().unwrap();
        assert_eq!(fetched.id, created.id);
    }

    #[tokio::test]
    async fn last_login_and_admin_mutations_persist() {
        let store = test_store().await;
        store.create_admin_user(new_admin("bob")).await.unwrap();

        let at = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();
        store.update_admin_last_login("bob", at).await.unwrap();
        assert!(store.set_admin_active("bob", false).await.unwrap());
        assert!(store.set_admin_role("bob", AdminRole::Contributor).await.unwrap());
        assert!(!store.set_admin_active("nobody", false).await.unwrap());

        let bob = store.get_admin_user_by_username("bob").await.unwrap().unwrap();
        assert_eq!(bob.last_login_at, Some(at));
        assert!(!bob.is_active);
        assert_eq!(bob.role, AdminRole::Contributor);

        assert!(store.update_admin_last_login("nobody", at).await.is_err());
    }

    #[tokio::test]
    async fn recent_attempts_respect_username_and_lower_bound() {
        let store = test_store().await;
        let base = Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap();

        for (username, minutes, successful) in [
            ("alice", 0, false),
            ("alice", 10, true),
            ("alice", 20, false),
            ("mallory", 20, false),
        ] {
            store
                .record_login_attempt(NewLoginAttempt {
                    username: username.to_string(),
                    ip_address: Some("10.0.0.1".to_string()),
                    successful,
                    attempted_at: base + chrono::Duration::minutes(minutes),
                })
                .await
                .unwrap();
        }

        let recent = store
            .get_recent_login_attempts("alice", base + chrono::Duration::minutes(10))
            .await
            .unwrap();

        assert_eq!(recent.len(), 2);
        assert!(recent[0].successful);
        assert!(!recent[1].successful);
        assert!(recent.iter().all(|a| a.username == "alice"));
    }
}
