pub use super::admin_users::Entity as AdminUsers;
pub use super::login_attempts::Entity as LoginAttempts;
