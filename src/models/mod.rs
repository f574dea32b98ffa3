pub mod admin;

pub use admin::{AdminRole, AdminUser, LoginAttempt, NewAdminUser, NewLoginAttempt};
