pub mod prelude;

pub mod admin_users;
pub mod login_attempts;
