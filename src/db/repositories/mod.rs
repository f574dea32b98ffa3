pub mod admin_user;
pub mod login_attempt;
