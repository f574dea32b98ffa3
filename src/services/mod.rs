pub mod auth_service;
pub use auth_service::{
    AuthError, AuthService, LoginOutcome, LoginResult, NewAdmin, ProvisionOutcome, Rejection,
    ValidationOutcome,
};

pub mod auth_service_impl;
pub use auth_service_impl::LedgerAuthService;

pub mod clock;
pub use clock::{Clock, ManualClock, SystemClock};

pub mod ledger;
pub use ledger::LoginAttemptLedger;

pub mod password;
pub use password::PasswordHasher;

pub mod token;
pub use token::{IssuedToken, TokenClaims, TokenService, TokenSubject};
