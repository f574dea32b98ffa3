//! Ledger-backed implementation of the `AuthService` trait.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{error, info, warn};

use crate::config::AuthThrottleConfig;
use crate::db::AuthStore;
use crate::models::NewAdminUser;
use crate::services::auth_service::{
    AuthError, AuthService, LoginOutcome, LoginResult, NewAdmin, ProvisionOutcome, Rejection,
    ValidationOutcome,
};
use crate::services::clock::Clock;
use crate::services::ledger::LoginAttemptLedger;
use crate::services::password::PasswordHasher;
use crate::services::token::{TokenService, TokenSubject};

const MIN_PASSWORD_LEN: usize = 8;

pub struct LedgerAuthService {
    store: Arc<dyn AuthStore>,
    ledger: LoginAttemptLedger,
    hasher: PasswordHasher,
    tokens: TokenService,
    throttle: AuthThrottleConfig,
    clock: Arc<dyn Clock>,
    /// Verified against when no usable account exists, so that path costs
    /// as much as a real password check.
    decoy_hash: OnceCell<String>,
}

impl LedgerAuthService {
    #[must_use]
    pub fn new(
        store: Arc<dyn AuthStore>,
        hasher: PasswordHasher,
        tokens: TokenService,
        throttle: AuthThrottleConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            ledger: LoginAttemptLedger::new(store.clone(), clock.clone()),
            store,
            hasher,
            tokens,
            throttle,
            clock,
            decoy_hash: OnceCell::new(),
        }
    }

    #[must_use]
    pub const fn ledger(&self) -> &LoginAttemptLedger {
        &self.ledger
    }

    async fn burn_decoy_verification(&self, password: &str) {
        match self
            .decoy_hash
            .get_or_try_init(|| self.hasher.hash("decoy-password-never-matches"))
            .await
        {
            Ok(hash) => {
                let _ = self.hasher.verify(password, hash).await;
            }
            Err(e) => warn!(error = %e, "Failed to prepare decoy password hash"),
        }
    }

    async fn reject(
        &self,
        username: &str,
        source_address: Option<&str>,
        rejection: Rejection,
        reason: &'static str,
    ) -> Result<ValidationOutcome, AuthError> {
        self.ledger.record(username, source_address, false).await?;

        let outcome = match rejection {
            Rejection::RateLimited { .. } => "rate_limited",
            Rejection::InvalidCredentials => "invalid_credentials",
        };
        metrics::counter!("auth_login_attempts_total", "outcome" => outcome).increment(1);
        warn!(
            username = %username,
            source = source_address.unwrap_or("unknown"),
            reason,
            "Login rejected"
        );

        Ok(ValidationOutcome::Rejected(rejection))
    }
}

#[async_trait]
impl AuthService for LedgerAuthService {
    async fn validate(
        &self,
        username: &str,
        password: &str,
        source_address: Option<&str>,
    ) -> Result<ValidationOutcome, AuthError> {
        let failures = self
            .ledger
            .count_recent_failures(username, self.throttle.window())
            .await?;

        if failures >= self.throttle.max_attempts {
            let rejection = Rejection::RateLimited {
                retry_after_minutes: self.throttle.window_minutes,
            };
            return self
                .reject(username, source_address, rejection, "locked_out")
                .await;
        }

        let user = match self.store.get_admin_user_by_username(username).await {
            Ok(user) => user,
            Err(e) => {
                // Still try to leave a trace of the attempt before failing closed.
                if let Err(record_err) = self.ledger.record(username, source_address, false).await
                {
                    error!(error = %record_err, "Failed to record login attempt");
                }
                metrics::counter!("auth_login_attempts_total", "outcome" => "error").increment(1);
                return Err(e.into());
            }
        };

        let Some(user) = user else {
            self.burn_decoy_verification(password).await;
            return self
                .reject(
                    username,
                    source_address,
                    Rejection::InvalidCredentials,
                    "unknown_user",
                )
                .await;
        };

        if !user.is_active {
            self.burn_decoy_verification(password).await;
            return self
                .reject(
                    username,
                    source_address,
                    Rejection::InvalidCredentials,
                    "inactive",
                )
                .await;
        }

        if !self.hasher.verify(password, &user.password_hash).await {
            return self
                .reject(
                    username,
                    source_address,
                    Rejection::InvalidCredentials,
                    "wrong_password",
                )
                .await;
        }

        self.ledger.record(username, source_address, true).await?;
        self.store
            .update_admin_last_login(username, self.clock.now())
            .await?;

        metrics::counter!("auth_login_attempts_total", "outcome" => "success").increment(1);
        info!(username = %username, role = %user.role, "Admin logged in");

        Ok(ValidationOutcome::Valid(user))
    }

    async fn login(
        &self,
        username: &str,
        password: &str,
        source_address: Option<&str>,
    ) -> Result<LoginOutcome, AuthError> {
        let user = match self.validate(username, password, source_address).await? {
            ValidationOutcome::Valid(user) => user,
            ValidationOutcome::Rejected(rejection) => return Ok(LoginOutcome::Rejected(rejection)),
        };

        let issued = self
            .tokens
            .issue(&TokenSubject {
                username: user.username.clone(),
                role: user.role,
                user_id: user.id,
            })
            .map_err(|e| AuthError::Token(e.to_string()))?;

        Ok(LoginOutcome::Success(LoginResult {
            token: issued.token,
            username: user.username,
            role: user.role,
            user_id: user.id,
            expires_at: issued.expires_at,
        }))
    }

    async fn provision_admin(&self, admin: NewAdmin) -> Result<ProvisionOutcome, AuthError> {
        if admin.username.trim().is_empty() {
            return Err(AuthError::Validation("Username is required".to_string()));
        }

        if admin.password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::Validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }

        if self
            .store
            .get_admin_user_by_username(&admin.username)
            .await?
            .is_some()
        {
            return Ok(ProvisionOutcome::AlreadyExists);
        }

        let password_hash = self
            .hasher
            .hash(&admin.password)
            .await
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        let user = self
            .store
            .create_admin_user(NewAdminUser {
                username: admin.username,
                password_hash,
                email: admin.email,
                role: admin.role,
                is_active: true,
            })
            .await?;

        info!(username = %user.username, role = %user.role, "Admin user created");
        Ok(ProvisionOutcome::Created(user))
    }
}
