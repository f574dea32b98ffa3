//! Login attempt ledger backing the lockout decision.
//!
//! Attempts are keyed on the submitted username string rather than an
//! account id, so probing unknown usernames accrues lockout pressure the
//! same way as probing real ones. The failure count is recomputed over a
//! trailing window on every check; nothing needs cleaning up for a lockout
//! to lapse.

use anyhow::Result;
use std::sync::Arc;

use crate::db::AuthStore;
use crate::models::{LoginAttempt, NewLoginAttempt};
use crate::services::clock::Clock;

#[derive(Clone)]
pub struct LoginAttemptLedger {
    store: Arc<dyn AuthStore>,
    clock: Arc<dyn Clock>,
}

impl LoginAttemptLedger {
    pub fn new(store: Arc<dyn AuthStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Appends one attempt stamped with the current time.
    pub async fn record(
        &self,
        username: &str,
        source_address: Option<&str>,
        successful: bool,
    ) -> Result<LoginAttempt> {
        self.store
            .record_login_attempt(NewLoginAttempt {
                username: username.to_string(),
                ip_address: source_address.map(str::to_string),
                successful,
                attempted_at: self.clock.now(),
            })
            .await
    }

    /// Failed attempts for `username` in `[now - window, now]`.
    pub async fn count_recent_failures(
        &self,
        username: &str,
        window: chrono::Duration,
    ) -> Result<u32> {
        let now = self.clock.now();
        let attempts = self
            .store
            .get_recent_login_attempts(username, now - window)
            .await?;

        let failures = attempts
            .iter()
            .filter(|a| !a.successful && a.attempted_at <= now)
            .count();

        Ok(u32::try_from(failures).unwrap_or(u32::MAX))
    }
}
