use std::sync::Arc;

use crate::config::Config;
use crate::db::{AuthStore, Store};
use crate::services::{
    AuthService, Clock, LedgerAuthService, PasswordHasher, SystemClock, TokenService,
};

/// Services built once at startup and shared by every request.
///
/// Configuration is immutable for the life of the process.
#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    pub store: Store,

    pub tokens: TokenService,

    pub auth: Arc<dyn AuthService>,
}

impl SharedState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock)).await
    }

    pub async fn with_clock(config: Config, clock: Arc<dyn Clock>) -> anyhow::Result<Self> {
        let store = Store::with_pool_options(
            &config.general.database_path,
            config.general.max_db_connections,
            config.general.min_db_connections,
        )
        .await?;

        Self::from_parts(config, store, clock)
    }

    pub fn from_parts(config: Config, store: Store, clock: Arc<dyn Clock>) -> anyhow::Result<Self> {
        let tokens = TokenService::new(&config.token, clock.clone())?;
        let hasher = PasswordHasher::new(&config.security)?;

        let auth = Arc::new(LedgerAuthService::new(
            Arc::new(store.clone()) as Arc<dyn AuthStore>,
            hasher,
            tokens.clone(),
            config.security.auth_throttle.clone(),
            clock,
        )) as Arc<dyn AuthService>;

        Ok(Self {
            config: Arc::new(config),
            store,
            tokens,
            auth,
        })
    }
}
