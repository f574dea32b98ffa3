//! Argon2id password hashing.
//!
//! Both operations are CPU-bound and run on the blocking pool so
//! they never stall the async runtime.

use anyhow::{Context, Result};
use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{
        PasswordHash, PasswordHasher as _, PasswordVerifier, SaltString, rand_core::OsRng,
    },
};
use tokio::task;
use tracing::warn;

use crate::config::SecurityConfig;

#[derive(Debug, Clone)]
pub struct PasswordHasher {
    params: Params,
}

impl PasswordHasher {
    pub fn new(config: &SecurityConfig) -> Result<Self> {
        let params = Params::new(
            config.argon2_memory_cost_kib,
            config.argon2_time_cost,
            config.argon2_parallelism,
            None, // output length (use default)
        )
        .map_err(|e| anyhow::anyhow!("Invalid Argon2 params: {e}"))?;

        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }

    /// Hashes `plaintext` with a fresh random salt into a PHC string.
    pub async fn hash(&self, plaintext: &str) -> Result<String> {
        let argon2 = self.argon2();
        let password = plaintext.to_string();

        task::spawn_blocking(move || {
            let salt = SaltString::generate(&mut OsRng);
            argon2
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|e| anyhow::anyhow!("Failed to hash password: {e}"))
        })
        .await
        .context("Password hashing task panicked")?
    }

    /// Checks `plaintext` against a stored PHC string.
    ///
    /// The cost parameters come from the stored hash, not from `self`, so
    /// hashes made under older settings keep verifying. Malformed hashes
    /// yield `false`.
    pub async fn verify(&self, plaintext: &str, hash: &str) -> bool {
        let password = plaintext.to_string();
        let hash = hash.to_string();

        let outcome = task::spawn_blocking(move || {
            let parsed = PasswordHash::new(&hash).map_err(|e| e.to_string())?;
            Ok::<bool, String>(
                Argon2::default()
                    .verify_password(password.as_bytes(), &parsed)
                    .is_ok(),
            )
        })
        .await;

        match outcome {
            Ok(Ok(valid)) => valid,
            Ok(Err(e)) => {
                warn!(error = %e, "Stored password hash is malformed");
                false
            }
            Err(e) => {
                warn!(error = %e, "Password verification task failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_hasher() -> PasswordHasher {
        PasswordHasher::new(&SecurityConfig {
            argon2_memory_cost_kib: 1024,
            argon2_time_cost: 1,
            ..SecurityConfig::default()
        })
        .unwrap()
    }

    #[tokio::test]
    async fn hash_then_verify_round_trips() {
        let hasher = fast_hasher();
        let long = "x".repeat(1024);

        for password in ["Secret123", "", "pässwörd-日本語-🔐", long.as_str()] {
            let hash = hasher.hash(password).await.unwrap();
            assert!(hash.starts_with("$argon2id$"));
            assert!(hasher.verify(password, &hash).await, "{password:?}");
        }
    }

    #[tokio::test]
    async fn single_character_difference_fails() {
        let hasher = fast_hasher();
        let hash = hasher.hash("Secret123").await.unwrap();

        assert!(!hasher.verify("Secret124", &hash).await);
        assert!(!hasher.verify("secret123", &hash).await);
        assert!(!hasher.verify("Secret123 ", &hash).await);
    }

    #[tokio::test]
    async fn salts_differ_between_hashes() {
        let hasher = fast_hasher();
        let a = hasher.hash("same").await.unwrap();
        let b = hasher.hash("same").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn malformed_hash_is_rejected_not_an_error() {
        let hasher = fast_hasher();
        assert!(!hasher.verify("anything", "not-a-phc-string").await);
        assert!(!hasher.verify("anything", "").await);
    }

    #[test]
    fn invalid_params_are_rejected() {
        let config = SecurityConfig {
            argon2_time_cost: 0,
            ..SecurityConfig::default()
        };
        assert!(PasswordHasher::new(&config).is_err());
    }
}
