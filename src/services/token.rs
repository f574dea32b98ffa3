//! Stateless bearer tokens.
//!
//! Tokens are HS256 JWTs carrying everything needed to authorize a request,
//! so verification never touches the database. The flip side is that a
//! token stays valid until `exp`; there is no server-side revocation.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::config::{MAX_TOKEN_TTL_SECONDS, TokenConfig};
use crate::models::AdminRole;
use crate::services::clock::Clock;

/// Signed claim set. Field names are part of the wire contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub username: String,
    pub role: String,
    #[serde(rename = "userId")]
    pub user_id: i32,
    /// Issued-at, seconds since the epoch
    pub iat: i64,
    /// Expiry, seconds since the epoch
    pub exp: i64,
}

/// Who a token is being issued for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenSubject {
    pub username: String,
    pub role: AdminRole,
    pub user_id: i32,
}

#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claims: TokenClaims,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: chrono::Duration,
    clock: Arc<dyn Clock>,
}

impl TokenService {
    pub fn new(config: &TokenConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        if config.secret.is_empty() {
            anyhow::bail!("Token secret must not be empty");
        }

        if config.ttl_seconds == 0 || config.ttl_seconds > MAX_TOKEN_TTL_SECONDS {
            anyhow::bail!("Token ttl_seconds must be between 1 and {MAX_TOKEN_TTL_SECONDS}");
        }

        let ttl = i64::try_from(config.ttl_seconds)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .context("Token ttl_seconds is out of range")?;

        Ok(Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            ttl,
            clock,
        })
    }

    pub fn issue(&self, subject: &TokenSubject) -> Result<IssuedToken> {
        let issued_at = self.clock.now();
        let expires_at = issued_at
            .checked_add_signed(self.ttl)
            .context("Token expiry is out of range")?;

        let claims = TokenClaims {
            username: subject.username.clone(),
            role: subject.role.as_str().to_string(),
            user_id: subject.user_id,
            iat: issued_at.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token =
            jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
                .context("Failed to sign token")?;

        Ok(IssuedToken {
            token,
            claims,
            expires_at,
        })
    }

    /// Returns the claims of a token that is correctly signed and not yet
    /// expired, `None` otherwise.
    #[must_use]
    pub fn verify(&self, token: &str) -> Option<TokenClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp"]);
        // Expiry is judged against our clock below.
        validation.validate_exp = false;
        validation.leeway = 0;

        let data = jsonwebtoken::decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map_err(|e| tracing::debug!(error = %e, "Token rejected"))
            .ok()?;

        if self.clock.now().timestamp() >= data.claims.exp {
            tracing::debug!(username = %data.claims.username, "Token expired");
            return None;
        }

        Some(data.claims)
    }

    /// Reads claims without checking signature or expiry. Diagnostics only;
    /// never use the result to authorize anything.
    #[must_use]
    pub fn decode_unverified(token: &str) -> Option<TokenClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.required_spec_claims.clear();

        jsonwebtoken::decode::<TokenClaims>(token, &DecodingKey::from_secret(&[]), &validation)
            .ok()
            .map(|data| data.claims)
    }
}
