use axum::{
    Extension, Json,
    extract::{ConnectInfo, FromRequestParts, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, MessageResponse};
use crate::models::AdminRole;
use crate::services::{LoginOutcome, LoginResult, TokenService};

pub const AUTHENTICATION_REQUIRED_MESSAGE: &str = "Authentication required";
pub const INVALID_TOKEN_MESSAGE: &str = "Invalid or expired token";

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

pub type LoginResponse = LoginResult;

/// Identity resolved from a verified bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedAdmin {
    pub username: String,
    pub role: AdminRole,
    pub user_id: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateRejection {
    MissingToken,
    InvalidToken,
}

impl GateRejection {
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::MissingToken => AUTHENTICATION_REQUIRED_MESSAGE,
            Self::InvalidToken => INVALID_TOKEN_MESSAGE,
        }
    }
}

impl IntoResponse for GateRejection {
    fn into_response(self) -> Response {
        ApiError::unauthorized(self.message()).into_response()
    }
}

/// Client address for the login ledger.
///
/// The socket peer, unless the peer is a trusted proxy, in which case the
/// left-most `X-Forwarded-For` entry wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientAddr(pub Option<IpAddr>);

impl FromRequestParts<Arc<AppState>> for ClientAddr {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip());

        Ok(Self(resolve_client_ip(
            peer,
            &parts.headers,
            &state.config().security.auth_throttle.trusted_proxy_ips,
        )))
    }
}

fn resolve_client_ip(
    peer: Option<IpAddr>,
    headers: &HeaderMap,
    trusted_proxies: &[String],
) -> Option<IpAddr> {
    let peer_is_trusted = peer.is_some_and(|ip| {
        trusted_proxies
            .iter()
            .any(|p| p.trim().parse::<IpAddr>().is_ok_and(|proxy| proxy == ip))
    });

    if peer_is_trusted
        && let Some(forwarded) = headers
            .get("x-forwarded-for")
            .and_then(|h| h.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|first| first.trim().parse::<IpAddr>().ok())
    {
        return Some(forwarded);
    }

    peer
}

// ============================================================================
// Gate
// ============================================================================

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Decides whether a request may proceed. Only the token is consulted; the
/// store is never touched.
pub fn authorize(
    headers: &HeaderMap,
    tokens: &TokenService,
) -> Result<AuthenticatedAdmin, GateRejection> {
    let token = bearer_token(headers).ok_or(GateRejection::MissingToken)?;
    let claims = tokens.verify(token).ok_or(GateRejection::InvalidToken)?;
    let role = claims
        .role
        .parse::<AdminRole>()
        .map_err(|_| GateRejection::InvalidToken)?;

    Ok(AuthenticatedAdmin {
        username: claims.username,
        role,
        user_id: claims.user_id,
    })
}

/// Middleware for admin-only routes. On success the resolved
/// [`AuthenticatedAdmin`] is available to handlers as an extension.
pub async fn require_admin(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, GateRejection> {
    let admin = authorize(request.headers(), state.tokens()).inspect_err(|rejection| {
        let claimed = bearer_token(request.headers())
            .and_then(TokenService::decode_unverified)
            .map(|claims| claims.username);
        tracing::debug!(
            path = %request.uri().path(),
            reason = rejection.message(),
            claimed_username = claimed.as_deref(),
            "Request gate refused"
        );
    })?;

    tracing::Span::current().record("user_id", admin.username.as_str());
    request.extensions_mut().insert(admin);

    Ok(next.run(request).await)
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/login
/// Authenticate with username and password, returns a bearer token on success
pub async fn login(
    State(state): State<Arc<AppState>>,
    ClientAddr(client): ClientAddr,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, ApiError> {
    if payload.username.is_empty() {
        return Err(ApiError::validation("Username is required"));
    }
    if payload.password.is_empty() {
        return Err(ApiError::validation("Password is required"));
    }

    let source = client.map(|ip| ip.to_string());

    match state
        .auth()
        .login(&payload.username, &payload.password, source.as_deref())
        .await?
    {
        LoginOutcome::Success(result) => Ok(Json(ApiResponse::success(result))),
        LoginOutcome::Rejected(rejection) => Err(ApiError::unauthorized(rejection.message())),
    }
}

/// POST /auth/logout
/// Tokens are stateless; the client discards its copy
pub async fn logout(Extension(admin): Extension<AuthenticatedAdmin>) -> impl IntoResponse {
    tracing::info!(username = %admin.username, "Admin logged out");

    Json(ApiResponse::success(MessageResponse {
        message: "Logged out".to_string(),
    }))
}

/// GET /auth/me
pub async fn me(
    Extension(admin): Extension<AuthenticatedAdmin>,
) -> Json<ApiResponse<AuthenticatedAdmin>> {
    Json(ApiResponse::success(admin))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TokenConfig;
    use crate::services::{ManualClock, TokenSubject};
    use axum::http::HeaderValue;
    use chrono::{TimeZone, Utc};

    fn tokens() -> (TokenService, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap(),
        ));
        let tokens = TokenService::new(
            &TokenConfig {
                secret: "gate-secret-gate-secret-gate-secret".to_string(),
                ttl_seconds: 3600,
            },
            clock.clone(),
        )
        .unwrap();
        (tokens, clock)
    }

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn missing_or_malformed_header_requires_authentication() {
        let (tokens, _) = tokens();

        assert_eq!(
            authorize(&HeaderMap::new(), &tokens),
            Err(GateRejection::MissingToken)
        );
        assert_eq!(
            authorize(&headers_with("Basic YWxpY2U6c2VjcmV0"), &tokens),
            Err(GateRejection::MissingToken)
        );
        assert_eq!(
            authorize(&headers_with("Bearer "), &tokens),
            Err(GateRejection::MissingToken)
        );
    }

    #[test]
    fn valid_token_resolves_identity() {
        let (tokens, _) = tokens();
        let issued = tokens
            .issue(&TokenSubject {
                username: "alice".to_string(),
                role: AdminRole::Editor,
                user_id: 4,
            })
            .unwrap();

        let admin = authorize(&headers_with(&format!("Bearer {}", issued.token)), &tokens).unwrap();
        assert_eq!(
            admin,
            AuthenticatedAdmin {
                username: "alice".to_string(),
                role: AdminRole::Editor,
                user_id: 4,
            }
        );

        // scheme is case-insensitive
        assert!(authorize(&headers_with(&format!("bearer {}", issued.token)), &tokens).is_ok());
    }

    #[test]
    fn expired_or_garbage_token_is_invalid() {
        let (tokens, clock) = tokens();
        let issued = tokens
            .issue(&TokenSubject {
                username: "alice".to_string(),
                role: AdminRole::Admin,
                user_id: 1,
            })
            .unwrap();

        assert_eq!(
            authorize(&headers_with("Bearer not-a-token"), &tokens),
            Err(GateRejection::InvalidToken)
        );

        clock.advance(chrono::Duration::hours(1));
        assert_eq!(
            authorize(&headers_with(&format!("Bearer {}", issued.token)), &tokens),
            Err(GateRejection::InvalidToken)
        );
    }

    #[test]
    fn rejection_messages() {
        assert_eq!(GateRejection::MissingToken.message(), "Authentication required");
        assert_eq!(GateRejection::InvalidToken.message(), "Invalid or expired token");
    }

    #[test]
    fn forwarded_for_only_honoured_from_trusted_proxies() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.9, 10.0.0.2"),
        );
        let proxy: IpAddr = "10.0.0.1".parse().unwrap();
        let stranger: IpAddr = "198.51.100.3".parse().unwrap();
        let trusted = vec!["10.0.0.1".to_string()];

        assert_eq!(
            resolve_client_ip(Some(proxy), &headers, &trusted),
            Some("203.0.113.9".parse().unwrap())
        );
        assert_eq!(
            resolve_client_ip(Some(stranger), &headers, &trusted),
            Some(stranger)
        );
        assert_eq!(
            resolve_client_ip(Some(proxy), &HeaderMap::new(), &trusted),
            Some(proxy)
        );
        assert_eq!(resolve_client_ip(None, &headers, &trusted), None);
    }
}
