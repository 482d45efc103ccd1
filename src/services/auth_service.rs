use axum::http::{header, HeaderMap, StatusCode};
use jsonwebtoken::{decode, Algorithm, DecodingKey, TokenData, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::config::Config;
use crate::ws::presence::normalize_display_name;
use crate::ws::session::UserIdentity;

/// Claims carried by a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub username: String,
    pub exp: usize,
    #[serde(default)]
    pub roles: Vec<String>,
}

/// Verified caller, inserted into request extensions by the auth middleware.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: String,
    pub username: String,
    pub roles: Vec<String>,
}

impl AuthUser {
    pub fn identity(&self) -> UserIdentity {
        UserIdentity {
            user_id: self.id.clone(),
            username: self.username.clone(),
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing Authorization header or auth cookie")]
    MissingToken,
    #[error("invalid {0} header")]
    InvalidHeader(&'static str),
    #[error("JWT validation failed: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
    #[error("no JWT secret configured")]
    SecretNotConfigured,
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::SecretNotConfigured => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::UNAUTHORIZED,
        }
    }
}

/// Get the auth token from request headers: bearer header first, then the
/// auth cookie.
pub fn get_auth_token(headers: &HeaderMap, cookie_name: &str) -> Result<String, AuthError> {
    // 1. Try to get token from Authorization header
    if let Some(auth_header) = headers.get(header::AUTHORIZATION) {
        let auth_str = auth_header
            .to_str()
            .map_err(|_| AuthError::InvalidHeader("Authorization"))?;
        return Ok(auth_str
            .strip_prefix("Bearer ")
            .unwrap_or(auth_str)
            .to_string());
    }

    // 2. Try to get token from cookies
    let cookie_header = headers
        .get(header::COOKIE)
        .ok_or(AuthError::MissingToken)?
        .to_str()
        .map_err(|_| AuthError::InvalidHeader("Cookie"))?;

    cookie::Cookie::split_parse(cookie_header)
        .flatten()
        .find(|c| c.name() == cookie_name)
        .map(|c| c.value().to_string())
        .ok_or(AuthError::MissingToken)
}

// Validate a JWT token and return the token data
pub fn validate_jwt(token: &str, secret: &str) -> Result<TokenData<SessionClaims>, jsonwebtoken::errors::Error> {
    let validation = Validation::new(Algorithm::HS256);
    let decoding_key = DecodingKey::from_secret(secret.as_bytes());
    decode::<SessionClaims>(token, &decoding_key, &validation)
}

/// Resolve the caller of a request. `fallback_token` is consulted when the
/// headers carry none (WebSocket upgrades from browsers).
pub fn authenticate(
    headers: &HeaderMap,
    fallback_token: Option<&str>,
    config: &Config,
) -> Result<AuthUser, AuthError> {
    let secret = config
        .auth_jwt_secret
        .as_deref()
        .ok_or(AuthError::SecretNotConfigured)?;

    let token = match get_auth_token(headers, &config.auth_cookie_name) {
        Ok(token) => token,
        Err(AuthError::MissingToken) => fallback_token
            .map(str::to_string)
            .ok_or(AuthError::MissingToken)?,
        Err(e) => return Err(e),
    };

    let claims = validate_jwt(&token, secret)?.claims;
    info!("JWT token validated successfully for user: {}", claims.sub);

    Ok(AuthUser {
        id: claims.sub,
        username: normalize_display_name(&claims.username),
        roles: claims.roles,
    })
}

#[cfg(test)]
pub(crate) mod testing {
    use super::SessionClaims;
    use jsonwebtoken::{encode, EncodingKey, Header};

    pub const SECRET: &str = "test-secret";

    pub fn mint_token(user_id: &str, username: &str, roles: &[&str]) -> String {
        let claims = SessionClaims {
            sub: user_id.to_string(),
            username: username.to_string(),
            exp: (chrono::Utc::now().timestamp() + 3600) as usize,
            roles: roles.iter().map(|r| r.to_string()).collect(),
        };
        encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap()
    }
}
