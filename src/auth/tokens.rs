use chrono::Duration;
use cookie::{Cookie, SameSite};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    config::AuthConfig,
    domain::{Role, User},
    error::{AppError, Result},
    service::clock::Clock,
};

pub const REFRESH_COOKIE: &str = "refresh_token";

/// Claims carried by a short-lived access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Refresh tokens carry the subject only; everything else is re-resolved
/// on refresh.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: Uuid,
    pub iat: i64,
    pub exp: i64,
}

/// Issues and validates stateless JWTs. There is no server-side revocation
/// list: logout only clears the client-held cookie, so a token issued
/// before logout stays valid until its natural expiry. Deliberate tradeoff,
/// kept simple on purpose.
pub struct TokenIssuer {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(config.jwt_refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(config.jwt_refresh_secret.as_bytes()),
            access_ttl: Duration::seconds(config.access_token_secs),
            refresh_ttl: Duration::seconds(config.refresh_token_secs),
            clock,
        }
    }

    pub fn access_ttl_secs(&self) -> i64 {
        self.access_ttl.num_seconds()
    }

    pub fn issue_access(&self, user: &User) -> Result<String> {
        let now = self.clock.now();
        let claims = AccessClaims {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            iat: now.timestamp(),
            exp: (now + self.access_ttl).timestamp(),
        };

        encode(&Header::default(), &claims, &self.access_encoding)
            .map_err(|e| AppError::Internal(format!("Failed to sign access token: {}", e)))
    }

    pub fn issue_refresh(&self, user: &User) -> Result<String> {
        let now = self.clock.now();
        let claims = RefreshClaims {
            sub: user.id,
            iat: now.timestamp(),
            exp: (now + self.refresh_ttl).timestamp(),
        };

        encode(&Header::default(), &claims, &self.refresh_encoding)
            .map_err(|e| AppError::Internal(format!("Failed to sign refresh token: {}", e)))
    }

    pub fn verify_access(&self, token: &str) -> Result<AccessClaims> {
        decode::<AccessClaims>(token, &self.access_decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(map_jwt_error)
    }

    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims> {
        decode::<RefreshClaims>(token, &self.refresh_decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(map_jwt_error)
    }

    /// Refresh tokens travel only in an HTTP-only, SameSite=Strict cookie,
    /// never in a JSON body.
    pub fn refresh_cookie(&self, token: &str, secure: bool) -> Cookie<'static> {
        Cookie::build((REFRESH_COOKIE, token.to_string()))
            .path("/auth")
            .same_site(SameSite::Strict)
            .http_only(true)
            .secure(secure)
            .max_age(cookie::time::Duration::seconds(
                self.refresh_ttl.num_seconds(),
            ))
            .build()
    }

    pub fn clear_refresh_cookie() -> Cookie<'static> {
        Cookie::build((REFRESH_COOKIE, ""))
            .path("/auth")
            .same_site(SameSite::Strict)
            .http_only(true)
            .max_age(cookie::time::Duration::seconds(0))
            .build()
    }
}

fn map_jwt_error(err: jsonwebtoken::errors::Error) -> AppError {
    match err.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AppError::TokenExpired,
        _ => AppError::TokenInvalid,
    }
}
