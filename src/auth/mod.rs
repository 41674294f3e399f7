use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::{
    domain::User,
    error::{AppError, Result},
    repository::UserRepository,
    service::clock::Clock,
};

pub mod lockout;
pub mod tokens;

pub use lockout::LockoutPolicy;
pub use tokens::{AccessClaims, TokenIssuer, REFRESH_COOKIE};

pub struct AuthService {
    users: Arc<dyn UserRepository>,
    issuer: Arc<TokenIssuer>,
    lockout: LockoutPolicy,
    clock: Arc<dyn Clock>,
    skip_email_verification: bool,
}

#[derive(Debug)]
pub struct LoginOutcome {
    pub user: User,
    pub access_token: String,
    pub refresh_token: String,
}

impl AuthService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        issuer: Arc<TokenIssuer>,
        lockout: LockoutPolicy,
        clock: Arc<dyn Clock>,
        skip_email_verification: bool,
    ) -> Self {
        Self {
            users,
            issuer,
            lockout,
            clock,
            skip_email_verification,
        }
    }

    pub fn issuer(&self) -> &TokenIssuer {
        &self.issuer
    }

    pub fn hash_password(password: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        let argon2 = Argon2::default();

        let password_hash = argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        Ok(password_hash.to_string())
    }

    pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
        let parsed_hash = PasswordHash::new(hash)
            .map_err(|e| AppError::Internal(format!("Invalid password hash: {}", e)))?;

        let argon2 = Argon2::default();

        Ok(argon2
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok())
    }

    /// Canonical login ordering: resolve user, check the lock *before*
    /// comparing the password (a locked account never consumes an attempt),
    /// then compare, then check verification, then reset counters and issue
    /// tokens. An unknown email answers the same INVALID_CREDENTIALS a wrong
    /// password does.
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginOutcome> {
        let now = self.clock.now();

        let user = self
            .users
            .find_by_email(email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        if self.lockout.is_locked(&user, now) {
            return Err(AppError::AccountLocked);
        }

        if !Self::verify_password(password, &user.password_hash)? {
            self.users
                .record_failed_attempt(
                    user.id,
                    self.lockout.max_attempts,
                    self.lockout.lock_until(now),
                    now,
                )
                .await?;
            return Err(AppError::InvalidCredentials);
        }

        if !user.is_verified && !self.skip_email_verification {
            return Err(AppError::Forbidden);
        }

        self.users.record_success(user.id, now).await?;

        let user = self
            .users
            .find_by_id(user.id)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let access_token = self.issuer.issue_access(&user)?;
        let refresh_token = self.issuer.issue_refresh(&user)?;

        Ok(LoginOutcome {
            user,
            access_token,
            refresh_token,
        })
    }

    /// Verifies a refresh token, re-resolves the subject and issues a fresh
    /// access token.
    pub async fn refresh(&self, refresh_token: &str) -> Result<(User, String)> {
        let claims = self.issuer.verify_refresh(refresh_token)?;

        let user = self
            .users
            .find_by_id(claims.sub)
            .await?
            .ok_or(AppError::TokenInvalid)?;

        let access_token = self.issuer.issue_access(&user)?;
        Ok((user, access_token))
    }
}

/// Random one-shot token for password reset / email verification links.
/// The caller mails the raw value; only its hash is persisted.
pub fn generate_random_token() -> String {
    use rand::RngCore;
    let mut bytes = [0u8; 20];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

pub fn hash_token(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    hex::encode(digest)
}
