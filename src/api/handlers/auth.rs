use axum::{
    extract::{Extension, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::CookieJar;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use validator::Validate;

use crate::{
    api::{middleware::auth::CurrentUser, state::AppState},
    auth::{self, TokenIssuer, REFRESH_COOKIE},
    domain::{CreateUserRequest, Role, User},
    error::{AppError, Result},
    notify::EmailMessage,
};

const VERIFY_TOKEN_HOURS: i64 = 24;
const RESET_TOKEN_HOURS: i64 = 1;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: i64,
    pub user: User,
}

fn secure_cookies(state: &AppState) -> bool {
    state.settings.server.base_url.starts_with("https://")
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<User>)> {
    req.validate()?;

    let ctx = &state.service_context;

    if ctx.user_repo.find_by_email(&req.email).await?.is_some() {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }

    // An existing member record with the same email gets linked up front.
    let member_id = ctx
        .member_repo
        .find_by_email(&req.email)
        .await?
        .map(|m| m.id);

    let skip_verification = state.settings.auth.skip_email_verification;
    let password_hash = auth::AuthService::hash_password(&req.password)?;

    let user = ctx
        .user_repo
        .create(CreateUserRequest {
            email: req.email,
            password_hash,
            role: Role::Member,
            member_id,
            is_verified: skip_verification,
        })
        .await?;

    if !skip_verification {
        send_verification_email(&state, &user).await?;
    }

    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<(CookieJar, Json<TokenResponse>)> {
    let outcome = state
        .service_context
        .auth_service
        .login(&req.email, &req.password)
        .await?;

    let issuer = state.service_context.auth_service.issuer();
    let cookie = issuer.refresh_cookie(&outcome.refresh_token, secure_cookies(&state));

    Ok((
        jar.add(cookie),
        Json(TokenResponse {
            access_token: outcome.access_token,
            token_type: "Bearer",
            expires_in: issuer.access_ttl_secs(),
            user: outcome.user,
        }),
    ))
}

/// Issues a fresh access token from the refresh cookie. The refresh token
/// never appears in a body, only in the HTTP-only cookie.
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
) -> Result<Json<TokenResponse>> {
    let token = jar
        .get(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or(AppError::Unauthorized)?;

    let (user, access_token) = state.service_context.auth_service.refresh(&token).await?;

    Ok(Json(TokenResponse {
        access_token,
        token_type: "Bearer",
        expires_in: state.service_context.auth_service.issuer().access_ttl_secs(),
        user,
    }))
}

/// Tokens are stateless, so logout only clears the client's refresh cookie;
/// an access token issued before logout stays valid until it expires.
pub async fn logout(jar: CookieJar) -> Result<(CookieJar, StatusCode)> {
    let jar = jar.add(TokenIssuer::clear_refresh_cookie());
    Ok((jar, StatusCode::NO_CONTENT))
}

pub async fn me(Extension(current): Extension<CurrentUser>) -> Json<User> {
    Json(current.user)
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// Always answers 200 with the same message so the endpoint cannot be used
/// to probe which emails have accounts.
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(req): Json<ForgotPasswordRequest>,
) -> Result<Json<serde_json::Value>> {
    if let Some(user) = state
        .service_context
        .user_repo
        .find_by_email(&req.email)
        .await?
    {
        let token = auth::generate_random_token();
        let expires = Utc::now() + Duration::hours(RESET_TOKEN_HOURS);

        state
            .service_context
            .user_repo
            .set_reset_token(user.id, auth::hash_token(&token), expires)
            .await?;

        let link = format!(
            "{}/reset-password?token={}",
            state.settings.server.client_url, token
        );
        let message = EmailMessage {
            to: user.email.clone(),
            subject: "Reset your password".to_string(),
            html: format!(
                "<p>A password reset was requested for your account.</p>\
                 <p><a href=\"{}\">Reset password</a> (the link expires in {} hour).</p>\
                 <p>If you did not request this, ignore this email.</p>",
                link, RESET_TOKEN_HOURS,
            ),
        };

        if let Err(e) = state.service_context.notifier.send(message).await {
            tracing::warn!(user_id = %user.id, "Password reset email failed: {}", e);
        }
    }

    Ok(Json(json!({
        "message": "If that email has an account, a reset link has been sent"
    })))
}

#[derive(Debug, Deserialize, Validate)]
pub struct ResetPasswordRequest {
    pub token: String,
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

pub async fn reset_password(
    State(state): State<AppState>,
    Json(req): Json<ResetPasswordRequest>,
) -> Result<Json<serde_json::Value>> {
    req.validate()?;

    let now = Utc::now();
    let user = state
        .service_context
        .user_repo
        .find_by_reset_token(&auth::hash_token(&req.token), now)
        .await?
        .ok_or_else(|| AppError::BadRequest("Invalid or expired reset token".to_string()))?;

    let password_hash = auth::AuthService::hash_password(&req.password)?;
    state
        .service_context
        .user_repo
        .set_password(user.id, password_hash, now)
        .await?;

    Ok(Json(json!({ "message": "Password updated" })))
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailParams {
    pub token: String,
}

pub async fn verify_email(
    State(state): State<AppState>,
    Query(params): Query<VerifyEmailParams>,
) -> Result<Json<serde_json::Value>> {
    let now = Utc::now();
    let user = state
        .service_context
        .user_repo
        .find_by_verify_token(&auth::hash_token(&params.token), now)
        .await?
        .ok_or_else(|| {
            AppError::BadRequest("Invalid or expired verification token".to_string())
        })?;

    state.service_context.user_repo.mark_verified(user.id, now).await?;

    Ok(Json(json!({ "message": "Email verified" })))
}

#[derive(Debug, Deserialize)]
pub struct ResendVerificationRequest {
    pub email: String,
}

pub async fn resend_verification(
    State(state): State<AppState>,
    Json(req): Json<ResendVerificationRequest>,
) -> Result<Json<serde_json::Value>> {
    if let Some(user) = state
        .service_context
        .user_repo
        .find_by_email(&req.email)
        .await?
    {
        if !user.is_verified {
            send_verification_email(&state, &user).await?;
        }
    }

    Ok(Json(json!({
        "message": "If that email has an unverified account, a new link has been sent"
    })))
}

async fn send_verification_email(state: &AppState, user: &User) -> Result<()> {
    let token = auth::generate_random_token();
    let expires = Utc::now() + Duration::hours(VERIFY_TOKEN_HOURS);

    state
        .service_context
        .user_repo
        .set_verify_token(user.id, auth::hash_token(&token), expires)
        .await?;

    let link = format!(
        "{}/verify-email?token={}",
        state.settings.server.client_url, token
    );
    let message = EmailMessage {
        to: user.email.clone(),
        subject: "Verify your email".to_string(),
        html: format!(
            "<p>Welcome! Please <a href=\"{}\">verify your email address</a> to \
             activate your account. The link expires in {} hours.</p>",
            link, VERIFY_TOKEN_HOURS,
        ),
    };

    if let Err(e) = state.service_context.notifier.send(message).await {
        tracing::warn!(user_id = %user.id, "Verification email failed: {}", e);
    }

    Ok(())
}
