use std::sync::Arc;

use chrono::{Duration, Utc};
use sqlx::SqlitePool;

use rollbook::{
    auth::{AuthService, LockoutPolicy, TokenIssuer},
    config::AuthConfig,
    domain::{CreateUserRequest, Role},
    error::AppError,
    repository::{SqliteUserRepository, UserRepository},
    service::{Clock, FixedClock},
};

fn auth_config() -> AuthConfig {
    AuthConfig {
        jwt_secret: "test-access-secret".to_string(),
        jwt_refresh_secret: "test-refresh-secret".to_string(),
        access_token_secs: 3600,
        refresh_token_secs: 604_800,
        max_login_attempts: 5,
        lock_duration_secs: 300,
        skip_email_verification: false,
    }
}

struct Fixture {
    users: Arc<SqliteUserRepository>,
    auth: AuthService,
    clock: Arc<FixedClock>,
}

async fn setup() -> anyhow::Result<Fixture> {
    let pool = SqlitePool::connect(":memory:").await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let users = Arc::new(SqliteUserRepository::new(pool));
    // Pinned to the real start time: lockout windows move by setting the
    // clock, while token exp stays meaningful to the JWT validator.
    let clock = Arc::new(FixedClock::new(Utc::now()));
    let config = auth_config();
    let issuer = Arc::new(TokenIssuer::new(&config, clock.clone()));
    let auth = AuthService::new(
        users.clone(),
        issuer,
        LockoutPolicy::from_config(&config),
        clock.clone(),
        false,
    );

    users
        .create(CreateUserRequest {
            email: "member@example.com".to_string(),
            password_hash: AuthService::hash_password("correct horse")?,
            role: Role::Member,
            member_id: None,
            is_verified: true,
        })
        .await?;

    Ok(Fixture { users, auth, clock })
}

#[tokio::test]
async fn login_succeeds_and_issues_tokens() -> anyhow::Result<()> {
    let fx = setup().await?;

    let outcome = fx.auth.login("member@example.com", "correct horse").await?;
    assert!(!outcome.access_token.is_empty());
    assert!(!outcome.refresh_token.is_empty());
    assert!(outcome.user.last_login.is_some());

    let claims = fx.auth.issuer().verify_access(&outcome.access_token)?;
    assert_eq!(claims.sub, outcome.user.id);
    assert_eq!(claims.email, "member@example.com");

    Ok(())
}

#[tokio::test]
async fn unknown_email_answers_invalid_credentials() -> anyhow::Result<()> {
    let fx = setup().await?;

    let err = fx
        .auth
        .login("nobody@example.com", "whatever")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidCredentials));

    Ok(())
}

#[tokio::test]
async fn fifth_failure_locks_the_account() -> anyhow::Result<()> {
    let fx = setup().await?;

    for _ in 0..4 {
        let err = fx
            .auth
            .login("member@example.com", "wrong")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));
    }

    // Four failures: counter moved but no lock yet.
    let user = fx.users.find_by_email("member@example.com").await?.unwrap();
    assert_eq!(user.login_attempts, 4);
    assert!(user.lock_until.is_none());

    let err = fx
        .auth
        .login("member@example.com", "wrong")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidCredentials));

    // Fifth failure set the lock; even the right password is refused now.
    let err = fx
        .auth
        .login("member@example.com", "correct horse")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AccountLocked));

    Ok(())
}

#[tokio::test]
async fn failures_while_locked_do_not_extend_the_lock() -> anyhow::Result<()> {
    let fx = setup().await?;

    for _ in 0..5 {
        let _ = fx.auth.login("member@example.com", "wrong").await;
    }
    let locked = fx.users.find_by_email("member@example.com").await?.unwrap();
    let lock_until = locked.lock_until.expect("account should be locked");

    // Two minutes in, another attempt answers AccountLocked without
    // touching the counter or the window.
    fx.clock.set(fx.clock.now() + Duration::minutes(2));
    let err = fx
        .auth
        .login("member@example.com", "wrong")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::AccountLocked));

    let after = fx.users.find_by_email("member@example.com").await?.unwrap();
    assert_eq!(after.lock_until, Some(lock_until));
    assert_eq!(after.login_attempts, locked.login_attempts);

    Ok(())
}

#[tokio::test]
async fn lock_expires_and_success_resets_the_counter() -> anyhow::Result<()> {
    let fx = setup().await?;

    for _ in 0..5 {
        let _ = fx.auth.login("member@example.com", "wrong").await;
    }

    fx.clock.set(fx.clock.now() + Duration::minutes(6));
    let outcome = fx.auth.login("member@example.com", "correct horse").await?;
    assert_eq!(outcome.user.login_attempts, 0);
    assert!(outcome.user.lock_until.is_none());

    Ok(())
}

#[tokio::test]
async fn unverified_user_cannot_login() -> anyhow::Result<()> {
    let fx = setup().await?;

    fx.users
        .create(CreateUserRequest {
            email: "new@example.com".to_string(),
            password_hash: AuthService::hash_password("some password")?,
            role: Role::Member,
            member_id: None,
            is_verified: false,
        })
        .await?;

    let err = fx
        .auth
        .login("new@example.com", "some password")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    Ok(())
}

#[tokio::test]
async fn refresh_issues_a_new_access_token() -> anyhow::Result<()> {
    let fx = setup().await?;

    let outcome = fx.auth.login("member@example.com", "correct horse").await?;
    let (user, access) = fx.auth.refresh(&outcome.refresh_token).await?;
    assert_eq!(user.id, outcome.user.id);

    let claims = fx.auth.issuer().verify_access(&access)?;
    assert_eq!(claims.sub, user.id);

    Ok(())
}

#[tokio::test]
async fn garbage_token_is_rejected_as_invalid() -> anyhow::Result<()> {
    let fx = setup().await?;

    let err = fx
        .auth
        .issuer()
        .verify_access("not.a.token")
        .unwrap_err();
    assert!(matches!(err, AppError::TokenInvalid));

    Ok(())
}

#[tokio::test]
async fn expired_access_token_is_rejected() -> anyhow::Result<()> {
    let fx = setup().await?;

    // Issue from two hours in the past so the 1h token is already stale.
    fx.clock.set(Utc::now() - Duration::hours(2));
    let outcome = fx.auth.login("member@example.com", "correct horse").await?;

    let err = fx
        .auth
        .issuer()
        .verify_access(&outcome.access_token)
        .unwrap_err();
    assert!(matches!(err, AppError::TokenExpired));

    Ok(())
}
