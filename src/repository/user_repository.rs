use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use crate::{
    domain::{CreateUserRequest, Role, User},
    error::{AppError, Result},
    repository::UserRepository,
};

#[derive(FromRow)]
struct UserRow {
    id: String,
    email: String,
    password_hash: String,
    role: String,
    member_id: Option<String>,
    is_verified: i32,
    login_attempts: i64,
    lock_until: Option<NaiveDateTime>,
    last_login: Option<NaiveDateTime>,
    created_at: NaiveDateTime,
    updated_at: NaiveDateTime,
}

const USER_COLUMNS: &str = "id, email, password_hash, role, member_id, is_verified, \
     login_attempts, lock_until, last_login, created_at, updated_at";

pub struct SqliteUserRepository {
    pool: SqlitePool,
}

impl SqliteUserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn row_to_user(row: UserRow) -> Result<User> {
        Ok(User {
            id: parse_uuid(&row.id)?,
            email: row.email,
            password_hash: row.password_hash,
            role: Role::parse(&row.role)?,
            member_id: row.member_id.as_deref().map(parse_uuid).transpose()?,
            is_verified: row.is_verified != 0,
            login_attempts: row.login_attempts,
            lock_until: row.lock_until.map(to_utc),
            last_login: row.last_login.map(to_utc),
            created_at: to_utc(row.created_at),
            updated_at: to_utc(row.updated_at),
        })
    }
}

fn parse_uuid(s: &str) -> Result<Uuid> {
    Uuid::parse_str(s).map_err(|e| AppError::Database(e.to_string()))
}

fn to_utc(naive: NaiveDateTime) -> DateTime<Utc> {
    DateTime::from_naive_utc_and_offset(naive, Utc)
}

#[async_trait]
impl UserRepository for SqliteUserRepository {
    async fn create(&self, request: CreateUserRequest) -> Result<User> {
        let id = Uuid::new_v4();
        let now = Utc::now().naive_utc();

        sqlx::query(
            r#"
            INSERT INTO users (
                id, email, password_hash, role, member_id, is_verified,
                login_attempts, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?)
            "#,
        )
        .bind(id.to_string())
        .bind(&request.email)
        .bind(&request.password_hash)
        .bind(request.role.as_str())
        .bind(request.member_id.map(|m| m.to_string()))
        .bind(request.is_verified as i32)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::Conflict("Email already in use".to_string())
            }
            _ => AppError::Database(e.to_string()),
        })?;

        self.find_by_id(id)
            .await?
            .ok_or_else(|| AppError::Database("Failed to retrieve created user".to_string()))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = ?",
            USER_COLUMNS
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_user).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE email = ?",
            USER_COLUMNS
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_user).transpose()
    }

    async fn find_by_member(&self, member_id: Uuid) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE member_id = ?",
            USER_COLUMNS
        ))
        .bind(member_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_user).transpose()
    }

    async fn record_failed_attempt(
        &self,
        id: Uuid,
        max_attempts: i64,
        lock_until: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<()> {
        // Single conditional UPDATE: concurrent failures race on the
        // counter, not on stale reads, and an already-locked account is
        // left untouched (the lock window is never extended).
        sqlx::query(
            r#"
            UPDATE users
            SET login_attempts = login_attempts + 1,
                lock_until = CASE
                    WHEN login_attempts + 1 >= ? THEN ?
                    ELSE lock_until
                END,
                updated_at = ?
            WHERE id = ? AND (lock_until IS NULL OR lock_until <= ?)
            "#,
        )
        .bind(max_attempts)
        .bind(lock_until.naive_utc())
        .bind(now.naive_utc())
        .bind(id.to_string())
        .bind(now.naive_utc())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn record_success(&self, id: Uuid, now: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET login_attempts = 0, lock_until = NULL, last_login = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(now.naive_utc())
        .bind(now.naive_utc())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn set_password(
        &self,
        id: Uuid,
        password_hash: String,
        now: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET password_hash = ?, login_attempts = 0, lock_until = NULL,
                reset_token_hash = NULL, reset_token_expires = NULL, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&password_hash)
        .bind(now.naive_utc())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn set_reset_token(
        &self,
        id: Uuid,
        token_hash: String,
        expires: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE users SET reset_token_hash = ?, reset_token_expires = ? WHERE id = ?",
        )
        .bind(&token_hash)
        .bind(expires.naive_utc())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_reset_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE reset_token_hash = ? AND reset_token_expires > ?",
            USER_COLUMNS
        ))
        .bind(token_hash)
        .bind(now.naive_utc())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_user).transpose()
    }

    async fn set_verify_token(
        &self,
        id: Uuid,
        token_hash: String,
        expires: DateTime<Utc>,
    ) -> Result<()> {
        sqlx::query(
            "UPDATE users SET verify_token_hash = ?, verify_token_expires = ? WHERE id = ?",
        )
        .bind(&token_hash)
        .bind(expires.naive_utc())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_by_verify_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE verify_token_hash = ? AND verify_token_expires > ?",
            USER_COLUMNS
        ))
        .bind(token_hash)
        .bind(now.naive_utc())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_user).transpose()
    }

    async fn mark_verified(&self, id: Uuid, now: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users
            SET is_verified = 1, verify_token_hash = NULL, verify_token_expires = NULL,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(now.naive_utc())
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
