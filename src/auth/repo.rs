use anyhow::Context;
use async_trait::async_trait;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::auth::repo_types::{NewUser, ProfileUpdate, Role, Status, User};

const USER_COLUMNS: &str = "id, name, email, password_hash, role, status, is_verified, \
    verification_token, reset_password_token, reset_password_expires, \
    monthly_salary, expected_savings, salary_deposit_day, created_at";

#[derive(Debug, Error)]
pub enum CreateUserError {
    #[error("email already exists")]
    DuplicateEmail,
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Persistence for user credentials, roles and account tokens.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn create(&self, user: NewUser) -> Result<User, CreateUserError>;
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>>;

    /// Marks the owner of `token` verified and clears the token in one write.
    /// Returns the user id, or `None` when no user holds the token.
    async fn consume_verification_token(&self, token: &str) -> anyhow::Result<Option<Uuid>>;

    /// Replaces any pending reset token.
    async fn set_reset_token(&self, id: Uuid, token: &str, expires_ms: i64) -> anyhow::Result<u64>;

    /// User holding `token` with an expiry strictly after `now_ms`.
    async fn find_by_reset_token(&self, token: &str, now_ms: i64) -> anyhow::Result<Option<User>>;

    /// Stores the new hash and clears the reset token, only while `token` is still the pending one.
    async fn complete_password_reset(
        &self,
        id: Uuid,
        token: &str,
        password_hash: &str,
    ) -> anyhow::Result<u64>;

    async fn list(&self) -> anyhow::Result<Vec<User>>;
    async fn update_role_status(&self, id: Uuid, role: Role, status: Status) -> anyhow::Result<u64>;
    async fn update_profile(&self, id: Uuid, profile: ProfileUpdate) -> anyhow::Result<Option<User>>;
}

#[derive(Clone)]
pub struct PgCredentialStore {
    db: PgPool,
}

impl PgCredentialStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn create(&self, user: NewUser) -> Result<User, CreateUserError> {
        let sql = format!(
            r#"
            INSERT INTO users (name, email, password_hash, role, is_verified, verification_token)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {USER_COLUMNS}
            "#
        );
        let res = sqlx::query_as::<_, User>(&sql)
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role)
            .bind(user.is_verified)
            .bind(&user.verification_token)
            .fetch_one(&self.db)
            .await;
        match res {
            Ok(u) => Ok(u),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
                Err(CreateUserError::DuplicateEmail)
            }
            Err(e) => Err(anyhow::Error::new(e).context("insert user").into()),
        }
    }

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("find user by id")?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.db)
            .await
            .context("find user by email")?;
        Ok(user)
    }

    async fn consume_verification_token(&self, token: &str) -> anyhow::Result<Option<Uuid>> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE users
               SET is_verified = TRUE, verification_token = NULL
             WHERE verification_token = $1
            RETURNING id
            "#,
        )
        .bind(token)
        .fetch_optional(&self.db)
        .await
        .context("consume verification token")?;
        Ok(id)
    }

    async fn set_reset_token(&self, id: Uuid, token: &str, expires_ms: i64) -> anyhow::Result<u64> {
        let res = sqlx::query(
            r#"
            UPDATE users
               SET reset_password_token = $1, reset_password_expires = $2
             WHERE id = $3
            "#,
        )
        .bind(token)
        .bind(expires_ms)
        .bind(id)
        .execute(&self.db)
        .await
        .context("set reset token")?;
        Ok(res.rows_affected())
    }

    async fn find_by_reset_token(&self, token: &str, now_ms: i64) -> anyhow::Result<Option<User>> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM users \
             WHERE reset_password_token = $1 AND reset_password_expires > $2"
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(token)
            .bind(now_ms)
            .fetch_optional(&self.db)
            .await
            .context("find user by reset token")?;
        Ok(user)
    }

    async fn complete_password_reset(
        &self,
        id: Uuid,
        token: &str,
        password_hash: &str,
    ) -> anyhow::Result<u64> {
        let res = sqlx::query(
            r#"
            UPDATE users
               SET password_hash = $1,
                   reset_password_token = NULL,
                   reset_password_expires = NULL
             WHERE id = $2 AND reset_password_token = $3
            "#,
        )
        .bind(password_hash)
        .bind(id)
        .bind(token)
        .execute(&self.db)
        .await
        .context("complete password reset")?;
        Ok(res.rows_affected())
    }

    async fn list(&self) -> anyhow::Result<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at ASC");
        let users = sqlx::query_as::<_, User>(&sql)
            .fetch_all(&self.db)
            .await
            .context("list users")?;
        Ok(users)
    }

    async fn update_role_status(&self, id: Uuid, role: Role, status: Status) -> anyhow::Result<u64> {
        let res = sqlx::query(r#"UPDATE users SET role = $1, status = $2 WHERE id = $3"#)
            .bind(role)
            .bind(status)
            .bind(id)
            .execute(&self.db)
            .await
            .context("update role and status")?;
        Ok(res.rows_affected())
    }

    async fn update_profile(&self, id: Uuid, profile: ProfileUpdate) -> anyhow::Result<Option<User>> {
        let sql = format!(
            r#"
            UPDATE users
               SET name = $1, monthly_salary = $2, expected_savings = $3, salary_deposit_day = $4
             WHERE id = $5
            RETURNING {USER_COLUMNS}
            "#
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(&profile.name)
            .bind(profile.monthly_salary)
            .bind(profile.expected_savings)
            .bind(profile.salary_deposit_day)
            .bind(id)
            .fetch_optional(&self.db)
            .await
            .context("update profile")?;
        Ok(user)
    }
}
