// Credential store contract and its Postgres / in-memory implementations

use crate::auth::models::{NewUser, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::Mutex;
use uuid::Uuid;

/// Typed store failures
///
/// `NotFound` is a distinct variant rather than an empty-result sentinel so
/// the service can tell "no such user" apart from backend trouble.
#[derive(Debug, Error, PartialEq)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,

    #[error("email already registered")]
    DuplicateEmail,

    /// The stored refresh token no longer equals the expected value
    #[error("refresh token was already replaced")]
    StaleRefreshToken,

    #[error("store backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => StoreError::NotFound,
            sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
                StoreError::DuplicateEmail
            }
            other => StoreError::Backend(other.to_string()),
        }
    }
}

/// Durable user records addressable by id and by email
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Look up a user by normalized email
    async fn get_by_email(&self, email: &str) -> Result<User, StoreError>;

    async fn get_by_id(&self, id: Uuid) -> Result<User, StoreError>;

    /// Insert a user; `DuplicateEmail` if the email is taken
    async fn create(&self, user: NewUser) -> Result<User, StoreError>;

    /// Atomically replace the refresh token and its expiry
    ///
    /// Succeeds only while the stored token still equals `expected`. Two
    /// callers racing with the same `expected` value cannot both succeed; the
    /// loser gets `StaleRefreshToken`.
    async fn replace_refresh_token(
        &self,
        id: Uuid,
        expected: Uuid,
        new_token: Uuid,
        new_expiry: DateTime<Utc>,
    ) -> Result<User, StoreError>;

    async fn delete_by_id(&self, id: Uuid) -> Result<(), StoreError>;
}

const USER_COLUMNS: &str =
    "id, email, password_hash, refresh_token, refresh_token_expiry, xp, level_id, cash_available, created_at";

/// Postgres-backed credential store
#[derive(Clone)]
pub struct PgCredentialStore {
    pool: PgPool,
}

impl PgCredentialStore {
    /// Create a new PgCredentialStore
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CredentialStore for PgCredentialStore {
    async fn get_by_email(&self, email: &str) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE LOWER(email) = LOWER($1)"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        user.ok_or(StoreError::NotFound)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        user.ok_or(StoreError::NotFound)
    }

    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let created = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, email, password_hash, refresh_token, refresh_token_expiry)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.refresh_token)
        .bind(user.refresh_token_expiry)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn replace_refresh_token(
        &self,
        id: Uuid,
        expected: Uuid,
        new_token: Uuid,
        new_expiry: DateTime<Utc>,
    ) -> Result<User, StoreError> {
        // Single conditional UPDATE; the row lock makes concurrent rotations
        // with the same expected token serialize and the second match nothing.
        let updated = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET refresh_token = $3,
                refresh_token_expiry = $4
            WHERE id = $1 AND refresh_token = $2
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(expected)
        .bind(new_token)
        .bind(new_expiry)
        .fetch_optional(&self.pool)
        .await?;

        updated.ok_or(StoreError::StaleRefreshToken)
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[derive(Default)]
struct Records {
    users: HashMap<Uuid, User>,
    ids_by_email: HashMap<String, Uuid>,
}

/// In-process credential store
///
/// One mutex guards both maps, so every operation (including the
/// compare-and-replace) is atomic with respect to the others.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    records: Mutex<Records>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn get_by_email(&self, email: &str) -> Result<User, StoreError> {
        let records = self.records.lock().await;
        records
            .ids_by_email
            .get(&email.to_lowercase())
            .and_then(|id| records.users.get(id))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<User, StoreError> {
        let records = self.records.lock().await;
        records.users.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn create(&self, user: NewUser) -> Result<User, StoreError> {
        let mut records = self.records.lock().await;
        let key = user.email.to_lowercase();
        if records.ids_by_email.contains_key(&key) {
            return Err(StoreError::DuplicateEmail);
        }

        let created = User {
            id: Uuid::new_v4(),
            email: user.email,
            password_hash: user.password_hash,
            refresh_token: user.refresh_token,
            refresh_token_expiry: user.refresh_token_expiry,
            xp: 0,
            level_id: 1,
            cash_available: 0,
            created_at: Utc::now(),
        };
        records.ids_by_email.insert(key, created.id);
        records.users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn replace_refresh_token(
        &self,
        id: Uuid,
        expected: Uuid,
        new_token: Uuid,
        new_expiry: DateTime<Utc>,
    ) -> Result<User, StoreError> {
        let mut records = self.records.lock().await;
        let user = records.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        if user.refresh_token != expected {
            return Err(StoreError::StaleRefreshToken);
        }
        user.refresh_token = new_token;
        user.refresh_token_expiry = new_expiry;
        Ok(user.clone())
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<(), StoreError> {
        let mut records = self.records.lock().await;
        let user = records.users.remove(&id).ok_or(StoreError::NotFound)?;
        records.ids_by_email.remove(&user.email.to_lowercase());
        Ok(())
    }
}
