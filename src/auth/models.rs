// Authentication data models and DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// User record as held by the credential store
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub refresh_token: Uuid,
    pub refresh_token_expiry: DateTime<Utc>,
    pub xp: i32,
    pub level_id: i32,
    pub cash_available: i64,
    pub created_at: DateTime<Utc>,
}

/// Fields needed to insert a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub refresh_token: Uuid,
    pub refresh_token_expiry: DateTime<Utc>,
}

/// Session view returned by signup, login and refresh (excludes password_hash)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: Uuid,
    pub email: String,
    pub access_token: String,
    pub refresh_token: String,
    pub refresh_token_expiry: DateTime<Utc>,
    pub xp: i32,
    pub level_id: i32,
    pub cash_available: i64,
}

impl UserView {
    pub fn new(user: User, access_token: String) -> Self {
        Self {
            id: user.id,
            email: user.email,
            access_token,
            refresh_token: user.refresh_token.to_string(),
            refresh_token_expiry: user.refresh_token_expiry,
            xp: user.xp,
            level_id: user.level_id,
            cash_available: user.cash_available,
        }
    }
}

/// Profile of the authenticated caller, without any credentials
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub xp: i32,
    pub level_id: i32,
    pub cash_available: i64,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            xp: user.xp,
            level_id: user.level_id,
            cash_available: user.cash_available,
            created_at: user.created_at,
        }
    }
}

/// Signup and login request DTO
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CredentialsRequest {
    #[validate(length(max = 254, message = "Email must not exceed 254 characters"))]
    pub email: String,
    #[validate(length(min = 1, max = 128, message = "Password must be between 1 and 128 characters"))]
    pub password: String,
}

/// Token refresh request DTO
#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    #[validate(length(min = 1, max = 64, message = "Refresh token must not be empty"))]
    pub refresh_token: String,
}
