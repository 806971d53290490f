// Refresh token rotation

use crate::auth::{
    error::AuthError,
    models::User,
    repository::{CredentialStore, StoreError},
    token::TokenCodec,
};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::{debug, error, info};
use uuid::Uuid;

const INVALID_REFRESH_TOKEN: &str = "invalid refresh token";
const EXPIRED_REFRESH_TOKEN: &str = "refresh token expired";

/// Result of a successful rotation
#[derive(Debug)]
pub struct Rotation {
    pub access_token: String,
    /// User state after the swap; `refresh_token` holds the new value
    pub user: User,
}

/// Validates presented refresh tokens and rotates them
///
/// A refresh token is single-use: the swap goes through
/// [`CredentialStore::replace_refresh_token`] with the value that was just
/// checked, so of two concurrent callers presenting the same token only one
/// gets past the store.
pub struct RefreshCoordinator {
    store: Arc<dyn CredentialStore>,
    codec: Arc<TokenCodec>,
    refresh_token_ttl: Duration,
}

impl RefreshCoordinator {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        codec: Arc<TokenCodec>,
        refresh_token_ttl: Duration,
    ) -> Self {
        Self {
            store,
            codec,
            refresh_token_ttl,
        }
    }

    /// Generate a fresh refresh token value and its expiry
    pub fn issue(&self, now: DateTime<Utc>) -> (Uuid, DateTime<Utc>) {
        (Uuid::new_v4(), now + self.refresh_token_ttl)
    }

    pub async fn rotate(&self, user_id: Uuid, presented: &str) -> Result<Rotation, AuthError> {
        self.rotate_at(user_id, presented, Utc::now()).await
    }

    /// Rotate as of `now`
    pub async fn rotate_at(
        &self,
        user_id: Uuid,
        presented: &str,
        now: DateTime<Utc>,
    ) -> Result<Rotation, AuthError> {
        let user = match self.store.get_by_id(user_id).await {
            Ok(user) => user,
            Err(StoreError::NotFound) => return Err(AuthError::not_found("error finding user")),
            Err(e) => {
                error!("Error getting user {} for refresh: {}", user_id, e);
                return Err(AuthError::internal("error getting user"));
            }
        };

        let stored = user.refresh_token.to_string();
        if !bool::from(stored.as_bytes().ct_eq(presented.as_bytes())) {
            debug!("Refresh token mismatch for user {}", user_id);
            return Err(AuthError::bad_request(INVALID_REFRESH_TOKEN));
        }

        if user.refresh_token_expiry <= now {
            debug!("Refresh token expired for user {}", user_id);
            return Err(AuthError::bad_request(EXPIRED_REFRESH_TOKEN));
        }

        let (new_token, new_expiry) = self.issue(now);
        let user = match self
            .store
            .replace_refresh_token(user.id, user.refresh_token, new_token, new_expiry)
            .await
        {
            Ok(user) => user,
            // Lost a race with another rotation of the same token
            Err(StoreError::StaleRefreshToken) => {
                debug!("Refresh token for user {} was rotated concurrently", user_id);
                return Err(AuthError::bad_request(INVALID_REFRESH_TOKEN));
            }
            Err(StoreError::NotFound) => return Err(AuthError::not_found("error finding user")),
            Err(e) => {
                error!("Error updating refresh token for user {}: {}", user_id, e);
                return Err(AuthError::internal("error updating refresh token"));
            }
        };

        let access_token = self.codec.mint(user.id)?;
        info!("Rotated refresh token for user {}", user.id);

        Ok(Rotation { access_token, user })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::NewUser;
    use crate::auth::repository::InMemoryCredentialStore;
    use crate::config::AuthConfig;

    struct Fixture {
        store: Arc<InMemoryCredentialStore>,
        codec: Arc<TokenCodec>,
        coordinator: Arc<RefreshCoordinator>,
    }

    fn fixture() -> Fixture {
        let config = AuthConfig::new("test_secret_key_for_testing_purposes");
        let store = Arc::new(InMemoryCredentialStore::new());
        let codec = Arc::new(TokenCodec::new(&config));
        let coordinator = Arc::new(RefreshCoordinator::new(
            store.clone(),
            codec.clone(),
            config.refresh_token_ttl,
        ));
        Fixture {
            store,
            codec,
            coordinator,
        }
    }

    async fn seed_user(store: &InMemoryCredentialStore, expiry: DateTime<Utc>) -> User {
        store
            .create(NewUser {
                email: "a@b.com".to_string(),
                password_hash: "$argon2id$fake".to_string(),
                refresh_token: Uuid::new_v4(),
                refresh_token_expiry: expiry,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_rotate_issues_new_pair() {
        let f = fixture();
        let user = seed_user(&f.store, Utc::now() + Duration::days(1)).await;

        let rotation = f
            .coordinator
            .rotate(user.id, &user.refresh_token.to_string())
            .await
            .unwrap();

        assert_ne!(rotation.user.refresh_token, user.refresh_token);
        assert!(rotation.user.refresh_token_expiry > user.refresh_token_expiry);
        assert_eq!(f.codec.verify(&rotation.access_token).unwrap(), user.id);
        assert_eq!(
            f.store.get_by_id(user.id).await.unwrap().refresh_token,
            rotation.user.refresh_token
        );
    }

    #[tokio::test]
    async fn test_rotated_token_is_single_use() {
        let f = fixture();
        let user = seed_user(&f.store, Utc::now() + Duration::days(1)).await;
        let original = user.refresh_token.to_string();

        let first = f.coordinator.rotate(user.id, &original).await.unwrap();
        let second = f.coordinator.rotate(user.id, &original).await;
        assert_eq!(second.unwrap_err(), AuthError::bad_request(INVALID_REFRESH_TOKEN));

        // The new token works exactly once too
        let new_token = first.user.refresh_token.to_string();
        assert!(f.coordinator.rotate(user.id, &new_token).await.is_ok());
        assert!(f.coordinator.rotate(user.id, &new_token).await.is_err());
    }

    #[tokio::test]
    async fn test_concurrent_rotations_single_success() {
        let f = fixture();
        let user = seed_user(&f.store, Utc::now() + Duration::days(1)).await;
        let original = user.refresh_token.to_string();
        let user_id = user.id;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let coordinator = f.coordinator.clone();
                let token = original.clone();
                tokio::spawn(async move { coordinator.rotate(user_id, &token).await })
            })
            .collect();

        let mut successes = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => successes += 1,
                Err(err) => assert_eq!(err, AuthError::bad_request(INVALID_REFRESH_TOKEN)),
            }
        }
        assert_eq!(successes, 1);
    }

    #[tokio::test]
    async fn test_expired_token_never_renewed() {
        let f = fixture();
        let user = seed_user(&f.store, Utc::now() - Duration::seconds(1)).await;

        let result = f
            .coordinator
            .rotate(user.id, &user.refresh_token.to_string())
            .await;
        assert_eq!(result.unwrap_err(), AuthError::bad_request(EXPIRED_REFRESH_TOKEN));

        // Stored token left untouched
        let stored = f.store.get_by_id(user.id).await.unwrap();
        assert_eq!(stored.refresh_token, user.refresh_token);
    }

    #[tokio::test]
    async fn test_token_invalid_at_expiry_instant() {
        let f = fixture();
        let expiry = Utc::now() + Duration::hours(1);
        let user = seed_user(&f.store, expiry).await;
        let token = user.refresh_token.to_string();

        let at_expiry = f.coordinator.rotate_at(user.id, &token, expiry).await;
        assert_eq!(at_expiry.unwrap_err(), AuthError::bad_request(EXPIRED_REFRESH_TOKEN));

        let just_before = expiry - Duration::seconds(1);
        assert!(f.coordinator.rotate_at(user.id, &token, just_before).await.is_ok());
    }

    #[tokio::test]
    async fn test_wrong_token_rejected() {
        let f = fixture();
        let user = seed_user(&f.store, Utc::now() + Duration::days(1)).await;

        for presented in [Uuid::new_v4().to_string(), String::new(), "garbage".to_string()] {
            let result = f.coordinator.rotate(user.id, &presented).await;
            assert_eq!(result.unwrap_err(), AuthError::bad_request(INVALID_REFRESH_TOKEN));
        }
    }

    #[tokio::test]
    async fn test_padded_token_rejected() {
        let f = fixture();
        let user = seed_user(&f.store, Utc::now() + Duration::days(1)).await;
        let token = user.refresh_token.to_string();

        for presented in [format!("  {}  ", token), format!("{}\n", token), format!(" {}", token)] {
            let result = f.coordinator.rotate(user.id, &presented).await;
            assert_eq!(result.unwrap_err(), AuthError::bad_request(INVALID_REFRESH_TOKEN));
        }
        assert_eq!(f.store.get_by_id(user.id).await.unwrap().refresh_token, user.refresh_token);
    }

    #[tokio::test]
    async fn test_unknown_user_not_found() {
        let f = fixture();
        let result = f
            .coordinator
            .rotate(Uuid::new_v4(), &Uuid::new_v4().to_string())
            .await;
        assert!(matches!(result, Err(AuthError::NotFound(_))));
    }
}
