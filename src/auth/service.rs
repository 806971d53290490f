// Session service - signup, login, refresh and account deletion

use crate::auth::{
    error::AuthError,
    models::{NewUser, User, UserProfile, UserView},
    password::PasswordService,
    refresh::RefreshCoordinator,
    repository::{CredentialStore, StoreError},
    token::TokenCodec,
};
use crate::config::AuthConfig;
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Trim and lowercase an email address
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Authentication service coordinating all session operations
pub struct AuthService {
    store: Arc<dyn CredentialStore>,
    codec: Arc<TokenCodec>,
    refresh: RefreshCoordinator,
}

impl AuthService {
    /// Create a new AuthService
    pub fn new(store: Arc<dyn CredentialStore>, codec: Arc<TokenCodec>, config: &AuthConfig) -> Self {
        let refresh = RefreshCoordinator::new(store.clone(), codec.clone(), config.refresh_token_ttl);
        Self {
            store,
            codec,
            refresh,
        }
    }

    /// Register a new user
    ///
    /// This method:
    /// 1. Normalizes the email and rejects an empty one
    /// 2. Rejects an email that is already registered
    /// 3. Hashes the password
    /// 4. Persists the user with an initial refresh token
    /// 5. Mints an access token
    pub async fn signup(&self, email: &str, password: &str) -> Result<UserView, AuthError> {
        // 1. Normalize
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(AuthError::bad_request("email cannot be empty"));
        }

        // 2. Duplicate check
        match self.store.get_by_email(&email).await {
            Ok(_) => {
                debug!("Signup attempted with registered email");
                return Err(AuthError::bad_request(format!(
                    "user with email {} already exists",
                    email
                )));
            }
            Err(StoreError::NotFound) => {}
            Err(e) => return Err(Self::store_failure("error getting user", e)),
        }

        // 3. Hash
        let password_hash = PasswordService::hash_password(password)?;

        // 4. Persist
        let (refresh_token, refresh_token_expiry) = self.refresh.issue(Utc::now());
        let user = match self
            .store
            .create(NewUser {
                email: email.clone(),
                password_hash,
                refresh_token,
                refresh_token_expiry,
            })
            .await
        {
            Ok(user) => user,
            // A concurrent signup won the unique index
            Err(StoreError::DuplicateEmail) => {
                return Err(AuthError::bad_request(format!(
                    "user with email {} already exists",
                    email
                )))
            }
            Err(e) => return Err(Self::store_failure("error creating user", e)),
        };

        info!("Registered user {}", user.id);

        // 5. Mint
        self.view(user)
    }

    /// Login a user
    ///
    /// A live refresh token is returned unchanged. An expired one is replaced
    /// by a fresh pair, the only way out of the expired state besides signup.
    pub async fn login(&self, email: &str, password: &str) -> Result<UserView, AuthError> {
        let email = normalize_email(email);
        let user = match self.store.get_by_email(&email).await {
            Ok(user) => user,
            Err(StoreError::NotFound) => {
                return Err(AuthError::not_found(format!(
                    "user with email {} not found",
                    email
                )))
            }
            Err(e) => return Err(Self::store_failure("error getting user", e)),
        };

        if !PasswordService::verify_password(password, &user.password_hash)? {
            debug!("Password mismatch for user {}", user.id);
            return Err(AuthError::bad_request("invalid password"));
        }

        let user = if user.refresh_token_expiry <= Utc::now() {
            self.reset_refresh_token(user).await?
        } else {
            user
        };

        self.view(user)
    }

    /// Rotate the caller's refresh token and mint a new access token
    pub async fn refresh(&self, user_id: Uuid, refresh_token: &str) -> Result<UserView, AuthError> {
        let rotation = self.refresh.rotate(user_id, refresh_token).await?;
        Ok(UserView::new(rotation.user, rotation.access_token))
    }

    /// Get current user information
    pub async fn get_current_user(&self, user_id: Uuid) -> Result<UserProfile, AuthError> {
        match self.store.get_by_id(user_id).await {
            Ok(user) => Ok(user.into()),
            Err(StoreError::NotFound) => Err(AuthError::not_found("error finding user")),
            Err(e) => Err(Self::store_failure("error getting user", e)),
        }
    }

    pub async fn delete_user_by_id(&self, user_id: Uuid) -> Result<(), AuthError> {
        match self.store.delete_by_id(user_id).await {
            Ok(()) => {
                info!("Deleted user {}", user_id);
                Ok(())
            }
            Err(StoreError::NotFound) => Err(AuthError::not_found("error finding user")),
            Err(e) => Err(Self::store_failure("error deleting user", e)),
        }
    }

    async fn reset_refresh_token(&self, user: User) -> Result<User, AuthError> {
        let (new_token, new_expiry) = self.refresh.issue(Utc::now());
        match self
            .store
            .replace_refresh_token(user.id, user.refresh_token, new_token, new_expiry)
            .await
        {
            Ok(user) => {
                info!("Reissued expired refresh token for user {}", user.id);
                Ok(user)
            }
            // A concurrent login already reset it; hand out that pair
            Err(StoreError::StaleRefreshToken) => match self.store.get_by_id(user.id).await {
                Ok(user) => Ok(user),
                Err(StoreError::NotFound) => Err(AuthError::not_found("error finding user")),
                Err(e) => Err(Self::store_failure("error getting user", e)),
            },
            Err(StoreError::NotFound) => Err(AuthError::not_found("error finding user")),
            Err(e) => Err(Self::store_failure("error updating refresh token", e)),
        }
    }

    fn view(&self, user: User) -> Result<UserView, AuthError> {
        let access_token = self.codec.mint(user.id)?;
        Ok(UserView::new(user, access_token))
    }

    fn store_failure(context: &str, err: StoreError) -> AuthError {
        error!("{}: {}", context, err);
        AuthError::internal(context)
    }
}
