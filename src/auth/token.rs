// JWT access token minting and verification

use crate::auth::error::AuthError;
use crate::config::AuthConfig;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use uuid::Uuid;

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    #[serde(rename = "userId")]
    pub user_id: Uuid,
    pub exp: i64, // expiration timestamp
    pub iat: i64, // issued at timestamp
}

/// Stateless access token codec
///
/// Tokens are HS256 with zero leeway: a token is accepted up to and including
/// its `exp` second and rejected afterwards. Every verification failure maps
/// to [`AuthError::Unauthorized`]; the underlying reason is only logged at
/// debug level.
pub struct TokenCodec {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_ttl: Duration,
}

impl TokenCodec {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            access_token_ttl: config.access_token_ttl,
        }
    }

    /// Mint an access token valid for the configured TTL from now
    pub fn mint(&self, user_id: Uuid) -> Result<String, AuthError> {
        self.mint_at(user_id, Utc::now())
    }

    /// Mint an access token as if issued at `issued_at`
    pub fn mint_at(&self, user_id: Uuid, issued_at: DateTime<Utc>) -> Result<String, AuthError> {
        let iat = issued_at.timestamp();
        let claims = Claims {
            user_id,
            iat,
            exp: iat + self.access_token_ttl.num_seconds(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key).map_err(|e| {
            error!("Failed to sign access token: {}", e);
            AuthError::internal(format!("token signing failed: {}", e))
        })
    }

    /// Verify signature and expiry, returning the user id
    pub fn verify(&self, token: &str) -> Result<Uuid, AuthError> {
        self.decode_with(token, Self::validation())
    }

    /// Verify signature and claim shape but not expiry
    ///
    /// Only the refresh endpoint uses this, to identify a caller whose access
    /// token has already lapsed.
    pub fn decode_subject_allow_expired(&self, token: &str) -> Result<Uuid, AuthError> {
        let mut validation = Self::validation();
        validation.validate_exp = false;
        self.decode_with(token, validation)
    }

    fn validation() -> Validation {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp"]);
        validation
    }

    fn decode_with(&self, token: &str, validation: Validation) -> Result<Uuid, AuthError> {
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims.user_id)
            .map_err(|e| {
                debug!("Access token rejected: {:?}", e.kind());
                AuthError::Unauthorized
            })
    }
}
