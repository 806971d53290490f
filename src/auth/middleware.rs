// Authentication gate for protected routes

use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use crate::auth::{error::AuthError, token::TokenCodec};
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Identity resolved by [`require_auth`], stored in the request extensions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
}

/// Pull the token out of an `Authorization: Bearer <token>` header
///
/// The header must split on single spaces into exactly two parts.
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::Unauthorized)?
        .to_str()
        .map_err(|_| AuthError::Unauthorized)?;

    let mut parts = value.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None)
            if scheme.eq_ignore_ascii_case("Bearer") && !token.is_empty() =>
        {
            Ok(token)
        }
        _ => Err(AuthError::Unauthorized),
    }
}

/// Middleware that requires a valid access token
///
/// Rejected requests never reach the wrapped handler. Missing header,
/// malformed header, bad signature and expiry all produce the same 401.
pub async fn require_auth(
    State(codec): State<Arc<TokenCodec>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let path = request.uri().path().to_string();

    let user_id = bearer_token(request.headers())
        .and_then(|token| codec.verify(token))
        .map_err(|e| {
            warn!("Rejected unauthenticated request to {}", path);
            e
        })?;

    debug!("Authenticated user {} for {}", user_id, path);
    request
        .extensions_mut()
        .insert(AuthenticatedUser { user_id });

    Ok(next.run(request).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .copied()
            .ok_or(AuthError::Unauthorized)
    }
}

/// Caller of the refresh endpoint, identified by a signed access token
/// that may already be expired
///
/// Extracted from the headers alone, so it resolves before any body
/// extractor listed after it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefreshCaller {
    pub user_id: Uuid,
}

#[async_trait]
impl<S> FromRequestParts<S> for RefreshCaller
where
    Arc<TokenCodec>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let codec = Arc::<TokenCodec>::from_ref(state);
        let user_id = bearer_token(&parts.headers)
            .and_then(|token| codec.decode_subject_allow_expired(token))
            .map_err(|e| {
                warn!("Rejected unauthenticated refresh to {}", parts.uri.path());
                e
            })?;
        Ok(RefreshCaller { user_id })
    }
}
