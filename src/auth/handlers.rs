// HTTP handlers for user session endpoints

use axum::{extract::State, http::StatusCode, Json};
use crate::auth::{
    error::AuthError,
    extract::JsonBody,
    middleware::{AuthenticatedUser, RefreshCaller},
    models::{CredentialsRequest, RefreshRequest, UserProfile, UserView},
};
use crate::AppState;
use validator::Validate;

/// Register a new user
/// POST /api/users/signup
#[utoipa::path(
    post,
    path = "/api/users/signup",
    request_body = CredentialsRequest,
    responses(
        (status = 201, description = "User registered", body = UserView),
        (status = 400, description = "Malformed body, empty or already registered email", body = crate::auth::error::ErrorResponse),
        (status = 500, description = "Internal server error", body = crate::auth::error::ErrorResponse)
    ),
    tag = "users"
)]
pub async fn signup_handler(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<CredentialsRequest>,
) -> Result<(StatusCode, Json<UserView>), AuthError> {
    request.validate()?;
    let view = state.auth_service.signup(&request.email, &request.password).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// Login a user
/// POST /api/users/login
#[utoipa::path(
    post,
    path = "/api/users/login",
    request_body = CredentialsRequest,
    responses(
        (status = 200, description = "Logged in", body = UserView),
        (status = 400, description = "Invalid password", body = crate::auth::error::ErrorResponse),
        (status = 404, description = "Unknown email", body = crate::auth::error::ErrorResponse)
    ),
    tag = "users"
)]
pub async fn login_handler(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<CredentialsRequest>,
) -> Result<Json<UserView>, AuthError> {
    request.validate()?;
    let view = state.auth_service.login(&request.email, &request.password).await?;
    Ok(Json(view))
}

/// Rotate the refresh token
/// POST /api/users/refresh
///
/// The caller identifies itself with its access token, which may already be
/// expired but must carry a valid signature. That check runs before the body
/// is read.
#[utoipa::path(
    post,
    path = "/api/users/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Tokens rotated", body = UserView),
        (status = 400, description = "Invalid or expired refresh token", body = crate::auth::error::ErrorResponse),
        (status = 401, description = "Missing or forged access token", body = crate::auth::error::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn refresh_handler(
    State(state): State<AppState>,
    caller: RefreshCaller,
    JsonBody(request): JsonBody<RefreshRequest>,
) -> Result<Json<UserView>, AuthError> {
    request.validate()?;

    let view = state
        .auth_service
        .refresh(caller.user_id, &request.refresh_token)
        .await?;
    Ok(Json(view))
}

/// Get current user information (protected endpoint)
/// GET /api/users/me
#[utoipa::path(
    get,
    path = "/api/users/me",
    responses(
        (status = 200, description = "Caller profile", body = UserProfile),
        (status = 401, description = "Unauthorized", body = crate::auth::error::ErrorResponse),
        (status = 404, description = "User no longer exists", body = crate::auth::error::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn me_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<UserProfile>, AuthError> {
    let profile = state.auth_service.get_current_user(user.user_id).await?;
    Ok(Json(profile))
}

/// Delete the caller's account (protected endpoint)
/// DELETE /api/users/me
#[utoipa::path(
    delete,
    path = "/api/users/me",
    responses(
        (status = 204, description = "Account deleted"),
        (status = 401, description = "Unauthorized", body = crate::auth::error::ErrorResponse),
        (status = 404, description = "User no longer exists", body = crate::auth::error::ErrorResponse)
    ),
    security(("bearer" = [])),
    tag = "users"
)]
pub async fn delete_me_handler(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<StatusCode, AuthError> {
    state.auth_service.delete_user_by_id(user.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
