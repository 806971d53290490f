// Authentication error taxonomy and HTTP response conversion

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use std::fmt;
use tracing::{debug, error};
use utoipa::ToSchema;

/// Fixed message returned for every rejected credential at the gate
pub const UNAUTHORIZED_MESSAGE: &str = "unauthorized request";

const INTERNAL_MESSAGE: &str = "An internal server error occurred";

/// Message for any request body that cannot be read as the expected JSON
pub const INVALID_BODY_MESSAGE: &str = "invalid request body";

/// The four error kinds visible to callers
///
/// Every failure inside the auth subsystem is translated into exactly one of
/// these before it leaves the service boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthError {
    /// Malformed input, duplicate email, password mismatch, invalid or
    /// expired refresh token. The message is safe to show to the caller.
    BadRequest(String),

    /// Unknown user or email
    NotFound(String),

    /// Missing, malformed, forged or expired access token.
    /// Carries no reason on purpose.
    Unauthorized,

    /// Hashing, signing or store failures. The detail is logged and never
    /// sent to the caller.
    Internal(String),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AuthError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AuthError::Unauthorized => write!(f, "Unauthorized"),
            AuthError::Internal(detail) => write!(f, "Internal error: {}", detail),
        }
    }
}

impl std::error::Error for AuthError {}

/// JSON body for every error response
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Machine-readable code, e.g. "BAD_REQUEST"
    pub error_code: String,
    pub message: String,
    /// RFC 3339 timestamp
    pub timestamp: String,
}

impl AuthError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        AuthError::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AuthError::NotFound(msg.into())
    }

    pub fn internal(detail: impl Into<String>) -> Self {
        AuthError::Internal(detail.into())
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AuthError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AuthError::NotFound(_) => StatusCode::NOT_FOUND,
            AuthError::Unauthorized => StatusCode::UNAUTHORIZED,
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the message that is safe to send to clients
    pub fn error_message(&self) -> String {
        match self {
            AuthError::BadRequest(msg) => msg.clone(),
            AuthError::NotFound(msg) => msg.clone(),
            AuthError::Unauthorized => UNAUTHORIZED_MESSAGE.to_string(),
            AuthError::Internal(_) => INTERNAL_MESSAGE.to_string(),
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            AuthError::BadRequest(_) => "BAD_REQUEST",
            AuthError::NotFound(_) => "NOT_FOUND",
            AuthError::Unauthorized => "UNAUTHORIZED",
            AuthError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn to_error_response(&self) -> ErrorResponse {
        match self {
            AuthError::BadRequest(msg) => debug!("Bad request: {}", msg),
            AuthError::NotFound(msg) => debug!("Not found: {}", msg),
            AuthError::Unauthorized => debug!("Unauthorized request rejected"),
            AuthError::Internal(detail) => error!("Internal error in auth: {}", detail),
        }

        ErrorResponse {
            error_code: self.error_code().to_string(),
            message: self.error_message(),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let body = self.to_error_response();
        (self.status_code(), Json(body)).into_response()
    }
}

impl From<validator::ValidationErrors> for AuthError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AuthError::BadRequest(format!("Request validation failed: {}", errors))
    }
}

impl From<JsonRejection> for AuthError {
    fn from(rejection: JsonRejection) -> Self {
        debug!("Request body rejected: {}", rejection.body_text());
        AuthError::bad_request(INVALID_BODY_MESSAGE)
    }
}
