// Request body extraction that reports failures through AuthError

use crate::auth::error::AuthError;
use axum::extract::FromRequest;

/// `Json` extractor whose rejection is an [`AuthError::BadRequest`]
///
/// Missing content type, unparseable JSON and missing fields all become the
/// same 400 with the standard error body.
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AuthError))]
pub struct JsonBody<T>(pub T);
