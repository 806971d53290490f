// Authentication module
// Issues access tokens and rotating refresh tokens, and gates protected routes

pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod password;
pub mod refresh;
pub mod repository;
pub mod service;
pub mod token;

// Re-export commonly used types
pub use error::AuthError;
pub use handlers::{delete_me_handler, login_handler, me_handler, refresh_handler, signup_handler};
pub use middleware::{require_auth, AuthenticatedUser, RefreshCaller};
pub use models::{CredentialsRequest, RefreshRequest, User, UserProfile, UserView};
pub use repository::{CredentialStore, InMemoryCredentialStore, PgCredentialStore, StoreError};
pub use service::AuthService;
pub use token::TokenCodec;
