pub mod auth;
pub mod config;
pub mod db;

use axum::{
    extract::FromRef,
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use auth::{
    error::ErrorResponse, AuthService, CredentialStore, CredentialsRequest, InMemoryCredentialStore,
    PgCredentialStore, RefreshRequest, TokenCodec, UserProfile, UserView,
};
use config::{AppConfig, AuthConfig};

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    paths(
        auth::handlers::signup_handler,
        auth::handlers::login_handler,
        auth::handlers::refresh_handler,
        auth::handlers::me_handler,
        auth::handlers::delete_me_handler,
    ),
    components(
        schemas(CredentialsRequest, RefreshRequest, UserView, UserProfile, ErrorResponse)
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "users", description = "Signup, login, token refresh and account endpoints")
    ),
    info(
        title = "Goalify API",
        version = "0.1.0",
        description = "Credential and session token service"
    )
)]
struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

/// Application state shared across handlers
#[derive(Clone, FromRef)]
pub struct AppState {
    pub auth_service: Arc<AuthService>,
    pub token_codec: Arc<TokenCodec>,
}

impl AppState {
    /// Wire the token codec and session service around a credential store
    pub fn new(store: Arc<dyn CredentialStore>, config: &AuthConfig) -> Self {
        let token_codec = Arc::new(TokenCodec::new(config));
        let auth_service = Arc::new(AuthService::new(store, token_codec.clone(), config));
        Self {
            auth_service,
            token_codec,
        }
    }
}

/// Handler for GET /health
async fn health() -> &'static str {
    "Hello\n"
}

/// Creates and configures the application router
/// Public session endpoints, gated account endpoints, docs and CORS
pub fn create_router(state: AppState) -> Router {
    use tower_http::cors::{Any, CorsLayer};

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Everything in here sits behind the auth gate
    let protected = Router::new()
        .route(
            "/api/users/me",
            get(auth::me_handler).delete(auth::delete_me_handler),
        )
        .route_layer(middleware::from_fn_with_state(
            state.token_codec.clone(),
            auth::require_auth,
        ));

    Router::new()
        // Swagger UI
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(health))
        .route("/api/users/signup", post(auth::signup_handler))
        .route("/api/users/login", post(auth::login_handler))
        .route("/api/users/refresh", post(auth::refresh_handler))
        .merge(protected)
        .layer(cors)
        .with_state(state)
}

#[tokio::main]
async fn main() {
    use tracing_subscriber::EnvFilter;

    // Initialize tracing subscriber for logging, RUST_LOG overrides the level
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_level(true)
        .init();

    tracing::info!("Goalify API - Starting...");

    let config = AppConfig::from_env().expect("Invalid configuration");
    tracing::debug!("Loaded configuration: {:?}", config.auth);

    let store: Arc<dyn CredentialStore> = match &config.database_url {
        Some(database_url) => {
            tracing::info!("Connecting to database...");
            let pool = db::create_pool(database_url)
                .await
                .expect("Failed to create database pool");
            db::run_migrations(&pool)
                .await
                .expect("Failed to run database migrations");
            Arc::new(PgCredentialStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory credential store");
            Arc::new(InMemoryCredentialStore::new())
        }
    };

    let app = create_router(AppState::new(store, &config.auth));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Listening on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    axum::serve(listener, app)
        .await
        .expect("Server error");
}
