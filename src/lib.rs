//! oauth-portal - a small Google OAuth login portal
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      HTTP Layer (Axum)                       │
//! │  - Pages: /                                                  │
//! │  - Auth: /login, /login/google, /auth, /logout               │
//! │  - Status: /health, /test, /tokens, /test-data, /metrics     │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Auth Layer                             │
//! │  - HMAC-signed session cookie                               │
//! │  - OpenID Connect client (Google)                           │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - `api`: HTML pages, JSON status endpoints, metrics
//! - `auth`: Google OAuth flow and cookie sessions
//! - `config`: Configuration management
//! - `error`: Error types
//! - `metrics`: Prometheus instruments

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod metrics;

use std::sync::Arc;

use axum::{
    Json, Router,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Application state shared across all handlers
///
/// Cloned for each request. Session state itself lives in the
/// client's signed cookie, not here.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<config::AppConfig>,

    /// Secret used to sign session cookies
    pub session_secret: Arc<str>,

    /// Identity provider, absent when Google credentials are not configured
    pub provider: Option<Arc<dyn auth::IdentityProvider>>,
}

impl AppState {
    /// Initialize application state
    ///
    /// # Steps
    /// 1. Resolve the session secret (generate one when unset)
    /// 2. Build the Google client when credentials are present
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built
    pub fn new(config: config::AppConfig) -> Result<Self, error::AppError> {
        tracing::info!("Initializing application state...");

        let google = &config.auth.google;
        let provider: Option<Arc<dyn auth::IdentityProvider>> =
            match (google.client_id(), google.client_secret()) {
                (Some(client_id), Some(client_secret)) => {
                    let provider = auth::GoogleProvider::new(
                        client_id.to_string(),
                        client_secret.to_string(),
                        google.discovery_url.clone(),
                    )
                    .map_err(|e| error::AppError::Internal(e.into()))?;
                    tracing::info!(discovery_url = %google.discovery_url, "Google OAuth enabled");
                    Some(Arc::new(provider))
                }
                _ => None,
            };

        Ok(Self::with_provider(config, provider))
    }

    /// Build state around an explicit provider
    pub fn with_provider(
        config: config::AppConfig,
        provider: Option<Arc<dyn auth::IdentityProvider>>,
    ) -> Self {
        let session_secret = config
            .auth
            .session_secret
            .as_deref()
            .map(str::trim)
            .filter(|secret| !secret.is_empty())
            .map(str::to_string)
            .unwrap_or_else(auth::session::generate_session_secret);

        Self {
            config: Arc::new(config),
            session_secret: Arc::from(session_secret),
            provider,
        }
    }
}

/// Build the Axum router with all routes.
///
/// This is shared by the binary and integration tests to keep route
/// composition consistent across environments.
pub fn build_router(state: AppState) -> Router {
    let variant = state.config.app.variant;

    let routes = Router::new()
        .merge(api::pages_router(variant))
        .merge(auth::auth_router(variant))
        .merge(api::status_router())
        .merge(api::metrics_router(state.clone()));

    with_service_layers(routes).with_state(state)
}

/// JSON 404 fallback, request tracing and panic recovery
fn with_service_layers(routes: Router<AppState>) -> Router<AppState> {
    use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

    routes
        .fallback(not_found)
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(handle_panic))
}

async fn not_found() -> error::AppError {
    error::AppError::NotFound
}

fn handle_panic(err: Box<dyn std::any::Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    tracing::error!(panic = %detail, "Handler panicked");

    metrics::ERRORS_TOTAL.with_label_values(&["panic"]).inc();

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(serde_json::json!({ "error": "Internal server error" })),
    )
        .into_response()
}
