//! JSON status endpoints
//!
//! Read-only views over credential configuration and session presence.
//!
//! - /test-data
//! - /health
//! - /test
//! - /tokens

use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;

use crate::AppState;
use crate::auth::MaybeUser;

/// Create status router
pub fn status_router() -> Router<AppState> {
    Router::new()
        .route("/test-data", get(test_data))
        .route("/health", get(health))
        .route("/test", get(config_test))
        .route("/tokens", get(tokens))
}

#[derive(Debug, Serialize)]
pub struct TestDataResponse {
    pub status: &'static str,
    pub user_authenticated: bool,
    pub google_configured: bool,
    pub message: &'static str,
}

/// GET /test-data
async fn test_data(State(state): State<AppState>, user: MaybeUser) -> Json<TestDataResponse> {
    Json(TestDataResponse {
        status: "success",
        user_authenticated: user.is_authenticated(),
        google_configured: state.config.auth.google.client_id().is_some(),
        message: "API is working!",
    })
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub google_oauth_configured: bool,
    pub session_secret_configured: bool,
    pub openrouter_configured: bool,
}

/// GET /health
async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        google_oauth_configured: state.config.auth.google.is_configured(),
        session_secret_configured: state.config.auth.session_secret_configured(),
        openrouter_configured: state.config.app.openrouter_configured(),
    })
}

#[derive(Debug, Serialize)]
pub struct ConfigTestResponse {
    pub status: &'static str,
    pub message: &'static str,
    pub google_client_id_set: bool,
    pub google_client_secret_set: bool,
    pub openrouter_api_key_set: bool,
    pub user_authenticated: bool,
}

/// GET /test
async fn config_test(State(state): State<AppState>, user: MaybeUser) -> Json<ConfigTestResponse> {
    let google = &state.config.auth.google;
    Json(ConfigTestResponse {
        status: "success",
        message: "Configuration test",
        google_client_id_set: google.client_id().is_some(),
        google_client_secret_set: google.client_secret().is_some(),
        openrouter_api_key_set: state.config.app.openrouter_configured(),
        user_authenticated: user.is_authenticated(),
    })
}

#[derive(Debug, Serialize)]
pub struct TokensResponse {
    pub authenticated: bool,
    pub tokens_used: u64,
    pub user: Option<String>,
}

/// GET /tokens
///
/// Reports the per-session usage counter, which is never incremented.
async fn tokens(MaybeUser(user): MaybeUser) -> Json<TokensResponse> {
    Json(TokensResponse {
        authenticated: user.is_some(),
        tokens_used: user
            .as_ref()
            .map(|session| session.usage.tokens_used)
            .unwrap_or_default(),
        user: user.map(|session| session.email),
    })
}
