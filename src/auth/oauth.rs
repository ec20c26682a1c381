//! Google OAuth flow
//!
//! Implements the OAuth 2.0 authorization code flow:
//! login redirect, provider callback, session write, logout.

use axum::{
    Router,
    extract::{Host, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use axum_extra::extract::{
    CookieJar,
    cookie::{Cookie, SameSite},
};
use base64::Engine as _;
use rand::RngCore;
use serde::Deserialize;
use thiserror::Error;

use super::middleware::MaybeUser;
use super::provider::{ProviderError, UserInfo};
use super::session::{
    Session, build_session_cookie, clear_session_cookie, create_session_token,
};
use crate::AppState;
use crate::config::Variant;
use crate::error::AppError;
use crate::metrics::{CALLBACKS_TOTAL, LOGINS_TOTAL, LOGOUTS_TOTAL};

/// Cookie holding the CSRF state between login and callback
pub const OAUTH_STATE_COOKIE: &str = "oauth_state";

/// Path of the provider callback
pub const CALLBACK_PATH: &str = "/auth";

/// How long a login may take between redirect and callback
const STATE_COOKIE_MAX_AGE: time::Duration = time::Duration::minutes(10);

/// Create authentication router
///
/// Routes (basic):
/// - GET /login - Redirect to Google
///
/// Routes (dashboard):
/// - GET /login - Login page
/// - GET /login/google - Redirect to Google
///
/// Routes (both):
/// - GET /auth - OAuth callback
/// - GET|POST /logout - Logout
pub fn auth_router(variant: Variant) -> Router<AppState> {
    let router = match variant {
        Variant::Basic => Router::new().route("/login", get(start_login)),
        Variant::Dashboard => Router::new()
            .route("/login", get(login_page))
            .route("/login/google", get(start_login)),
    };

    router
        .route(CALLBACK_PATH, get(callback))
        .route("/logout", get(logout).post(logout))
}

// =============================================================================
// Login Page
// =============================================================================

/// GET /login (dashboard)
///
/// Renders the sign-in page, or sends signed-in users home.
async fn login_page(State(state): State<AppState>, user: MaybeUser) -> Response {
    if user.is_authenticated() {
        return Redirect::to("/").into_response();
    }

    let notice = if state.provider.is_none() && !state.config.auth.demo_login {
        "<p><em>Google OAuth is not configured on this server.</em></p>"
    } else {
        ""
    };

    Html(format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Sign in</title></head>
<body>
    <h1>Sign in</h1>
    {notice}
    <a href="/login/google">Sign in with Google</a>
</body>
</html>"#
    ))
    .into_response()
}

// =============================================================================
// Google OAuth
// =============================================================================

/// GET /login (basic), GET /login/google (dashboard)
///
/// # Steps
/// 1. Generate CSRF state token
/// 2. Store state in cookie
/// 3. Redirect to the provider with client_id, redirect_uri, scope, state
///
/// Without provider credentials this either fails with 500 or, when
/// `auth.demo_login` is on, writes a synthetic session.
async fn start_login(
    State(state): State<AppState>,
    Host(host): Host,
    jar: CookieJar,
) -> Result<Response, AppError> {
    let Some(provider) = state.provider.clone() else {
        if state.config.auth.demo_login {
            return demo_login(&state, jar);
        }
        LOGINS_TOTAL.with_label_values(&["not_configured"]).inc();
        return Err(AppError::ProviderNotConfigured);
    };

    let redirect_uri = callback_url(&state, &host);
    let csrf_state = generate_csrf_state();

    let location = provider
        .authorization_url(&redirect_uri, &csrf_state)
        .await
        .map_err(|e| {
            LOGINS_TOTAL.with_label_values(&["provider_error"]).inc();
            AppError::Provider(e.to_string())
        })?;

    LOGINS_TOTAL.with_label_values(&["redirected"]).inc();
    tracing::info!(%redirect_uri, "Redirecting to identity provider");

    let cookie = build_state_cookie(
        csrf_state,
        state.config.server.should_use_secure_cookies(),
    );
    Ok((jar.add(cookie), Redirect::to(location.as_str())).into_response())
}

fn demo_login(state: &AppState, jar: CookieJar) -> Result<Response, AppError> {
    let session = Session::new(
        "Demo User".to_string(),
        "demo@example.com".to_string(),
        "demo-user".to_string(),
        state.config.auth.session_max_age,
    );
    let token = create_session_token(&session, &state.session_secret)?;

    LOGINS_TOTAL.with_label_values(&["demo"]).inc();
    tracing::warn!("Google OAuth not configured; created demo session");

    let cookie = build_session_cookie(token, state.config.server.should_use_secure_cookies());
    Ok((jar.add(cookie), Redirect::to("/")).into_response())
}

/// Query parameters from the provider callback
#[derive(Debug, Deserialize)]
struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

/// Why a callback did not produce a session
#[derive(Debug, Error)]
enum CallbackError {
    #[error(
        "Google OAuth is not configured. Set GOOGLE_CLIENT_ID and GOOGLE_CLIENT_SECRET to enable login."
    )]
    NotConfigured,
    #[error("authorization denied: {0}")]
    Denied(String),
    #[error("missing authorization code")]
    MissingCode,
    #[error("mismatching_state: CSRF Warning! State not equal in request and response.")]
    StateMismatch,
    #[error("{0}")]
    Provider(#[from] ProviderError),
    #[error("{0}")]
    Session(#[from] AppError),
}

impl CallbackError {
    fn status(&self) -> StatusCode {
        match self {
            CallbackError::NotConfigured | CallbackError::Session(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            CallbackError::Denied(_) | CallbackError::MissingCode | CallbackError::StateMismatch => {
                StatusCode::BAD_REQUEST
            }
            CallbackError::Provider(_) => StatusCode::BAD_GATEWAY,
        }
    }

    fn outcome(&self) -> &'static str {
        match self {
            CallbackError::NotConfigured => "not_configured",
            CallbackError::Denied(_) => "denied",
            CallbackError::MissingCode => "missing_code",
            CallbackError::StateMismatch => "state_mismatch",
            CallbackError::Provider(_) => "provider_error",
            CallbackError::Session(_) => "session_error",
        }
    }
}

impl IntoResponse for CallbackError {
    fn into_response(self) -> Response {
        let message = self.to_string();
        let body = format!("Error: {}", html_escape::encode_text(&message));
        (self.status(), Html(body)).into_response()
    }
}

/// GET /auth
///
/// Handles OAuth callback from the provider.
///
/// # Steps
/// 1. Verify CSRF state
/// 2. Exchange code for tokens and userinfo
/// 3. Create session and set cookie (only when userinfo is present)
/// 4. Redirect to home
///
/// Any failure leaves the session cookie untouched.
async fn callback(
    State(state): State<AppState>,
    Host(host): Host,
    jar: CookieJar,
    Query(query): Query<CallbackQuery>,
) -> Response {
    let expected_state = jar
        .get(OAUTH_STATE_COOKIE)
        .map(|cookie| cookie.value().to_owned());
    let jar = jar.add(clear_state_cookie());

    match complete_login(&state, &host, expected_state.as_deref(), query).await {
        Ok(Some(user)) => {
            let session = Session::new(
                user.name,
                user.email,
                user.sub,
                state.config.auth.session_max_age,
            );
            let token = match create_session_token(&session, &state.session_secret) {
                Ok(token) => token,
                Err(error) => return (jar, CallbackError::from(error)).into_response(),
            };

            CALLBACKS_TOTAL.with_label_values(&["success"]).inc();
            tracing::info!(email = %session.email, "User signed in");

            let cookie =
                build_session_cookie(token, state.config.server.should_use_secure_cookies());
            (jar.add(cookie), Redirect::to("/")).into_response()
        }
        Ok(None) => {
            CALLBACKS_TOTAL.with_label_values(&["no_userinfo"]).inc();
            tracing::info!("Provider returned no userinfo; session left unset");
            (jar, Redirect::to("/")).into_response()
        }
        Err(error) => {
            CALLBACKS_TOTAL.with_label_values(&[error.outcome()]).inc();
            tracing::warn!(%error, "OAuth callback failed");
            (jar, error).into_response()
        }
    }
}

async fn complete_login(
    state: &AppState,
    host: &str,
    expected_state: Option<&str>,
    query: CallbackQuery,
) -> Result<Option<UserInfo>, CallbackError> {
    let provider = state
        .provider
        .as_ref()
        .ok_or(CallbackError::NotConfigured)?;

    if let Some(error) = query.error {
        let detail = query
            .error_description
            .map(|description| format!("{error} ({description})"))
            .unwrap_or(error);
        return Err(CallbackError::Denied(detail));
    }

    verify_csrf_state(query.state.as_deref(), expected_state)?;

    let code = query
        .code
        .filter(|code| !code.is_empty())
        .ok_or(CallbackError::MissingCode)?;

    let redirect_uri = callback_url(state, host);
    let token = provider.exchange_code(&code, &redirect_uri).await?;
    Ok(token.userinfo)
}

// =============================================================================
// Logout
// =============================================================================

/// GET|POST /logout
///
/// Clears the session cookie and redirects home. Idempotent.
async fn logout(jar: CookieJar, user: MaybeUser) -> impl IntoResponse {
    LOGOUTS_TOTAL.inc();
    if let Some(session) = &user.0 {
        tracing::info!(email = %session.email, "User signed out");
    }

    let jar = jar.add(clear_session_cookie()).add(clear_state_cookie());
    (jar, Redirect::to("/"))
}

// =============================================================================
// Helpers
// =============================================================================

/// Absolute callback URL handed to the provider
fn callback_url(state: &AppState, host: &str) -> String {
    let base = state
        .config
        .server
        .public_base_url()
        .unwrap_or_else(|| format!("http://{host}"));
    format!("{base}{CALLBACK_PATH}")
}

/// Generate a random CSRF state token
fn generate_csrf_state() -> String {
    let mut bytes = [0_u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Verify CSRF state from cookie matches callback state
fn verify_csrf_state(received: Option<&str>, expected: Option<&str>) -> Result<(), CallbackError> {
    match (received, expected) {
        (Some(received), Some(expected)) if !expected.is_empty() && received == expected => Ok(()),
        _ => Err(CallbackError::StateMismatch),
    }
}

fn build_state_cookie(csrf_state: String, secure: bool) -> Cookie<'static> {
    Cookie::build((OAUTH_STATE_COOKIE, csrf_state))
        .path("/")
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(STATE_COOKIE_MAX_AGE)
        .build()
}

fn clear_state_cookie() -> Cookie<'static> {
    let mut cookie = Cookie::build((OAUTH_STATE_COOKIE, ""))
        .path("/")
        .http_only(true)
        .build();
    cookie.make_removal();
    cookie
}
