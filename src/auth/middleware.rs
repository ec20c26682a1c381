//! Authentication middleware
//!
//! Resolves the signed session cookie into a [`Session`] for handlers.

use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts, State},
    http::{HeaderMap, Request, request::Parts},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;

use super::session::{SESSION_COOKIE, Session, verify_session_token};
use crate::AppState;
use crate::error::AppError;

fn extract_token_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .map(ToOwned::to_owned)
        .or_else(|| {
            let jar = CookieJar::from_headers(headers);
            jar.get(SESSION_COOKIE)
                .map(|cookie| cookie.value().to_owned())
        })
        .filter(|token| !token.is_empty())
}

fn authenticate_headers(headers: &HeaderMap, state: &AppState) -> Option<Session> {
    let token = extract_token_from_headers(headers)?;
    match verify_session_token(&token, &state.session_secret) {
        Ok(session) => Some(session),
        Err(error) => {
            tracing::debug!(%error, "Ignoring invalid session token");
            None
        }
    }
}

/// Middleware to require authentication
///
/// Extracts and verifies the session from cookie or Authorization header.
/// Adds Session to request extensions if valid.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let session = authenticate_headers(request.headers(), &state).ok_or(AppError::Unauthorized)?;
    request.extensions_mut().insert(session);
    Ok(next.run(request).await)
}

/// Optional current user extractor
///
/// Returns None if not authenticated, instead of error. A tampered,
/// malformed or expired cookie is indistinguishable from no cookie.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<Session>);

#[async_trait]
impl<S> FromRequestParts<S> for MaybeUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(session) = parts.extensions.get::<Session>().cloned() {
            return Ok(MaybeUser(Some(session)));
        }

        let app_state = AppState::from_ref(state);
        let session = authenticate_headers(&parts.headers, &app_state);

        if let Some(session) = &session {
            parts.extensions.insert(session.clone());
        }

        Ok(MaybeUser(session))
    }
}

impl MaybeUser {
    pub fn is_authenticated(&self) -> bool {
        self.0.is_some()
    }
}
