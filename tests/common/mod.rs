//! Common test utilities for E2E tests

#![allow(dead_code)]

use axum::{
    Form, Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use oauth_portal::{AppState, config};
use serde::Deserialize;
use tokio::net::TcpListener;

/// Authorization code the fake provider accepts with full claims
pub const GOOD_CODE: &str = "good-code";
/// Code that yields a token response without an ID token
pub const NO_ID_TOKEN_CODE: &str = "no-id-token";
/// Code whose userinfo lacks the `name` claim
pub const PARTIAL_CLAIMS_CODE: &str = "partial-claims";

pub const SESSION_SECRET: &str = "test-secret-key-32-bytes-long!!!";

/// Test server instance
pub struct TestServer {
    pub addr: String,
    pub provider_addr: String,
    pub state: AppState,
    pub client: reqwest::Client,
}

impl TestServer {
    /// Basic variant with Google configured against the fake provider
    pub async fn new() -> Self {
        Self::with(|_| {}).await
    }

    /// Start a server after letting the caller adjust the configuration
    pub async fn with<F>(customize: F) -> Self
    where
        F: FnOnce(&mut config::AppConfig),
    {
        let provider_addr = spawn_fake_provider().await;

        let mut config = config::AppConfig {
            server: config::ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                public_url: None,
                debug: false,
            },
            auth: config::AuthConfig {
                session_secret: Some(SESSION_SECRET.to_string()),
                session_max_age: 604800,
                demo_login: false,
                google: config::GoogleOAuthConfig {
                    client_id: Some("test-client-id".to_string()),
                    client_secret: Some("test-client-secret".to_string()),
                    discovery_url: format!("{provider_addr}/.well-known/openid-configuration"),
                },
            },
            app: config::PortalConfig {
                variant: config::Variant::Basic,
                openrouter_api_key: None,
            },
            logging: config::LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        };
        customize(&mut config);

        let state = AppState::new(config).unwrap();

        // Redirects are inspected by hand
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = oauth_portal::build_router(state.clone());

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr: format!("http://{}", addr),
            provider_addr,
            state,
            client,
        }
    }

    /// Get base URL for requests
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.addr, path)
    }

    /// Create a signed session cookie header value
    pub fn session_cookie(&self) -> String {
        use oauth_portal::auth::{Session, create_session_token};

        let session = Session::new(
            "Test User".to_string(),
            "testuser@example.com".to_string(),
            "1111".to_string(),
            3600,
        );
        let token = create_session_token(&session, &self.state.session_secret)
            .expect("Failed to create test token");
        format!("session={token}")
    }

    /// Run `/login` and return the CSRF state the server issued
    pub async fn begin_login(&self, path: &str) -> String {
        let response = self.client.get(self.url(path)).send().await.unwrap();
        assert!(response.status().is_redirection());

        let location = response.headers()["location"].to_str().unwrap();
        let location = url::Url::parse(location).unwrap();
        location
            .query_pairs()
            .find(|(key, _)| key == "state")
            .map(|(_, value)| value.into_owned())
            .expect("state parameter")
    }
}

/// Value of the named cookie from a response's Set-Cookie headers
pub fn cookie_value(response: &reqwest::Response, name: &str) -> Option<String> {
    set_cookies(response).into_iter().find_map(|raw| {
        let pair = raw.split(';').next()?.trim().to_string();
        let (key, value) = pair.split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}

pub fn set_cookies(response: &reqwest::Response) -> Vec<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok().map(ToString::to_string))
        .collect()
}

// =============================================================================
// Fake identity provider
// =============================================================================

async fn spawn_fake_provider() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());

    let app = Router::new()
        .route("/.well-known/openid-configuration", get(discovery))
        .route("/token", post(token))
        .route("/userinfo", get(userinfo))
        .with_state(base.clone());

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    base
}

async fn discovery(State(base): State<String>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "issuer": base,
        "authorization_endpoint": format!("{base}/authorize"),
        "token_endpoint": format!("{base}/token"),
        "userinfo_endpoint": format!("{base}/userinfo"),
    }))
}

#[derive(Debug, Deserialize)]
struct TokenForm {
    code: String,
    client_id: String,
    client_secret: String,
    grant_type: String,
}

async fn token(Form(form): Form<TokenForm>) -> Response {
    if form.client_id != "test-client-id"
        || form.client_secret != "test-client-secret"
        || form.grant_type != "authorization_code"
    {
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "error": "invalid_client" })),
        )
            .into_response();
    }

    let body = match form.code.as_str() {
        GOOD_CODE => serde_json::json!({
            "access_token": "at-good",
            "token_type": "Bearer",
            "id_token": "header.payload.signature",
        }),
        NO_ID_TOKEN_CODE => serde_json::json!({
            "access_token": "at-no-id",
            "token_type": "Bearer",
        }),
        PARTIAL_CLAIMS_CODE => serde_json::json!({
            "access_token": "at-partial",
            "token_type": "Bearer",
            "id_token": "header.payload.signature",
        }),
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({
                    "error": "invalid_grant",
                    "error_description": "Bad Request",
                })),
            )
                .into_response();
        }
    };

    Json(body).into_response()
}

async fn userinfo(headers: HeaderMap) -> Response {
    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    match token {
        Some("at-good") => Json(serde_json::json!({
            "sub": "1234567890",
            "name": "Ada Lovelace",
            "email": "ada@example.com",
            "email_verified": true,
        }))
        .into_response(),
        Some("at-partial") => Json(serde_json::json!({
            "sub": "1234567890",
            "email": "ada@example.com",
        }))
        .into_response(),
        _ => StatusCode::UNAUTHORIZED.into_response(),
    }
}
