//! E2E tests for the Google OAuth flow and cookie sessions

mod common;

use common::{
    GOOD_CODE, NO_ID_TOKEN_CODE, PARTIAL_CLAIMS_CODE, TestServer, cookie_value, set_cookies,
};
use oauth_portal::auth::verify_session_token;
use oauth_portal::config::Variant;

#[tokio::test]
async fn test_login_redirects_to_provider() {
    let server = TestServer::new().await;

    let response = server.client.get(server.url("/login")).send().await.unwrap();

    assert!(response.status().is_redirection());
    let location = response
        .headers()
        .get("location")
        .and_then(|v| v.to_str().ok())
        .expect("location header");
    assert!(location.starts_with(&format!("{}/authorize?", server.provider_addr)));
    assert!(location.contains("client_id=test-client-id"));
    assert!(location.contains("scope=openid+email+profile"));
    assert!(location.contains("response_type=code"));
    assert!(location.contains("redirect_uri=http%3A%2F%2F127.0.0.1"));

    assert!(cookie_value(&response, "oauth_state").is_some_and(|v| !v.is_empty()));
    assert!(cookie_value(&response, "session").is_none());
}

#[tokio::test]
async fn test_full_login_flow_populates_session() {
    let server = TestServer::new().await;
    let state = server.begin_login("/login").await;

    let response = server
        .client
        .get(server.url(&format!("/auth?code={GOOD_CODE}&state={state}")))
        .header("Cookie", format!("oauth_state={state}"))
        .send()
        .await
        .unwrap();

    assert!(response.status().is_redirection());
    assert_eq!(response.headers()["location"], "/");

    let token = cookie_value(&response, "session").expect("session cookie");
    let session = verify_session_token(&token, &server.state.session_secret).unwrap();
    assert_eq!(session.name, "Ada Lovelace");
    assert_eq!(session.email, "ada@example.com");
    assert_eq!(session.google_id, "1234567890");

    let home = server
        .client
        .get(server.url("/"))
        .header("Cookie", format!("session={token}"))
        .send()
        .await
        .unwrap();
    let body = home.text().await.unwrap();
    assert!(body.contains("Welcome Ada Lovelace!"));
    assert!(body.contains("Email: ada@example.com"));
    assert!(body.contains("Google ID: 1234567890"));
}

#[tokio::test]
async fn test_callback_without_id_token_leaves_session_unset() {
    let server = TestServer::new().await;
    let state = server.begin_login("/login").await;

    let response = server
        .client
        .get(server.url(&format!("/auth?code={NO_ID_TOKEN_CODE}&state={state}")))
        .header("Cookie", format!("oauth_state={state}"))
        .send()
        .await
        .unwrap();

    assert!(response.status().is_redirection());
    assert!(cookie_value(&response, "session").is_none());
}

#[tokio::test]
async fn test_callback_with_malformed_claims_reports_error() {
    let server = TestServer::new().await;
    let state = server.begin_login("/login").await;

    let response = server
        .client
        .get(server.url(&format!("/auth?code={PARTIAL_CLAIMS_CODE}&state={state}")))
        .header("Cookie", format!("oauth_state={state}"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 502);
    assert!(cookie_value(&response, "session").is_none());
    let body = response.text().await.unwrap();
    assert!(body.starts_with("Error: "));
    assert!(body.contains("name"));
}

#[tokio::test]
async fn test_callback_with_rejected_code_reports_error() {
    let server = TestServer::new().await;
    let state = server.begin_login("/login").await;

    let response = server
        .client
        .get(server.url(&format!("/auth?code=bogus&state={state}")))
        .header("Cookie", format!("oauth_state={state}"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 502);
    let body = response.text().await.unwrap();
    assert!(body.contains("invalid_grant"));
}

#[tokio::test]
async fn test_callback_rejects_missing_csrf_cookie() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url(&format!("/auth?code={GOOD_CODE}&state=dummy")))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    assert!(cookie_value(&response, "session").is_none());
}

#[tokio::test]
async fn test_failed_callback_keeps_existing_session() {
    let server = TestServer::new().await;
    let existing = server.session_cookie();

    let response = server
        .client
        .get(server.url("/auth?code=bogus&state=s"))
        .header("Cookie", format!("{existing}; oauth_state=s"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 502);
    assert!(
        !set_cookies(&response)
            .iter()
            .any(|c| c.starts_with("session=")),
        "failed callback must not touch the session cookie"
    );
}

#[tokio::test]
async fn test_login_without_credentials_is_500() {
    let server = TestServer::with(|config| {
        config.auth.google.client_id = None;
        config.auth.google.client_secret = None;
    })
    .await;

    let response = server.client.get(server.url("/login")).send().await.unwrap();

    assert_eq!(response.status(), 500);
    let body = response.text().await.unwrap();
    assert!(body.contains("GOOGLE_CLIENT_ID"));
}

#[tokio::test]
async fn test_logout_clears_session_cookies() {
    let server = TestServer::new().await;

    let response = server
        .client
        .get(server.url("/logout"))
        .header(
            "Cookie",
            format!("{}; oauth_state=dummy-state", server.session_cookie()),
        )
        .send()
        .await
        .unwrap();

    assert!(response.status().is_redirection());
    assert_eq!(cookie_value(&response, "session").as_deref(), Some(""));
    assert_eq!(cookie_value(&response, "oauth_state").as_deref(), Some(""));
}

#[tokio::test]
async fn test_logout_is_idempotent() {
    let server = TestServer::new().await;

    for _ in 0..2 {
        let response = server
            .client
            .post(server.url("/logout"))
            .send()
            .await
            .unwrap();
        assert!(response.status().is_redirection());
        assert_eq!(cookie_value(&response, "session").as_deref(), Some(""));
    }
}

#[tokio::test]
async fn test_dashboard_home_redirects_to_login() {
    let server = TestServer::with(|config| config.app.variant = Variant::Dashboard).await;

    let response = server.client.get(server.url("/")).send().await.unwrap();

    assert!(response.status().is_redirection());
    assert_eq!(response.headers()["location"], "/login");
}

#[tokio::test]
async fn test_dashboard_login_page_and_google_redirect() {
    let server = TestServer::with(|config| config.app.variant = Variant::Dashboard).await;

    let page = server.client.get(server.url("/login")).send().await.unwrap();
    assert_eq!(page.status(), 200);
    assert!(page.text().await.unwrap().contains("Sign in with Google"));

    let state = server.begin_login("/login/google").await;
    assert!(!state.is_empty());
}

#[tokio::test]
async fn test_dashboard_shows_signed_in_user() {
    let server = TestServer::with(|config| config.app.variant = Variant::Dashboard).await;

    let response = server
        .client
        .get(server.url("/"))
        .header("Cookie", server.session_cookie())
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body = response.text().await.unwrap();
    assert!(body.contains("testuser@example.com"));
    assert!(body.contains("Tokens used: 0"));
}

#[tokio::test]
async fn test_demo_login_without_credentials() {
    let server = TestServer::with(|config| {
        config.app.variant = Variant::Dashboard;
        config.auth.demo_login = true;
        config.auth.google.client_id = None;
        config.auth.google.client_secret = None;
    })
    .await;

    let response = server
        .client
        .get(server.url("/login/google"))
        .send()
        .await
        .unwrap();

    assert!(response.status().is_redirection());
    let token = cookie_value(&response, "session").expect("session cookie");
    let session = verify_session_token(&token, &server.state.session_secret).unwrap();
    assert_eq!(session.name, "Demo User");
}
