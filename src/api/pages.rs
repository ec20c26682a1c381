//! HTML pages
//!
//! - / (home)

use axum::{
    Router,
    response::{Html, IntoResponse, Redirect, Response},
    routing::get,
};
use html_escape::encode_text;

use crate::AppState;
use crate::auth::{MaybeUser, Session};
use crate::config::Variant;

/// Create pages router
///
/// `/` shows an anonymous landing page in the basic variant and
/// redirects to `/login` in the dashboard variant.
pub fn pages_router(variant: Variant) -> Router<AppState> {
    match variant {
        Variant::Basic => Router::new().route("/", get(basic_home)),
        Variant::Dashboard => Router::new().route("/", get(dashboard_home)),
    }
}

/// GET / (basic)
async fn basic_home(MaybeUser(user): MaybeUser) -> Html<String> {
    match user {
        Some(session) => Html(format!(
            r#"
        <h1>Welcome {name}!</h1>
        <p>Email: {email}</p>
        <p>Google ID: {google_id}</p>
        <a href="/logout">Logout</a>
        <br><br>
        <a href="/test-data">Test JSON Data</a>
        "#,
            name = encode_text(&session.name),
            email = encode_text(&session.email),
            google_id = encode_text(&session.google_id),
        )),
        None => Html(
            r#"
    <h1>Google OAuth Test</h1>
    <a href="/login">Login with Google</a>
    <br><br>
    <a href="/test-data">Test JSON Data</a>
    "#
            .to_string(),
        ),
    }
}

/// GET / (dashboard)
async fn dashboard_home(MaybeUser(user): MaybeUser) -> Response {
    let Some(session) = user else {
        return Redirect::to("/login").into_response();
    };

    Html(render_dashboard(&session)).into_response()
}

fn render_dashboard(session: &Session) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head><title>Dashboard</title></head>
<body>
    <h1>Dashboard</h1>
    <p>Signed in as {name} ({email})</p>
    <p>Google ID: {google_id}</p>
    <p>Tokens used: {tokens_used}</p>
    <ul>
        <li><a href="/tokens">Token usage</a></li>
        <li><a href="/test">Configuration test</a></li>
        <li><a href="/health">Health</a></li>
    </ul>
    <a href="/logout">Logout</a>
</body>
</html>"#,
        name = encode_text(&session.name),
        email = encode_text(&session.email),
        google_id = encode_text(&session.google_id),
        tokens_used = session.usage.tokens_used,
    )
}
