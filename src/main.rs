//! oauth-portal binary entry point

use oauth_portal::{AppState, config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Application entry point
///
/// # Setup
/// 1. Load .env
/// 2. Load configuration from files and environment
/// 3. Initialize tracing/logging from the loaded configuration
/// 4. Initialize metrics and AppState
/// 5. Build Axum router
/// 6. Start HTTP server
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load .env (missing file is fine)
    let dotenv_loaded = dotenv::dotenv().is_ok();

    // 2. Load configuration
    let config = config::AppConfig::load()?;

    // 3. Initialize tracing/logging
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        config
            .logging
            .filter_directive(config.server.debug)
            .into()
    });

    if config.logging.is_json() {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .init();
    }

    tracing::info!(dotenv_loaded, "Starting oauth-portal...");
    tracing::info!(
        variant = ?config.app.variant,
        debug = config.server.debug,
        google_configured = config.auth.google.is_configured(),
        "Configuration loaded"
    );
    config.warn_degraded();

    // 4. Initialize metrics and application state
    oauth_portal::metrics::init_metrics();

    let addr = config.server.bind_address();
    let public_url = config.server.public_base_url();
    let state = AppState::new(config)?;

    // 5. Build Axum router
    let app = oauth_portal::build_router(state);

    // 6. Start HTTP server
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    if let Some(public_url) = public_url {
        tracing::info!("Public URL: {}", public_url);
    }

    axum::serve(listener, app).await?;

    Ok(())
}
