//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration files (config/default.toml, config/local.toml)
//! 3. Environment variables (OAUTH_PORTAL__*)
//! 4. Plain deployment variables (GOOGLE_CLIENT_ID, PORT, ...)

use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub auth: AuthConfig,
    pub app: PortalConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (default: 5000)
    pub port: u16,
    /// Externally visible base URL, e.g. "https://portal.example.com".
    ///
    /// When unset, callback URLs are derived from the request's Host header.
    pub public_url: Option<String>,
    /// Debug mode (FLASK_DEBUG)
    #[serde(default)]
    pub debug: bool,
}

impl ServerConfig {
    /// Address the listener binds to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Configured public base URL without a trailing slash
    pub fn public_base_url(&self) -> Option<String> {
        self.public_url
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(|value| value.trim_end_matches('/').to_string())
    }

    pub fn should_use_secure_cookies(&self) -> bool {
        self.public_base_url()
            .is_some_and(|url| url.to_ascii_lowercase().starts_with("https://"))
    }
}

/// Authentication configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    /// Session signing secret (32+ bytes). Generated at startup when absent.
    pub session_secret: Option<String>,
    /// Session max age in seconds (default: 604800 = 7 days)
    pub session_max_age: i64,
    /// Write a synthetic session on login when Google is not configured
    #[serde(default)]
    pub demo_login: bool,
    pub google: GoogleOAuthConfig,
}

impl AuthConfig {
    pub fn session_secret_configured(&self) -> bool {
        non_empty(&self.session_secret).is_some()
    }
}

/// Google OAuth configuration
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleOAuthConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// OpenID Connect discovery document
    pub discovery_url: String,
}

impl GoogleOAuthConfig {
    pub fn client_id(&self) -> Option<&str> {
        non_empty(&self.client_id)
    }

    pub fn client_secret(&self) -> Option<&str> {
        non_empty(&self.client_secret)
    }

    /// Both halves of the client credentials are present
    pub fn is_configured(&self) -> bool {
        self.client_id().is_some() && self.client_secret().is_some()
    }
}

/// Which of the two portal flavours to serve
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Variant {
    /// Anonymous landing page, `/login` redirects straight to Google
    #[default]
    Basic,
    /// Login-gated dashboard with a sign-in page at `/login`
    Dashboard,
}

/// Portal-level settings
#[derive(Debug, Clone, Deserialize)]
pub struct PortalConfig {
    #[serde(default)]
    pub variant: Variant,
    /// Only reported by the status endpoints
    pub openrouter_api_key: Option<String>,
}

impl PortalConfig {
    pub fn openrouter_configured(&self) -> bool {
        non_empty(&self.openrouter_api_key).is_some()
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl LoggingConfig {
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }

    /// Default `EnvFilter` directive; debug mode raises the level to `debug`
    pub fn filter_directive(&self, debug: bool) -> String {
        let level = if debug { "debug" } else { self.level.as_str() };
        format!("oauth_portal={level},tower_http={level}")
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
}

fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

impl AppConfig {
    /// Load configuration from files and the process environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (OAUTH_PORTAL__*)
    /// 5. GOOGLE_CLIENT_ID, GOOGLE_CLIENT_SECRET, SESSION_SECRET,
    ///    OPENROUTER_API_KEY, PORT, FLASK_DEBUG
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        Self::load_with(|key| std::env::var(key).ok())
    }

    /// Same as [`AppConfig::load`] with the plain deployment variables read
    /// through `lookup`.
    pub fn load_with<F>(lookup: F) -> Result<Self, crate::error::AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        use config::{Config, Environment, File};

        let port = match lookup("PORT") {
            Some(raw) => Some(raw.trim().parse::<u16>().map_err(|_| {
                crate::error::AppError::Config(format!("PORT must be a valid port number: {raw}"))
            })?),
            None => None,
        };

        let config = Config::builder()
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 5000)?
            .set_default("server.debug", false)?
            .set_default("auth.session_max_age", 604800)?
            .set_default("auth.demo_login", false)?
            .set_default(
                "auth.google.discovery_url",
                "https://accounts.google.com/.well-known/openid-configuration",
            )?
            .set_default("app.variant", "basic")?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(
                Environment::with_prefix("OAUTH_PORTAL")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("auth.google.client_id", lookup("GOOGLE_CLIENT_ID"))?
            .set_override_option("auth.google.client_secret", lookup("GOOGLE_CLIENT_SECRET"))?
            .set_override_option("auth.session_secret", lookup("SESSION_SECRET"))?
            .set_override_option("app.openrouter_api_key", lookup("OPENROUTER_API_KEY"))?
            .set_override_option("server.port", port.map(i64::from))?
            .set_override_option("server.debug", lookup("FLASK_DEBUG").map(|v| is_truthy(&v)))?
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    fn validate(&self) -> Result<(), crate::error::AppError> {
        const MIN_SESSION_SECRET_BYTES: usize = 32;

        if non_empty(&self.auth.session_secret)
            .is_some_and(|secret| secret.len() < MIN_SESSION_SECRET_BYTES)
        {
            return Err(crate::error::AppError::Config(format!(
                "auth.session_secret must be at least {} bytes",
                MIN_SESSION_SECRET_BYTES
            )));
        }

        if self.auth.session_max_age <= 0 {
            return Err(crate::error::AppError::Config(
                "auth.session_max_age must be greater than 0".to_string(),
            ));
        }

        if self.auth.session_max_age > crate::auth::session::MAX_SESSION_AGE_SECS {
            return Err(crate::error::AppError::Config(format!(
                "auth.session_max_age must be at most {} seconds",
                crate::auth::session::MAX_SESSION_AGE_SECS
            )));
        }

        if let Some(public_url) = self.server.public_base_url() {
            url::Url::parse(&public_url).map_err(|e| {
                crate::error::AppError::Config(format!("server.public_url is not a valid URL: {e}"))
            })?;
        }

        Ok(())
    }

    /// Log degraded-but-valid settings once logging is up
    pub fn warn_degraded(&self) {
        if !self.auth.session_secret_configured() {
            tracing::warn!(
                "SESSION_SECRET is not set; a random secret will be generated and sessions will not survive restarts"
            );
        }

        if !self.auth.google.is_configured() {
            tracing::warn!(
                demo_login = self.auth.demo_login,
                "GOOGLE_CLIENT_ID / GOOGLE_CLIENT_SECRET not set; Google login is unavailable"
            );
        }
    }
}
