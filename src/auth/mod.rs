//! Google OAuth authentication
//!
//! Handles:
//! - Google OAuth flow
//! - Session management
//! - Authentication middleware

mod middleware;
mod oauth;
pub mod provider;
pub mod session;

pub use middleware::{MaybeUser, require_auth};
pub use oauth::{CALLBACK_PATH, OAUTH_STATE_COOKIE, auth_router};
pub use provider::{GoogleProvider, IdentityProvider, ProviderError, ProviderToken, UserInfo};
pub use session::{Session, TokenUsage, create_session_token, verify_session_token};
