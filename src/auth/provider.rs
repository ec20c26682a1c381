//! Identity provider client
//!
//! Talks to an OpenID Connect provider (Google) using the discovery
//! document, the authorization code grant and the userinfo endpoint.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tokio::sync::OnceCell;
use url::Url;

const USER_AGENT: &str = concat!("oauth-portal/", env!("CARGO_PKG_VERSION"));
const SCOPES: &[&str] = &["openid", "email", "profile"];

/// Identity claims required to populate a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserInfo {
    pub name: String,
    pub email: String,
    pub sub: String,
}

/// Result of a successful code exchange
///
/// `userinfo` is absent when the provider did not issue an ID token.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderToken {
    pub userinfo: Option<UserInfo>,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("request to identity provider failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("invalid provider metadata: {0}")]
    Metadata(String),
    #[error("token exchange failed: {0}")]
    TokenExchange(String),
    #[error("malformed userinfo: {0}")]
    MalformedClaims(String),
}

/// An OAuth2/OpenID identity provider
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// URL the browser is sent to for authorization
    async fn authorization_url(&self, redirect_uri: &str, state: &str)
    -> Result<Url, ProviderError>;

    /// Exchange an authorization code for identity claims
    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<ProviderToken, ProviderError>;
}

/// Subset of the OpenID discovery document we rely on
#[derive(Debug, Clone, Deserialize)]
struct ProviderMetadata {
    authorization_endpoint: String,
    token_endpoint: String,
    userinfo_endpoint: String,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TokenResponse {
    Success {
        access_token: String,
        #[allow(dead_code)]
        token_type: String,
        id_token: Option<String>,
    },
    Error {
        error: String,
        error_description: Option<String>,
    },
}

#[derive(Debug, Deserialize)]
struct RawUserInfo {
    sub: Option<String>,
    name: Option<String>,
    email: Option<String>,
}

impl RawUserInfo {
    fn into_user_info(self) -> Result<UserInfo, ProviderError> {
        fn required(value: Option<String>, claim: &str) -> Result<String, ProviderError> {
            value
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ProviderError::MalformedClaims(format!("missing '{claim}' claim")))
        }

        Ok(UserInfo {
            name: required(self.name, "name")?,
            email: required(self.email, "email")?,
            sub: required(self.sub, "sub")?,
        })
    }
}

/// Google OpenID Connect client
pub struct GoogleProvider {
    client: Client,
    client_id: String,
    client_secret: String,
    discovery_url: String,
    metadata: OnceCell<ProviderMetadata>,
}

impl GoogleProvider {
    pub fn new(
        client_id: String,
        client_secret: String,
        discovery_url: String,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            client_id,
            client_secret,
            discovery_url,
            metadata: OnceCell::new(),
        })
    }

    /// Fetch the discovery document once and cache it
    async fn metadata(&self) -> Result<&ProviderMetadata, ProviderError> {
        self.metadata
            .get_or_try_init(|| async {
                tracing::debug!(url = %self.discovery_url, "Fetching provider metadata");
                let response = self
                    .client
                    .get(&self.discovery_url)
                    .send()
                    .await?
                    .error_for_status()?;
                let metadata: ProviderMetadata = response
                    .json()
                    .await
                    .map_err(|e| ProviderError::Metadata(e.to_string()))?;
                Ok::<_, ProviderError>(metadata)
            })
            .await
    }

    async fn fetch_userinfo(
        &self,
        endpoint: &str,
        access_token: &str,
    ) -> Result<UserInfo, ProviderError> {
        let response = self
            .client
            .get(endpoint)
            .bearer_auth(access_token)
            .send()
            .await?
            .error_for_status()?;

        let raw: RawUserInfo = response
            .json()
            .await
            .map_err(|e| ProviderError::MalformedClaims(e.to_string()))?;
        raw.into_user_info()
    }
}

#[async_trait]
impl IdentityProvider for GoogleProvider {
    async fn authorization_url(
        &self,
        redirect_uri: &str,
        state: &str,
    ) -> Result<Url, ProviderError> {
        let metadata = self.metadata().await?;
        let mut url = Url::parse(&metadata.authorization_endpoint)
            .map_err(|e| ProviderError::Metadata(format!("authorization_endpoint: {e}")))?;
        {
            let mut qp = url.query_pairs_mut();
            qp.append_pair("client_id", &self.client_id);
            qp.append_pair("redirect_uri", redirect_uri);
            qp.append_pair("response_type", "code");
            qp.append_pair("scope", &SCOPES.join(" "));
            qp.append_pair("state", state);
        }
        Ok(url)
    }

    async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<ProviderToken, ProviderError> {
        let metadata = self.metadata().await?;

        let response = self
            .client
            .post(&metadata.token_endpoint)
            .header("Accept", "application/json")
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("code", code),
                ("grant_type", "authorization_code"),
                ("redirect_uri", redirect_uri),
            ])
            .send()
            .await?;

        let status = response.status();
        let token: TokenResponse = response.json().await.map_err(|_| {
            ProviderError::TokenExchange(format!("unexpected token response (status {status})"))
        })?;

        match token {
            TokenResponse::Success {
                access_token,
                id_token,
                ..
            } => {
                if id_token.is_none() {
                    tracing::debug!("Token response carried no id_token; no userinfo available");
                    return Ok(ProviderToken::default());
                }
                let userinfo = self
                    .fetch_userinfo(&metadata.userinfo_endpoint, &access_token)
                    .await?;
                Ok(ProviderToken {
                    userinfo: Some(userinfo),
                })
            }
            TokenResponse::Error {
                error,
                error_description,
            } => {
                let detail = error_description
                    .map(|description| format!("{error}: {description}"))
                    .unwrap_or(error);
                Err(ProviderError::TokenExchange(detail))
            }
        }
    }
}
