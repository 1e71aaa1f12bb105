//! Authenticated HTTP access to the hosting platform
//!
//! Every platform request carries a bearer token and the platform access
//! token header, plus the subscription key when one is configured. In
//! development without a configured platform access token, the locally
//! minted test token fills the header.

use super::auth::TokenProvider;
use crate::config::{ArchivelinkConfig, Environment, SecretString};
use crate::domain::{PlatformError, Result};
use reqwest::{Client, ClientBuilder, RequestBuilder, Response};
use std::time::Duration;

/// Header carrying the application's platform access token
pub const PLATFORM_ACCESS_TOKEN_HEADER: &str = "PlatformAccessToken";

/// Header carrying the API management subscription key
pub const SUBSCRIPTION_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";

/// Shared HTTP client with platform authentication
#[derive(Clone)]
pub struct PlatformHttp {
    client: Client,
    tokens: TokenProvider,
    platform_access_token: Option<SecretString>,
    local_platform_token: bool,
    subscription_key: Option<SecretString>,
}

impl PlatformHttp {
    pub fn new(config: &ArchivelinkConfig) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.platform.timeout_seconds))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                PlatformError::ConnectionFailed(format!("Failed to build HTTP client: {e}"))
            })?;

        let tokens = TokenProvider::new(
            client.clone(),
            config.platform.auth.clone(),
            config.environment.clone(),
            config.application.org.clone(),
        );

        Ok(Self {
            client,
            tokens,
            platform_access_token: config.platform.platform_access_token.clone(),
            local_platform_token: config.environment == Environment::Development,
            subscription_key: config.platform.subscription_key.clone(),
        })
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Attaches authentication headers and sends the request
    ///
    /// Non-2xx responses are returned as [`PlatformError::ClientError`] or
    /// [`PlatformError::ServerError`] with the response body.
    pub async fn send(&self, request: RequestBuilder) -> Result<Response> {
        use secrecy::ExposeSecret;

        let token = self.tokens.access_token().await?;
        let mut request = match &self.platform_access_token {
            Some(platform_token) => request.header(
                PLATFORM_ACCESS_TOKEN_HEADER,
                platform_token.expose_secret().as_str(),
            ),
            None if self.local_platform_token => {
                request.header(PLATFORM_ACCESS_TOKEN_HEADER, token.as_str())
            }
            None => request,
        }
        .bearer_auth(token);

        if let Some(key) = &self.subscription_key {
            request = request.header(SUBSCRIPTION_KEY_HEADER, key.expose_secret().as_str());
        }

        let response = request
            .send()
            .await
            .map_err(|e| PlatformError::ConnectionFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PlatformError::from_status(status.as_u16(), body).into());
        }

        Ok(response)
    }
}
