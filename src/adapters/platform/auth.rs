//! Service owner access tokens
//!
//! Outside development the token is obtained with an OAuth2 client credentials
//! grant and cached until shortly before it expires. In development the local
//! platform harness mints test tokens on request.

use crate::config::{Environment, PlatformAuthConfig};
use crate::domain::{ArchiveError, PlatformError, Result};
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::Mutex;

/// Lifetime assumed for locally minted test tokens
const LOCAL_TOKEN_LIFETIME_SECONDS: i64 = 300;

#[derive(Debug, Default)]
struct TokenState {
    access_token: Option<String>,
    token_expiry: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
struct ClientCredentialsRequest<'a> {
    grant_type: &'a str,
    client_id: &'a str,
    client_secret: &'a str,
    scope: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

/// Caching access token provider
#[derive(Clone)]
pub struct TokenProvider {
    client: Client,
    config: PlatformAuthConfig,
    environment: Environment,
    org: String,
    state: Arc<Mutex<TokenState>>,
}

impl TokenProvider {
    pub fn new(
        client: Client,
        config: PlatformAuthConfig,
        environment: Environment,
        org: impl Into<String>,
    ) -> Self {
        Self {
            client,
            config,
            environment,
            org: org.into(),
            state: Arc::new(Mutex::new(TokenState::default())),
        }
    }

    /// Returns a valid access token, acquiring a new one when needed
    ///
    /// The lock is held during acquisition so concurrent callers wait for one
    /// token request instead of issuing their own.
    pub async fn access_token(&self) -> Result<String> {
        let mut state = self.state.lock().await;

        if let (Some(token), Some(expiry)) = (&state.access_token, state.token_expiry) {
            let margin = Duration::seconds(self.config.token_refresh_margin_seconds as i64);
            if expiry - Utc::now() > margin {
                return Ok(token.clone());
            }
            tracing::debug!(expires_at = %expiry, "Access token expiring soon, refreshing");
        }

        let (token, expiry) = match self.environment {
            Environment::Development => self.acquire_local_token().await?,
            _ => self.acquire_client_credentials_token().await?,
        };

        state.access_token = Some(token.clone());
        state.token_expiry = Some(expiry);

        tracing::debug!(expires_at = %expiry, "Acquired platform access token");
        Ok(token)
    }

    async fn acquire_local_token(&self) -> Result<(String, DateTime<Utc>)> {
        let scopes = self.config.scopes.join(" ");
        let response = self
            .client
            .get(&self.config.local_token_url)
            .query(&[
                ("org", self.org.as_str()),
                ("authenticationLevel", "3"),
                ("scopes", scopes.as_str()),
            ])
            .send()
            .await
            .map_err(|e| {
                PlatformError::ConnectionFailed(format!("Failed to request local test token: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(PlatformError::AuthenticationFailed(format!(
                "Local test token request failed with status {status}: {error_text}"
            ))
            .into());
        }

        let token = response.text().await.map_err(|e| {
            PlatformError::InvalidResponse(format!("Failed to read local test token: {e}"))
        })?;
        let token = token.trim().trim_matches('"').to_string();

        Ok((
            token,
            Utc::now() + Duration::seconds(LOCAL_TOKEN_LIFETIME_SECONDS),
        ))
    }

    async fn acquire_client_credentials_token(&self) -> Result<(String, DateTime<Utc>)> {
        use secrecy::ExposeSecret;

        let token_url = self.config.token_url.as_deref().ok_or_else(|| {
            ArchiveError::Configuration("platform.auth.token_url is not configured".to_string())
        })?;
        let client_id = self.config.client_id.as_deref().ok_or_else(|| {
            ArchiveError::Configuration("platform.auth.client_id is not configured".to_string())
        })?;
        let client_secret = self.config.client_secret.as_ref().ok_or_else(|| {
            ArchiveError::Configuration(
                "platform.auth.client_secret is not configured".to_string(),
            )
        })?;

        tracing::debug!(token_url = %token_url, client_id = %client_id, "Requesting access token");

        let request_body = ClientCredentialsRequest {
            grant_type: "client_credentials",
            client_id,
            client_secret: client_secret.expose_secret().as_str(),
            scope: self.config.scopes.join(" "),
        };

        let response = self
            .client
            .post(token_url)
            .form(&request_body)
            .send()
            .await
            .map_err(|e| {
                PlatformError::ConnectionFailed(format!("Failed to request access token: {e}"))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(PlatformError::AuthenticationFailed(format!(
                "Token request failed with status {status}: {error_text}"
            ))
            .into());
        }

        let token_response: TokenResponse = response.json().await.map_err(|e| {
            PlatformError::InvalidResponse(format!("Failed to parse token response: {e}"))
        })?;

        let expiry = Utc::now() + Duration::seconds(token_response.expires_in as i64);
        Ok((token_response.access_token, expiry))
    }
}
