//! Party and organisation registries

use super::http::PlatformHttp;
use super::{OrgDetails, OrgRegistry, Party, PartyRegistry};
use crate::config::schema::with_trailing_slash;
use crate::config::ArchivelinkConfig;
use crate::domain::{PlatformError, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Register API client
#[derive(Clone)]
pub struct HttpPartyRegistry {
    http: PlatformHttp,
    register_endpoint: String,
}

impl HttpPartyRegistry {
    pub fn new(config: &ArchivelinkConfig, http: PlatformHttp) -> Self {
        Self {
            http,
            register_endpoint: with_trailing_slash(&config.platform.register_endpoint),
        }
    }
}

#[async_trait]
impl PartyRegistry for HttpPartyRegistry {
    async fn get_party(&self, party_id: u64) -> Result<Party> {
        let url = format!("{}parties/{}", self.register_endpoint, party_id);
        let response = self.http.send(self.http.client().get(url)).await?;

        let party = response.json::<Party>().await.map_err(|e| {
            PlatformError::InvalidResponse(format!("Failed to parse party {party_id}: {e}"))
        })?;
        Ok(party)
    }
}

#[derive(Debug, Deserialize)]
struct OrgList {
    orgs: HashMap<String, OrgDetails>,
}

/// Organisation registry backed by the public org list
///
/// The list is fetched once and kept for the lifetime of the process.
pub struct HttpOrgRegistry {
    client: reqwest::Client,
    url: String,
    orgs: RwLock<Option<HashMap<String, OrgDetails>>>,
}

impl HttpOrgRegistry {
    pub fn new(config: &ArchivelinkConfig, http: &PlatformHttp) -> Self {
        Self {
            client: http.client().clone(),
            url: config.platform.org_registry_url.clone(),
            orgs: RwLock::new(None),
        }
    }

    async fn fetch(&self) -> Result<HashMap<String, OrgDetails>> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| PlatformError::ConnectionFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(PlatformError::from_status(status.as_u16(), body).into());
        }

        let list = response.json::<OrgList>().await.map_err(|e| {
            PlatformError::InvalidResponse(format!("Failed to parse org registry: {e}"))
        })?;
        Ok(list.orgs)
    }
}

#[async_trait]
impl OrgRegistry for HttpOrgRegistry {
    async fn get_org(&self, org: &str) -> Result<Option<OrgDetails>> {
        if let Some(orgs) = self.orgs.read().await.as_ref() {
            return Ok(orgs.get(org).cloned());
        }

        let mut guard = self.orgs.write().await;
        if guard.is_none() {
            tracing::debug!(url = %self.url, "Loading organisation registry");
            *guard = Some(self.fetch().await?);
        }
        Ok(guard.as_ref().and_then(|orgs| orgs.get(org).cloned()))
    }
}
