//! Instance API client

use super::http::PlatformHttp;
use super::{InstanceClient, NewDataElement};
use crate::config::ArchivelinkConfig;
use crate::config::schema::with_trailing_slash;
use crate::domain::{DataElement, Instance, InstanceIdentifier, PlatformError, Result};
use async_trait::async_trait;
use reqwest::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use serde::Serialize;
use uuid::Uuid;

#[derive(Debug, Serialize)]
struct ProcessNextRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    action: Option<&'a str>,
}

/// HTTP implementation of [`InstanceClient`]
///
/// Reads and writes go to the storage API; process moves go through the
/// application itself so its process engine runs the transition.
#[derive(Clone)]
pub struct HttpInstanceClient {
    http: PlatformHttp,
    storage_endpoint: String,
    app_base_url: String,
}

impl HttpInstanceClient {
    pub fn new(config: &ArchivelinkConfig, http: PlatformHttp) -> Self {
        Self {
            http,
            storage_endpoint: with_trailing_slash(&config.platform.storage_endpoint),
            app_base_url: config.application.app_base_url(),
        }
    }

    fn instance_url(&self, id: &InstanceIdentifier) -> String {
        format!("{}instances/{}", self.storage_endpoint, id)
    }
}

/// `Content-Disposition` value with an RFC 5987 encoded filename
fn content_disposition(filename: &str) -> String {
    let ascii: String = filename
        .chars()
        .map(|c| if c.is_ascii() && c != '"' { c } else { '_' })
        .collect();
    let encoded: String = url::form_urlencoded::byte_serialize(filename.as_bytes())
        .collect::<String>()
        .replace('+', "%20");
    format!("attachment; filename=\"{ascii}\"; filename*=UTF-8''{encoded}")
}

#[async_trait]
impl InstanceClient for HttpInstanceClient {
    async fn get_instance(&self, id: &InstanceIdentifier) -> Result<Instance> {
        tracing::debug!(instance_id = %id, "Fetching instance");

        let response = self
            .http
            .send(self.http.client().get(self.instance_url(id)))
            .await?;

        let instance = response.json::<Instance>().await.map_err(|e| {
            PlatformError::InvalidResponse(format!("Failed to parse instance {id}: {e}"))
        })?;
        Ok(instance)
    }

    async fn get_data_bytes(
        &self,
        id: &InstanceIdentifier,
        data_element_id: Uuid,
    ) -> Result<Vec<u8>> {
        let url = format!("{}/data/{}", self.instance_url(id), data_element_id);
        let response = self.http.send(self.http.client().get(url)).await?;

        let bytes = response.bytes().await.map_err(|e| {
            PlatformError::InvalidResponse(format!(
                "Failed to read data element {data_element_id}: {e}"
            ))
        })?;
        Ok(bytes.to_vec())
    }

    async fn insert_binary_data(
        &self,
        id: &InstanceIdentifier,
        element: NewDataElement,
    ) -> Result<DataElement> {
        tracing::debug!(
            instance_id = %id,
            data_type = %element.data_type,
            filename = %element.filename,
            size = element.content.len(),
            "Inserting data element"
        );

        let mut query = vec![("dataType", element.data_type.as_str())];
        if let Some(task) = element.generated_from_task.as_deref() {
            query.push(("generatedFromTask", task));
        }

        let request = self
            .http
            .client()
            .post(format!("{}/data", self.instance_url(id)))
            .query(&query)
            .header(CONTENT_TYPE, element.content_type.as_str())
            .header(CONTENT_DISPOSITION, content_disposition(&element.filename))
            .body(element.content);

        let response = self.http.send(request).await?;
        let created = response.json::<DataElement>().await.map_err(|e| {
            PlatformError::InvalidResponse(format!("Failed to parse created data element: {e}"))
        })?;
        Ok(created)
    }

    async fn process_move_next(
        &self,
        id: &InstanceIdentifier,
        action: Option<&str>,
    ) -> Result<()> {
        tracing::info!(instance_id = %id, action = ?action, "Moving process to next task");

        let url = format!("{}instances/{}/process/next", self.app_base_url, id);
        let request = self
            .http
            .client()
            .put(url)
            .json(&ProcessNextRequest { action });

        self.http.send(request).await?;
        Ok(())
    }

    async fn mark_instance_complete(&self, id: &InstanceIdentifier) -> Result<()> {
        tracing::info!(instance_id = %id, "Marking instance complete");

        let url = format!("{}/complete", self.instance_url(id));
        self.http.send(self.http.client().post(url)).await?;
        Ok(())
    }
}
