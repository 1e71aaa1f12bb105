//! Platform instance and application models
//!
//! These mirror the JSON contract of the hosting platform's storage API. Only
//! the fields the archive flow reads are modelled; unknown fields are ignored.

use super::ids::InstanceIdentifier;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A process instance as returned by the platform
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    /// `{partyId}/{guid}`
    pub id: InstanceIdentifier,

    /// `{org}/{app}`
    pub app_id: String,

    /// Service owner short code
    pub org: String,

    /// Owner of the instance
    pub instance_owner: InstanceOwner,

    /// Process state, absent before the process has started
    #[serde(default)]
    pub process: Option<ProcessState>,

    /// Data elements attached to the instance
    #[serde(default)]
    pub data: Vec<DataElement>,
}

impl Instance {
    /// Data elements of the given data type, in storage order
    pub fn data_elements_of<'a>(
        &'a self,
        data_type: &'a str,
    ) -> impl Iterator<Item = &'a DataElement> + 'a {
        self.data.iter().filter(move |d| d.data_type == data_type)
    }

    /// Id of the task the process currently sits in
    pub fn current_task_id(&self) -> Option<&str> {
        self.process
            .as_ref()
            .and_then(|p| p.current_task.as_ref())
            .map(|t| t.element_id.as_str())
    }
}

/// Instance owner
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceOwner {
    pub party_id: String,

    #[serde(default)]
    pub person_number: Option<String>,

    #[serde(default)]
    pub organisation_number: Option<String>,

    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessState {
    #[serde(default)]
    pub current_task: Option<ProcessElementInfo>,

    #[serde(default)]
    pub ended: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessElementInfo {
    pub element_id: String,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub alt_task_type: Option<String>,
}

/// Data element metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataElement {
    pub id: uuid::Uuid,

    pub data_type: String,

    #[serde(default)]
    pub content_type: Option<String>,

    #[serde(default)]
    pub filename: Option<String>,

    #[serde(default)]
    pub size: u64,
}

/// Application metadata (`applicationmetadata.json`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationMetadata {
    pub id: String,

    pub org: String,

    /// Title per language code
    #[serde(default)]
    pub title: HashMap<String, String>,

    #[serde(default)]
    pub data_types: Vec<DataType>,
}

impl ApplicationMetadata {
    /// Application title in Norwegian bokmål, falling back to the app name
    pub fn display_title(&self) -> String {
        self.title
            .get("nb")
            .filter(|t| !t.trim().is_empty())
            .cloned()
            .unwrap_or_else(|| {
                self.id
                    .split_once('/')
                    .map(|(_, app)| app.to_string())
                    .unwrap_or_else(|| self.id.clone())
            })
    }

    pub fn data_type(&self, id: &str) -> Option<&DataType> {
        self.data_types.iter().find(|d| d.id == id)
    }
}

/// Data type declared by the application
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataType {
    pub id: String,

    #[serde(default)]
    pub allowed_content_types: Vec<String>,

    /// Present when the data type is backed by a form data model
    #[serde(default)]
    pub app_logic: Option<AppLogic>,

    #[serde(default)]
    pub task_id: Option<String>,

    #[serde(default)]
    pub max_count: u32,
}

impl DataType {
    /// Whether the data type holds form data that bindings can read
    pub fn is_form_data(&self) -> bool {
        self.app_logic
            .as_ref()
            .and_then(|l| l.class_ref.as_ref())
            .is_some()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppLogic {
    #[serde(default)]
    pub class_ref: Option<String>,
}

/// Task declared in the application's process definition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessTask {
    pub id: String,
    pub name: Option<String>,
    pub task_type: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const INSTANCE_JSON: &str = r#"{
        "id": "501337/a4f1c8a4-2d6b-4e0b-8d4b-2b1f2a6f0c11",
        "appId": "ttd/my-app",
        "org": "ttd",
        "instanceOwner": { "partyId": "501337", "personNumber": "12345678901" },
        "process": { "currentTask": { "elementId": "Task_1" } },
        "data": [
            { "id": "0e0ea5f5-3c3b-46ae-a8d5-7f31a0b1cfa0", "dataType": "model", "contentType": "application/xml" },
            { "id": "5a6f2c44-2a1e-4b88-9a63-b1d0b3c6d9a1", "dataType": "attachment", "contentType": "application/pdf", "filename": "scan.pdf", "size": 2048 }
        ],
        "lastChanged": "2025-01-01T00:00:00Z"
    }"#;

    #[test]
    fn test_instance_deserialize() {
        let instance: Instance = serde_json::from_str(INSTANCE_JSON).unwrap();
        assert_eq!(instance.id.party_id(), 501337);
        assert_eq!(instance.current_task_id(), Some("Task_1"));
        assert_eq!(instance.data.len(), 2);
        assert_eq!(instance.data_elements_of("attachment").count(), 1);
        assert_eq!(instance.data_elements_of("missing").count(), 0);
        assert_eq!(
            instance.instance_owner.person_number.as_deref(),
            Some("12345678901")
        );
    }

    #[test]
    fn test_application_title_fallback() {
        let mut metadata = ApplicationMetadata {
            id: "ttd/my-app".to_string(),
            org: "ttd".to_string(),
            ..Default::default()
        };
        assert_eq!(metadata.display_title(), "my-app");

        metadata
            .title
            .insert("nb".to_string(), "Søknad om tilskudd".to_string());
        assert_eq!(metadata.display_title(), "Søknad om tilskudd");
    }

    #[test]
    fn test_data_type_form_data() {
        let json = r#"{"id":"model","appLogic":{"classRef":"App.Models.Model"}}"#;
        let dt: DataType = serde_json::from_str(json).unwrap();
        assert!(dt.is_form_data());

        let dt: DataType = serde_json::from_str(r#"{"id":"attachment"}"#).unwrap();
        assert!(!dt.is_form_data());
    }
}
