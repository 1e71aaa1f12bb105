//! Shared fixtures for integration tests
//!
//! Every external endpoint (platform, token, transport gateway) is served by
//! one mockito server; the configuration points all of them at it.

#![allow(dead_code)]

use archivelink::config::{load_config, ArchivelinkConfig};
use std::fs;
use tempfile::TempDir;

pub const PARTY_ID: u64 = 501337;
pub const INSTANCE_GUID: &str = "a4f1c8a4-2d6b-4e0b-8d4b-2b1f2a6f0c11";
pub const MODEL_ELEMENT_ID: &str = "00000000-0000-0000-0000-000000000100";
pub const ATTACHMENT_ELEMENT_ID: &str = "00000000-0000-0000-0000-000000000101";
pub const ACCOUNT_ID: &str = "00000000-0000-0000-0000-000000000001";
pub const RECIPIENT_ACCOUNT_ID: &str = "00000000-0000-0000-0000-000000000003";

pub const MODEL_JSON: &str = r#"{"recipient":{"name":"Bygdeby kommune"},"title":"Søknad om tillatelse"}"#;

pub const APP_METADATA_JSON: &str = r#"{
  "id": "ttd/my-app",
  "org": "ttd",
  "title": { "nb": "Byggesøknad" },
  "dataTypes": [
    { "id": "model", "appLogic": { "classRef": "App.Models.Byggesoknad" }, "taskId": "Task_1" },
    { "id": "attachment", "allowedContentTypes": ["application/pdf"] },
    { "id": "archive-receipt" },
    { "id": "archive-record" }
  ]
}"#;

pub const PROCESS_BPMN: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<bpmn:definitions xmlns:bpmn="http://www.omg.org/spec/BPMN/20100524/MODEL" xmlns:altinn="http://altinn.no/process">
  <bpmn:process id="Process_1" isExecutable="false">
    <bpmn:task id="Task_1" name="Utfylling">
      <bpmn:extensionElements>
        <altinn:taskExtension><altinn:taskType>data</altinn:taskType></altinn:taskExtension>
      </bpmn:extensionElements>
    </bpmn:task>
    <bpmn:task id="Task_2" name="Arkivering" />
    <bpmn:task id="Task_3" name="Kvittering" />
  </bpmn:process>
</bpmn:definitions>"#;

pub const RECEIPT_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<arkivmeldingKvittering xmlns="https://ks-no.github.io/standarder/fiks-protokoll/fiks-arkiv/arkivmeldingkvittering/v1">
  <tidspunkt>2025-03-14T09:31:00</tidspunkt>
  <mappeKvittering>
    <systemID label="Arkiv">1f2e3d4c</systemID>
    <saksaar>2025</saksaar>
    <sakssekvensnummer>42</sakssekvensnummer>
  </mappeKvittering>
</arkivmeldingKvittering>"#;

pub fn instance_path() -> String {
    format!("/storage/api/v1/instances/{PARTY_ID}/{INSTANCE_GUID}")
}

pub fn instance_url(server_url: &str) -> String {
    format!("{server_url}/ttd/my-app/instances/{PARTY_ID}/{INSTANCE_GUID}")
}

pub fn instance_json() -> String {
    format!(
        r#"{{
  "id": "{PARTY_ID}/{INSTANCE_GUID}",
  "appId": "ttd/my-app",
  "org": "ttd",
  "instanceOwner": {{ "partyId": "{PARTY_ID}", "personNumber": "01017012345" }},
  "process": {{ "currentTask": {{ "elementId": "Task_2" }} }},
  "data": [
    {{ "id": "{MODEL_ELEMENT_ID}", "dataType": "model", "contentType": "application/json", "size": 80 }},
    {{ "id": "{ATTACHMENT_ELEMENT_ID}", "dataType": "attachment", "contentType": "application/pdf", "filename": "vedlegg.pdf", "size": 8 }}
  ]
}}"#
    )
}

/// Configuration file text pointing every endpoint at `server_url`
pub fn config_toml(server_url: &str, dir: &TempDir) -> String {
    let metadata_path = dir.path().join("applicationmetadata.json");
    let process_path = dir.path().join("process.bpmn");
    format!(
        r#"
environment = "development"

[application]
org = "ttd"
app = "my-app"
app_base_url = "{server_url}/ttd/my-app"
metadata_path = "{metadata}"
process_path = "{process}"

[platform]
storage_endpoint = "{server_url}/storage/api/v1/"
register_endpoint = "{server_url}/register/api/v1/"
notifications_endpoint = "{server_url}/notifications/api/v1/"
org_registry_url = "{server_url}/orgs/altinn-orgs.json"

[platform.auth]
local_token_url = "{server_url}/Home/GetTestOrgToken"

[transport]
base_url = "{server_url}"
account_id = "{ACCOUNT_ID}"
integration_id = "00000000-0000-0000-0000-000000000002"
integration_password = "secret"
poll_interval_seconds = 1

[archive.recipient]
account = {{ value = "{RECIPIENT_ACCOUNT_ID}" }}
identifier = {{ value = "KOMMUNE" }}
name = {{ binding = {{ data_type = "model", field = "recipient.name" }} }}

[archive.documents]
primary = {{ data_type = "model" }}
attachments = [{{ data_type = "attachment" }}]

[archive.receipt]
confirmation_record = {{ data_type = "archive-receipt" }}
archive_record = {{ data_type = "archive-record" }}

[archive.auto_send]
after_task_id = "Task_2"
success_handling = {{ move_to_next_task = true, mark_instance_complete = true }}
error_handling = {{ move_to_next_task = true, action = "reject" }}

[logging]
local_enabled = false
"#,
        metadata = metadata_path.display(),
        process = process_path.display(),
    )
}

/// Writes the application definition and configuration into a temp dir
///
/// The directory must outlive the returned configuration.
pub fn write_app(server_url: &str) -> (TempDir, ArchivelinkConfig) {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("applicationmetadata.json"), APP_METADATA_JSON).unwrap();
    fs::write(dir.path().join("process.bpmn"), PROCESS_BPMN).unwrap();

    let config_path = dir.path().join("archivelink.toml");
    fs::write(&config_path, config_toml(server_url, &dir)).unwrap();
    let config = load_config(&config_path).unwrap();
    (dir, config)
}

pub async fn mock_token(server: &mut mockito::Server) -> mockito::Mock {
    server
        .mock("GET", "/Home/GetTestOrgToken")
        .match_query(mockito::Matcher::Any)
        .with_body("test-token")
        .create_async()
        .await
}

pub async fn mock_instance(server: &mut mockito::Server) -> mockito::Mock {
    server
        .mock("GET", instance_path().as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(instance_json())
        .create_async()
        .await
}

pub async fn mock_account(server: &mut mockito::Server) -> mockito::Mock {
    server
        .mock("GET", format!("/fiks-io/api/v1/kontoer/{ACCOUNT_ID}").as_str())
        .with_status(200)
        .with_body("{}")
        .create_async()
        .await
}

/// Mocks storing a data element of `data_type`
pub async fn mock_insert(server: &mut mockito::Server, data_type: &str) -> mockito::Mock {
    server
        .mock("POST", format!("{}/data", instance_path()).as_str())
        .match_query(mockito::Matcher::UrlEncoded(
            "dataType".to_string(),
            data_type.to_string(),
        ))
        .with_status(201)
        .with_header("content-type", "application/json")
        .with_body(format!(
            r#"{{"id":"5d6a0f3e-0000-4000-8000-000000000001","dataType":"{data_type}","size":10}}"#
        ))
        .create_async()
        .await
}
