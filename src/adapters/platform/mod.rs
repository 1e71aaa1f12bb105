//! Hosting platform integration
//!
//! The archive flow consumes three platform services:
//!
//! - the instance API ([`InstanceClient`]) for reading instances and data,
//!   storing generated documents and moving the process along
//! - the party register ([`PartyRegistry`]) for instance owner details
//! - the organisation registry ([`OrgRegistry`]) for service owner names
//!
//! The traits are the seams the core logic is written against; the `Http*`
//! types are the production implementations.

pub mod auth;
pub mod http;
pub mod instances;
pub mod register;

use crate::domain::{DataElement, Instance, InstanceIdentifier, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

pub use auth::TokenProvider;
pub use http::PlatformHttp;
pub use instances::HttpInstanceClient;
pub use register::{HttpOrgRegistry, HttpPartyRegistry};

/// A data element to store on an instance
#[derive(Clone)]
pub struct NewDataElement {
    pub data_type: String,
    pub content_type: String,
    pub filename: String,
    pub content: Vec<u8>,

    /// Task the element was produced by
    pub generated_from_task: Option<String>,
}

impl std::fmt::Debug for NewDataElement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewDataElement")
            .field("data_type", &self.data_type)
            .field("content_type", &self.content_type)
            .field("filename", &self.filename)
            .field("size", &self.content.len())
            .field("generated_from_task", &self.generated_from_task)
            .finish()
    }
}

/// Instance API
///
/// None of the operations retry. Process moves and completion are not
/// idempotent on this side; duplicates are for the process engine to reject.
#[async_trait]
pub trait InstanceClient: Send + Sync {
    async fn get_instance(&self, id: &InstanceIdentifier) -> Result<Instance>;

    /// Raw content of a data element
    async fn get_data_bytes(&self, id: &InstanceIdentifier, data_element_id: Uuid)
        -> Result<Vec<u8>>;

    async fn insert_binary_data(
        &self,
        id: &InstanceIdentifier,
        element: NewDataElement,
    ) -> Result<DataElement>;

    /// Completes the current task, optionally with a process action
    async fn process_move_next(&self, id: &InstanceIdentifier, action: Option<&str>)
        -> Result<()>;

    async fn mark_instance_complete(&self, id: &InstanceIdentifier) -> Result<()>;
}

/// Party as returned by the register
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Party {
    pub party_id: u64,

    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub org_number: Option<String>,

    #[serde(default)]
    pub ssn: Option<String>,

    #[serde(default)]
    pub person: Option<Person>,

    #[serde(default)]
    pub organization: Option<Organization>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub telephone_number: Option<String>,
    #[serde(default)]
    pub mobile_number: Option<String>,
    #[serde(default)]
    pub mailing_address: Option<String>,
    #[serde(default)]
    pub mailing_postal_code: Option<String>,
    #[serde(default)]
    pub mailing_postal_city: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organization {
    #[serde(default)]
    pub org_number: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub telephone_number: Option<String>,
    #[serde(default)]
    pub mobile_number: Option<String>,
    #[serde(default)]
    pub email_address: Option<String>,
    #[serde(default)]
    pub mailing_address: Option<String>,
    #[serde(default)]
    pub mailing_postal_code: Option<String>,
    #[serde(default)]
    pub mailing_postal_city: Option<String>,
}

/// Party register
#[async_trait]
pub trait PartyRegistry: Send + Sync {
    async fn get_party(&self, party_id: u64) -> Result<Party>;
}

/// Service owner entry in the organisation registry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrgDetails {
    /// Name per language code
    #[serde(default)]
    pub name: HashMap<String, String>,

    #[serde(default)]
    pub orgnr: Option<String>,
}

impl OrgDetails {
    /// Name in bokmål, then nynorsk, then English
    pub fn preferred_name(&self) -> Option<&str> {
        ["nb", "nn", "en"]
            .iter()
            .filter_map(|lang| self.name.get(*lang))
            .map(String::as_str)
            .find(|n| !n.trim().is_empty())
    }
}

/// Organisation registry
#[async_trait]
pub trait OrgRegistry: Send + Sync {
    /// Looks up a service owner by short code; `None` when unknown
    async fn get_org(&self, org: &str) -> Result<Option<OrgDetails>>;
}
