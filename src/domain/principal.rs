//! Authenticated principal that completed the submitting task

use serde::{Deserialize, Serialize};

/// Who submitted the form
///
/// The set of principal kinds is closed. Adding a kind forces a change in the
/// submitter classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Principal {
    /// Person authenticated with a national identity number
    User {
        user_id: u64,
        ssn: String,
        name: Option<String>,
    },

    /// Person registered with username only
    SelfIdentifiedUser { user_id: u64, username: String },

    /// Machine user acting on behalf of an organisation
    SystemUser {
        system_user_id: uuid::Uuid,
        org_number: String,
    },

    /// Organisation authenticated with its own credentials
    Org { org_number: String },

    /// The service owner itself
    ServiceOwner { org: String, org_number: String },
}
