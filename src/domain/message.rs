//! Outbound archive messages
//!
//! A [`MessageRequest`] is built once per triggering task, handed to the
//! transport and dropped. Nothing about it is retained for correlation.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Message type tags understood by the archive service
pub mod message_types {
    /// Create an archive record (case file + journal entry)
    pub const CREATE_ARCHIVE_RECORD: &str = "no.ks.fiks.arkiv.v1.arkivering.arkivmelding.opprett";

    /// Archive record was stored; payload carries the receipt
    pub const CREATE_ARCHIVE_RECORD_RECEIPT: &str =
        "no.ks.fiks.arkiv.v1.arkivering.arkivmelding.opprett.kvittering";

    /// Archive record was received but not yet stored
    pub const CREATE_ARCHIVE_RECORD_RECEIVED: &str =
        "no.ks.fiks.arkiv.v1.arkivering.arkivmelding.opprett.mottatt";

    pub const ERROR_NOT_FOUND: &str = "no.ks.fiks.arkiv.v1.feilmelding.ikkefunnet";
    pub const ERROR_SERVER: &str = "no.ks.fiks.arkiv.v1.feilmelding.serverfeil";
    pub const ERROR_INVALID_REQUEST: &str = "no.ks.fiks.arkiv.v1.feilmelding.ugyldigforespoersel";

    /// Error message types
    pub const ERROR_TYPES: [&str; 3] = [ERROR_NOT_FOUND, ERROR_SERVER, ERROR_INVALID_REQUEST];

    pub fn is_error_type(message_type: &str) -> bool {
        ERROR_TYPES.contains(&message_type)
    }
}

/// Filename of the archive record inside the payload container
pub const ARCHIVE_RECORD_FILENAME: &str = "arkivmelding.xml";

/// How long the transport keeps an undelivered request
pub fn message_lifetime() -> Duration {
    Duration::days(2)
}

/// Role a document plays in the submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentRole {
    /// The archive record and the primary document
    Primary,
    Attachment,
}

/// A single file in the outbound payload container
#[derive(Clone, PartialEq, Eq)]
pub struct MessagePayload {
    pub filename: String,
    pub content: Vec<u8>,
    pub role: DocumentRole,
}

impl MessagePayload {
    pub fn new(filename: impl Into<String>, content: Vec<u8>, role: DocumentRole) -> Self {
        Self {
            filename: filename.into(),
            content,
            role,
        }
    }
}

impl std::fmt::Debug for MessagePayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessagePayload")
            .field("filename", &self.filename)
            .field("size", &self.content.len())
            .field("role", &self.role)
            .finish()
    }
}

/// Resolved archive recipient
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    /// Transport account the archive service listens on
    pub account_id: Uuid,

    /// Identifier used in the correspondence party record
    pub identifier: String,

    pub name: String,

    pub org_number: Option<String>,
}

/// Outbound archive request
#[derive(Debug, Clone)]
pub struct MessageRequest {
    pub recipient: Uuid,
    pub message_type: String,

    /// Instance GUID
    pub senders_reference: Uuid,

    pub time_to_live: Duration,

    /// Ordered payloads; the archive record comes first
    pub payloads: Vec<MessagePayload>,

    /// Instance URL, echoed back by the archive service
    pub correlation_id: String,

    /// Set when the request answers a previous message
    pub in_reply_to: Option<Uuid>,
}

/// Transport acknowledgement for a sent request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentMessage {
    pub message_id: Uuid,
    pub message_type: String,
    pub recipient_account_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::message_types::*;
    use super::*;

    #[test]
    fn test_error_types() {
        assert!(is_error_type(ERROR_SERVER));
        assert!(is_error_type(ERROR_NOT_FOUND));
        assert!(is_error_type(ERROR_INVALID_REQUEST));
        assert!(!is_error_type(CREATE_ARCHIVE_RECORD_RECEIPT));
        assert!(!is_error_type(""));
    }

    #[test]
    fn test_payload_debug_hides_content() {
        let payload = MessagePayload::new("a.pdf", vec![1, 2, 3], DocumentRole::Attachment);
        let debug = format!("{payload:?}");
        assert!(debug.contains("size: 3"));
        assert!(!debug.contains("[1, 2, 3]"));
    }

    #[test]
    fn test_lifetime_is_two_days() {
        assert_eq!(message_lifetime().num_hours(), 48);
    }
}
