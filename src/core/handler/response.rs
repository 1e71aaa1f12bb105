//! Inbound response classification

use crate::adapters::transport::ReceivedPayload;
use crate::domain::{message_types, ArchiveErrorReport, ArchiveReceipt};

/// One payload entry of an inbound message, parsed by the message type
#[derive(Debug, Clone)]
pub enum DeserializedPayload {
    Receipt {
        filename: String,
        content: String,
        receipt: ArchiveReceipt,
    },
    Error {
        filename: String,
        content: String,
        report: ArchiveErrorReport,
    },
    /// Unparsable, or of a type we do not read
    Unknown { filename: String, content: String },
}

impl DeserializedPayload {
    /// An error report, or a receipt where part of the record failed
    pub fn is_error(&self) -> bool {
        match self {
            DeserializedPayload::Error { .. } => true,
            DeserializedPayload::Receipt { receipt, .. } => receipt.has_sub_error(),
            DeserializedPayload::Unknown { .. } => false,
        }
    }

    pub fn filename(&self) -> &str {
        match self {
            DeserializedPayload::Receipt { filename, .. }
            | DeserializedPayload::Error { filename, .. }
            | DeserializedPayload::Unknown { filename, .. } => filename,
        }
    }

    pub fn content(&self) -> &str {
        match self {
            DeserializedPayload::Receipt { content, .. }
            | DeserializedPayload::Error { content, .. }
            | DeserializedPayload::Unknown { content, .. } => content,
        }
    }

    /// Short error description for operator notifications
    pub fn error_description(&self) -> Option<String> {
        match self {
            DeserializedPayload::Error { report, .. } => Some(
                report
                    .message
                    .clone()
                    .unwrap_or_else(|| "Archive reported an error without a message".to_string()),
            ),
            DeserializedPayload::Receipt { receipt, .. } => receipt
                .case_file_error
                .clone()
                .or_else(|| receipt.journal_entry_error.clone()),
            DeserializedPayload::Unknown { .. } => None,
        }
    }
}

/// Parses payload entries according to the message type
///
/// Entries that fail to parse are logged and kept as
/// [`DeserializedPayload::Unknown`].
pub fn deserialize_payloads(
    message_type: &str,
    payloads: Vec<ReceivedPayload>,
) -> Vec<DeserializedPayload> {
    payloads
        .into_iter()
        .map(|payload| deserialize_payload(message_type, payload))
        .collect()
}

fn deserialize_payload(message_type: &str, payload: ReceivedPayload) -> DeserializedPayload {
    let filename = payload.filename;
    let content = String::from_utf8_lossy(&payload.content).into_owned();

    if message_type == message_types::CREATE_ARCHIVE_RECORD_RECEIPT {
        match ArchiveReceipt::from_xml(&content) {
            Ok(receipt) => {
                return DeserializedPayload::Receipt {
                    filename,
                    content,
                    receipt,
                }
            }
            Err(e) => {
                tracing::error!(filename = %filename, error = %e, "Failed to parse archive receipt");
            }
        }
    } else if message_types::is_error_type(message_type) {
        match ArchiveErrorReport::from_xml(&content) {
            Ok(report) => {
                return DeserializedPayload::Error {
                    filename,
                    content,
                    report,
                }
            }
            Err(e) => {
                tracing::error!(filename = %filename, error = %e, "Failed to parse archive error report");
            }
        }
    }

    DeserializedPayload::Unknown { filename, content }
}
