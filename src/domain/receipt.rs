//! Archive receipts and error reports
//!
//! The archive service answers with XML documents in its own schema. They are
//! read into wire structs and mapped onto [`ArchiveReceipt`] and
//! [`ArchiveErrorReport`], which are what the rest of the crate sees. The
//! receipt is persisted on the instance as JSON.

use serde::{Deserialize, Serialize};

/// Identifiers the archive assigned to the stored records
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveReceipt {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub case_file: Option<CaseFileReceipt>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub journal_entry: Option<JournalEntryReceipt>,

    /// Case file could not be created
    #[serde(skip)]
    pub case_file_error: Option<String>,

    /// Journal entry could not be registered
    #[serde(skip)]
    pub journal_entry_error: Option<String>,
}

impl ArchiveReceipt {
    /// Parses a receipt document
    pub fn from_xml(xml: &str) -> Result<Self, quick_xml::de::DeError> {
        let wire: wire::Receipt = quick_xml::de::from_str(xml)?;
        Ok(wire.into())
    }

    /// A receipt can report partial failure for either record
    pub fn has_sub_error(&self) -> bool {
        self.case_file_error.is_some() || self.journal_entry_error.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemId {
    pub id: Option<String>,
    pub label: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseFileReceipt {
    pub system_id: SystemId,
    pub folder_id: Option<String>,
    pub created_date: Option<String>,
    pub case_year: Option<i32>,
    pub case_date: Option<String>,
    pub case_sequence_number: Option<i64>,
    pub created_by: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodedValue {
    pub code: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntryReceipt {
    pub system_id: SystemId,
    pub registration_id: Option<String>,
    pub created_date: Option<String>,
    pub journal_year: Option<i32>,
    pub journal_date: Option<String>,
    pub journal_entry_number: Option<i64>,
    pub journal_sequence_number: Option<i64>,
    pub journal_entry_type: Option<CodedValue>,
    pub journal_status: Option<CodedValue>,
    pub created_by: Option<String>,
}

/// Error report sent instead of a receipt
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveErrorReport {
    pub error_id: Option<String>,
    pub message: Option<String>,
    pub reference_message_id: Option<String>,
    pub correlation_id: Option<String>,
}

impl ArchiveErrorReport {
    pub fn from_xml(xml: &str) -> Result<Self, quick_xml::de::DeError> {
        let wire: wire::ErrorReport = quick_xml::de::from_str(xml)?;
        Ok(Self {
            error_id: wire.error_id,
            message: wire.message,
            reference_message_id: wire.reference_message_id,
            correlation_id: wire.correlation_id,
        })
    }
}

mod wire {
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    pub struct Receipt {
        #[serde(rename = "mappeKvittering", default)]
        pub case_file: Option<CaseFile>,
        #[serde(rename = "registreringKvittering", default)]
        pub journal_entry: Option<JournalEntry>,
        #[serde(rename = "mappeFeilet", default)]
        pub case_file_failed: Option<Failure>,
        #[serde(rename = "registreringFeilet", default)]
        pub journal_entry_failed: Option<Failure>,
    }

    #[derive(Debug, Deserialize)]
    pub struct SystemId {
        #[serde(rename = "@label", default)]
        pub label: Option<String>,
        #[serde(rename = "$text", default)]
        pub value: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    pub struct CaseFile {
        #[serde(rename = "systemID", default)]
        pub system_id: Option<SystemId>,
        #[serde(rename = "mappeID", default)]
        pub folder_id: Option<String>,
        #[serde(rename = "opprettetDato", default)]
        pub created_date: Option<String>,
        #[serde(rename = "opprettetAv", default)]
        pub created_by: Option<String>,
        #[serde(rename = "saksaar", default)]
        pub case_year: Option<i32>,
        #[serde(rename = "sakssekvensnummer", default)]
        pub case_sequence_number: Option<i64>,
        #[serde(rename = "saksdato", default)]
        pub case_date: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Coded {
        #[serde(rename = "kode")]
        pub code: String,
        #[serde(rename = "beskrivelse", default)]
        pub description: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    pub struct JournalEntry {
        #[serde(rename = "systemID", default)]
        pub system_id: Option<SystemId>,
        #[serde(rename = "registreringsID", default)]
        pub registration_id: Option<String>,
        #[serde(rename = "opprettetDato", default)]
        pub created_date: Option<String>,
        #[serde(rename = "opprettetAv", default)]
        pub created_by: Option<String>,
        #[serde(rename = "journalaar", default)]
        pub journal_year: Option<i32>,
        #[serde(rename = "journalsekvensnummer", default)]
        pub journal_sequence_number: Option<i64>,
        #[serde(rename = "journalpostnummer", default)]
        pub journal_entry_number: Option<i64>,
        #[serde(rename = "journalposttype", default)]
        pub journal_entry_type: Option<Coded>,
        #[serde(rename = "journalstatus", default)]
        pub journal_status: Option<Coded>,
        #[serde(rename = "journaldato", default)]
        pub journal_date: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    pub struct Failure {
        #[serde(rename = "feilmelding", default)]
        pub message: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    pub struct ErrorReport {
        #[serde(rename = "feilId", default)]
        pub error_id: Option<String>,
        #[serde(rename = "feilmelding", default)]
        pub message: Option<String>,
        #[serde(rename = "referanseMeldingId", default)]
        pub reference_message_id: Option<String>,
        #[serde(rename = "korrelasjonId", default)]
        pub correlation_id: Option<String>,
    }

    impl From<SystemId> for super::SystemId {
        fn from(value: SystemId) -> Self {
            Self {
                id: value.value.map(|v| v.trim().to_string()),
                label: value.label,
            }
        }
    }

    impl From<Coded> for super::CodedValue {
        fn from(value: Coded) -> Self {
            Self {
                code: value.code,
                description: value.description,
            }
        }
    }

    fn failure_text(failure: Failure) -> String {
        failure
            .message
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| "no error description".to_string())
    }

    impl From<Receipt> for super::ArchiveReceipt {
        fn from(value: Receipt) -> Self {
            Self {
                case_file: value.case_file.map(|c| super::CaseFileReceipt {
                    system_id: c.system_id.map(Into::into).unwrap_or_default(),
                    folder_id: c.folder_id,
                    created_date: c.created_date,
                    case_year: c.case_year,
                    case_date: c.case_date,
                    case_sequence_number: c.case_sequence_number,
                    created_by: c.created_by,
                }),
                journal_entry: value.journal_entry.map(|j| super::JournalEntryReceipt {
                    system_id: j.system_id.map(Into::into).unwrap_or_default(),
                    registration_id: j.registration_id,
                    created_date: j.created_date,
                    journal_year: j.journal_year,
                    journal_date: j.journal_date,
                    journal_entry_number: j.journal_entry_number,
                    journal_sequence_number: j.journal_sequence_number,
                    journal_entry_type: j.journal_entry_type.map(Into::into),
                    journal_status: j.journal_status.map(Into::into),
                    created_by: j.created_by,
                }),
                case_file_error: value.case_file_failed.map(failure_text),
                journal_entry_error: value.journal_entry_failed.map(failure_text),
            }
        }
    }
}
