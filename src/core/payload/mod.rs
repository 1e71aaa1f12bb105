//! Outbound document set
//!
//! A submission is the archive record followed by the primary document and
//! every attachment the configuration selects:
//!
//! ```text
//! arkivmelding.xml   (primary role)
//! model.xml          (primary role)
//! vedlegg.pdf        (attachment role)
//! vedlegg(1).pdf     (attachment role)
//! ```
//!
//! The record describes every document after it, in the same order.

pub mod filenames;
pub mod record;

use crate::adapters::platform::InstanceClient;
use crate::config::{ArchivelinkConfig, Environment};
use crate::core::resolver::{ArchiveMetadata, ConfigResolver, InstanceData};
use crate::domain::{
    ApplicationMetadata, ArchiveError, DataElement, DocumentRole, MessagePayload,
    Principal, Recipient, Result, ARCHIVE_RECORD_FILENAME,
};
use chrono::{DateTime, Datelike, Local};
use futures::future::try_join_all;
use record::{
    codes, AdministrativeUnit, ArchiveRecord, CaseFile, Classification, CorrespondenceParty,
    DocumentDescription, DocumentObject, ExternalKey, JournalEntry, ParentReference,
    SystemIdElement, PLATFORM_SYSTEM_ID,
};
use std::sync::Arc;
use uuid::Uuid;

const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Everything the archive record is built from, resolved up front
#[derive(Debug, Clone)]
pub struct RecordInputs {
    pub app_id: String,
    pub org: String,
    pub instance_id: String,
    pub default_title: String,
    pub metadata: Option<ArchiveMetadata>,
    pub recipient: CorrespondenceParty,
    pub service_owner: CorrespondenceParty,
    pub instance_owner: Option<CorrespondenceParty>,
    pub submitter: Classification,

    /// Transport account, used as document object system id
    pub account_id: Uuid,
    pub now: DateTime<Local>,
}

/// Builds the archive record describing `documents`
///
/// `documents` holds the primary document first, then attachments.
pub fn build_archive_record(inputs: RecordInputs, documents: &[MessagePayload]) -> ArchiveRecord {
    let metadata = inputs.metadata.unwrap_or_default();
    let now = inputs.now.format(DATE_FORMAT).to_string();

    let case_file_title = metadata
        .case_file_title
        .unwrap_or_else(|| inputs.default_title.clone());
    let journal_entry_title = metadata
        .journal_entry_title
        .unwrap_or_else(|| case_file_title.clone());

    let external_key = ExternalKey {
        system: inputs.app_id,
        key: metadata.case_file_id.unwrap_or(inputs.instance_id),
    };

    let case_file = CaseFile {
        xsi_type: CaseFile::XSI_TYPE,
        title: case_file_title.clone(),
        public_title: case_file_title,
        external_key: external_key.clone(),
        classifications: vec![inputs.submitter],
        case_year: inputs.now.year(),
        case_date: now.clone(),
        administrative_unit: AdministrativeUnit {
            name: inputs.org.clone(),
        },
    };

    let mut parties = vec![inputs.recipient, inputs.service_owner];
    parties.extend(inputs.instance_owner);
    parties.push(CorrespondenceParty::internal_sender());

    let descriptions = documents
        .iter()
        .enumerate()
        .map(|(index, document)| describe_document(document, index + 1, inputs.account_id, &now))
        .collect();

    let journal_entry = JournalEntry {
        xsi_type: JournalEntry::XSI_TYPE,
        title: journal_entry_title.clone(),
        public_title: journal_entry_title,
        created_by: inputs.org.clone(),
        archived_by: inputs.org,
        parent: ParentReference {
            external_key: external_key.clone(),
        },
        documents: descriptions,
        external_key,
        journal_year: inputs.now.year(),
        entry_type: codes::incoming_document(),
        status: codes::journalled(),
        document_date: now.clone(),
        sent_date: now,
        parties,
    };

    ArchiveRecord::new(
        metadata
            .system_id
            .unwrap_or_else(|| PLATFORM_SYSTEM_ID.to_string()),
        metadata.rule_id,
        case_file,
        journal_entry,
    )
}

fn describe_document(
    document: &MessagePayload,
    number: usize,
    account_id: Uuid,
    created: &str,
) -> DocumentDescription {
    let (document_type, attached_as) = match document.role {
        DocumentRole::Primary => (codes::document(), codes::main_document()),
        DocumentRole::Attachment => (codes::attachment(), codes::attached_document()),
    };

    DocumentDescription {
        document_type,
        status: codes::finished(),
        title: document.filename.clone(),
        created_date: created.to_string(),
        attached_as,
        number,
        objects: vec![DocumentObject {
            system_id: SystemIdElement {
                label: PLATFORM_SYSTEM_ID.to_string(),
                value: account_id.to_string(),
            },
            variant: codes::production_format(),
            format: record::Code::bare(filenames::dotless_extension(&document.filename)),
            filename: document.filename.clone(),
            file_reference: document.filename.clone(),
        }],
    }
}

/// Assembles the outbound payloads for an instance
pub struct PayloadGenerator {
    config: Arc<ArchivelinkConfig>,
    app_metadata: Arc<ApplicationMetadata>,
    instances: Arc<dyn InstanceClient>,
    resolver: Arc<ConfigResolver>,
}

impl PayloadGenerator {
    pub fn new(
        config: Arc<ArchivelinkConfig>,
        app_metadata: Arc<ApplicationMetadata>,
        instances: Arc<dyn InstanceClient>,
        resolver: Arc<ConfigResolver>,
    ) -> Self {
        Self {
            config,
            app_metadata,
            instances,
            resolver,
        }
    }

    /// Builds `[archive record, primary document, attachments...]`
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Domain`] if the instance has no primary
    /// document, and propagates failures reading document content or
    /// resolving metadata.
    pub async fn generate_payload(
        &self,
        task_id: &str,
        data: &InstanceData<'_>,
        recipient: &Recipient,
        principal: &Principal,
    ) -> Result<Vec<MessagePayload>> {
        let instance = data.instance();
        let documents = self.get_archive_documents(data).await?;
        tracing::debug!(
            instance_id = %instance.id,
            task_id,
            document_count = documents.len(),
            "Collected archive documents"
        );

        let inputs = RecordInputs {
            app_id: self.config.application.app_id(),
            org: self.config.application.org.clone(),
            instance_id: instance.id.to_string(),
            default_title: self.app_metadata.display_title(),
            metadata: self.resolver.get_config_metadata(data).await?,
            recipient: self.resolver.get_recipient_party(instance, recipient),
            service_owner: self.resolver.get_service_owner_party().await,
            instance_owner: self.resolver.get_instance_owner_party(instance).await,
            submitter: self.resolver.get_form_submitter_classification(principal),
            account_id: self.config.transport.account_id,
            now: Local::now(),
        };

        let record = build_archive_record(inputs, &documents);
        let xml = record.to_xml()?;
        if self.config.environment != Environment::Production {
            tracing::debug!(instance_id = %instance.id, archive_record = %xml, "Generated archive record");
        }

        let mut payloads = Vec::with_capacity(documents.len() + 1);
        payloads.push(MessagePayload::new(
            ARCHIVE_RECORD_FILENAME,
            xml.into_bytes(),
            DocumentRole::Primary,
        ));
        payloads.extend(documents);
        Ok(payloads)
    }

    /// Primary document followed by attachments, with unique filenames
    async fn get_archive_documents(&self, data: &InstanceData<'_>) -> Result<Vec<MessagePayload>> {
        let instance = data.instance();
        let documents = &self.config.archive.documents;

        let primary_element = instance
            .data_elements_of(&documents.primary.data_type)
            .next()
            .ok_or_else(|| {
                ArchiveError::Domain(format!(
                    "Instance {} has no data element of primary document type '{}'",
                    instance.id, documents.primary.data_type
                ))
            })?;

        let mut payloads = vec![
            self.fetch_document(
                data,
                primary_element,
                documents.primary.filename.as_deref(),
                DocumentRole::Primary,
            )
            .await?,
        ];

        for attachment in &documents.attachments {
            let elements: Vec<&DataElement> = instance.data_elements_of(&attachment.data_type).collect();
            if elements.is_empty() {
                tracing::debug!(
                    instance_id = %instance.id,
                    data_type = %attachment.data_type,
                    "No data elements for attachment type"
                );
                continue;
            }

            let fetched = try_join_all(elements.into_iter().map(|element| {
                self.fetch_document(
                    data,
                    element,
                    attachment.filename.as_deref(),
                    DocumentRole::Attachment,
                )
            }))
            .await?;
            payloads.extend(fetched);
        }

        filenames::deduplicate(
            payloads.iter_mut().map(|p| &mut p.filename),
            &[ARCHIVE_RECORD_FILENAME],
        );
        Ok(payloads)
    }

    async fn fetch_document(
        &self,
        data: &InstanceData<'_>,
        element: &DataElement,
        filename_override: Option<&str>,
        role: DocumentRole,
    ) -> Result<MessagePayload> {
        let filename = filenames::resolve_filename(
            filename_override,
            element.filename.as_deref(),
            &element.data_type,
            element.content_type.as_deref(),
        );
        let content = data.bytes(self.instances.as_ref(), element.id).await?;
        Ok(MessagePayload::new(filename, content, role))
    }
}
