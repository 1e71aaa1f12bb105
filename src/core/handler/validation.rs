//! Startup validation of archive settings against the application definition

use crate::config::{ArchiveConfig, DataBinding, DocumentConfig};
use crate::domain::{ArchiveError, DataType, ProcessTask, Result};

/// Checks archive settings against the declared data types and process tasks
///
/// # Errors
///
/// Returns [`ArchiveError::Configuration`] naming the first setting that
/// refers to something the application does not declare.
pub fn validate_archive_settings(
    archive: &ArchiveConfig,
    data_types: &[DataType],
    process_tasks: &[ProcessTask],
) -> Result<()> {
    for (name, binding) in archive.recipient.bindings() {
        validate_binding(name, binding, data_types)?;
    }

    validate_document("archive.documents.primary", &archive.documents.primary, data_types)?;
    for (i, attachment) in archive.documents.attachments.iter().enumerate() {
        validate_document(
            &format!("archive.documents.attachments[{i}]"),
            attachment,
            data_types,
        )?;
    }

    if let Some(metadata) = &archive.metadata {
        for (name, value) in metadata.fields() {
            if let Some(binding) = &value.binding {
                validate_binding(name, binding, data_types)?;
            }
        }
    }

    validate_document(
        "archive.receipt.confirmation_record",
        &archive.receipt.confirmation_record,
        data_types,
    )?;
    validate_document(
        "archive.receipt.archive_record",
        &archive.receipt.archive_record,
        data_types,
    )?;

    if let Some(auto_send) = &archive.auto_send {
        if !process_tasks.iter().any(|t| t.id == auto_send.after_task_id) {
            return Err(ArchiveError::Configuration(format!(
                "archive.auto_send.after_task_id '{}' is not a task in the process definition",
                auto_send.after_task_id
            )));
        }
        if let Some(error_handling) = &auto_send.error_handling {
            error_handling.validate().map_err(ArchiveError::Configuration)?;
        }
    }

    Ok(())
}

fn find_data_type<'a>(name: &str, id: &str, data_types: &'a [DataType]) -> Result<&'a DataType> {
    data_types.iter().find(|d| d.id == id).ok_or_else(|| {
        ArchiveError::Configuration(format!(
            "{name} refers to data type '{id}', which the application does not declare"
        ))
    })
}

fn validate_document(name: &str, document: &DocumentConfig, data_types: &[DataType]) -> Result<()> {
    find_data_type(name, &document.data_type, data_types).map(|_| ())
}

fn validate_binding(name: &str, binding: &DataBinding, data_types: &[DataType]) -> Result<()> {
    binding
        .validate()
        .map_err(|e| ArchiveError::Configuration(format!("{name}: {e}")))?;

    let data_type = find_data_type(name, &binding.data_type, data_types)?;
    if !data_type.is_form_data() {
        return Err(ArchiveError::Configuration(format!(
            "{name} is bound to data type '{}', which has no form data model",
            binding.data_type
        )));
    }
    Ok(())
}
