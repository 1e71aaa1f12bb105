//! Application definition files
//!
//! The hosting application declares its data types in
//! `applicationmetadata.json` and its process in a BPMN file. Both are read
//! once at startup for configuration validation and record titles.

use crate::domain::{ApplicationMetadata, ArchiveError, ProcessTask, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::path::Path;

/// Reads `applicationmetadata.json`
///
/// # Errors
///
/// Returns [`ArchiveError::Configuration`] if the file is missing or not
/// valid metadata.
pub fn load_application_metadata(path: impl AsRef<Path>) -> Result<ApplicationMetadata> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|e| {
        ArchiveError::Configuration(format!(
            "Failed to read application metadata {}: {e}",
            path.display()
        ))
    })?;

    serde_json::from_str(&contents).map_err(|e| {
        ArchiveError::Configuration(format!(
            "Failed to parse application metadata {}: {e}",
            path.display()
        ))
    })
}

/// Reads the tasks declared in a BPMN process file
///
/// # Errors
///
/// Returns [`ArchiveError::Configuration`] if the file is missing or not
/// well-formed XML.
pub fn load_process_tasks(path: impl AsRef<Path>) -> Result<Vec<ProcessTask>> {
    let path = path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|e| {
        ArchiveError::Configuration(format!(
            "Failed to read process definition {}: {e}",
            path.display()
        ))
    })?;
    parse_process_tasks(&contents)
}

/// Extracts tasks from BPMN XML
///
/// Task types come from the `altinn:taskType` extension element.
pub fn parse_process_tasks(xml: &str) -> Result<Vec<ProcessTask>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut tasks = Vec::new();
    let mut current: Option<ProcessTask> = None;
    let mut in_task_type = false;

    loop {
        let event = reader.read_event().map_err(|e| {
            ArchiveError::Configuration(format!(
                "Invalid process definition at position {}: {e}",
                reader.buffer_position()
            ))
        })?;

        match event {
            Event::Start(element) => match element.local_name().as_ref() {
                b"task" => current = Some(task_from(&element)?),
                b"taskType" => in_task_type = current.is_some(),
                _ => {}
            },
            Event::Empty(element) if element.local_name().as_ref() == b"task" => {
                tasks.push(task_from(&element)?);
            }
            Event::Text(text) if in_task_type => {
                let value = text.unescape().map_err(|e| {
                    ArchiveError::Configuration(format!("Invalid task type text: {e}"))
                })?;
                if let Some(task) = current.as_mut() {
                    task.task_type = Some(value.trim().to_string());
                }
            }
            Event::End(element) => match element.local_name().as_ref() {
                b"task" => tasks.extend(current.take()),
                b"taskType" => in_task_type = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(tasks)
}

fn task_from(element: &BytesStart<'_>) -> Result<ProcessTask> {
    let mut id = None;
    let mut name = None;

    for attribute in element.attributes() {
        let attribute = attribute
            .map_err(|e| ArchiveError::Configuration(format!("Invalid task attribute: {e}")))?;
        let value = attribute
            .unescape_value()
            .map_err(|e| ArchiveError::Configuration(format!("Invalid task attribute: {e}")))?
            .into_owned();
        match attribute.key.local_name().as_ref() {
            b"id" => id = Some(value),
            b"name" => name = Some(value),
            _ => {}
        }
    }

    let id = id.ok_or_else(|| {
        ArchiveError::Configuration("Process task without an id attribute".to_string())
    })?;
    Ok(ProcessTask {
        id,
        name,
        task_type: None,
    })
}
