//! Component wiring
//!
//! Builds the production object graph from configuration: platform clients,
//! the transport handle, the resolver/generator/handler chain, and the two
//! entry points (service task and receiver).

use crate::adapters::app::{load_application_metadata, load_process_tasks};
use crate::adapters::notify::HttpEmailNotifier;
use crate::adapters::platform::{
    HttpInstanceClient, HttpOrgRegistry, HttpPartyRegistry, InstanceClient, PlatformHttp,
};
use crate::adapters::transport::{GatewayTransportFactory, MessageTransport};
use crate::config::ArchivelinkConfig;
use crate::core::handler::{ArchiveMessageHandler, DefaultMessageHandler};
use crate::core::payload::PayloadGenerator;
use crate::core::receiver::ReceiverService;
use crate::core::resolver::ConfigResolver;
use crate::core::service_task::ArchiveServiceTask;
use crate::domain::{ApplicationMetadata, ProcessTask, Result};
use std::sync::Arc;

/// Fully wired archive integration
pub struct ArchiveRuntime {
    config: Arc<ArchivelinkConfig>,
    app_metadata: Arc<ApplicationMetadata>,
    process_tasks: Vec<ProcessTask>,
    instances: Arc<dyn InstanceClient>,
    handler: Arc<dyn ArchiveMessageHandler>,
    transport: Arc<MessageTransport>,
}

impl ArchiveRuntime {
    /// Loads the application definition and builds all components
    ///
    /// The archive settings are checked against the application's data
    /// types and process tasks before anything is returned. No network
    /// connection is opened here; the transport connects on first use.
    ///
    /// # Errors
    ///
    /// Returns [`crate::domain::ArchiveError::Configuration`] if the
    /// application definition cannot be read or the archive settings refer
    /// to data types or tasks it does not declare.
    pub fn build(config: ArchivelinkConfig) -> Result<Self> {
        let config = Arc::new(config);

        let app_metadata = Arc::new(load_application_metadata(
            &config.application.metadata_path,
        )?);
        let process_tasks = load_process_tasks(&config.application.process_path)?;
        tracing::debug!(
            app_id = %app_metadata.id,
            data_types = app_metadata.data_types.len(),
            process_tasks = process_tasks.len(),
            "Application definition loaded"
        );

        let http = PlatformHttp::new(&config)?;
        let instances: Arc<dyn InstanceClient> =
            Arc::new(HttpInstanceClient::new(&config, http.clone()));
        let parties = Arc::new(HttpPartyRegistry::new(&config, http.clone()));
        let orgs = Arc::new(HttpOrgRegistry::new(&config, &http));
        let notifier = Arc::new(HttpEmailNotifier::new(&config, http));

        let resolver = Arc::new(ConfigResolver::new(
            Arc::clone(&config),
            Arc::clone(&instances),
            parties,
            orgs,
        ));
        let generator = PayloadGenerator::new(
            Arc::clone(&config),
            Arc::clone(&app_metadata),
            Arc::clone(&instances),
            Arc::clone(&resolver),
        );
        let handler: Arc<dyn ArchiveMessageHandler> = Arc::new(DefaultMessageHandler::new(
            Arc::clone(&config),
            resolver,
            generator,
            Arc::clone(&instances),
            notifier,
        ));
        handler.validate_configuration(&app_metadata.data_types, &process_tasks)?;

        let factory = Arc::new(GatewayTransportFactory::new(&config.transport)?);
        let transport = Arc::new(MessageTransport::new(factory));

        Ok(Self {
            config,
            app_metadata,
            process_tasks,
            instances,
            handler,
            transport,
        })
    }

    pub fn config(&self) -> &ArchivelinkConfig {
        &self.config
    }

    pub fn app_metadata(&self) -> &ApplicationMetadata {
        &self.app_metadata
    }

    pub fn process_tasks(&self) -> &[ProcessTask] {
        &self.process_tasks
    }

    pub fn instances(&self) -> Arc<dyn InstanceClient> {
        Arc::clone(&self.instances)
    }

    pub fn service_task(&self) -> ArchiveServiceTask {
        ArchiveServiceTask::new(
            Arc::clone(&self.config),
            Arc::clone(&self.handler),
            Arc::clone(&self.instances),
            Arc::clone(&self.transport),
        )
    }

    pub fn receiver(&self) -> ReceiverService {
        ReceiverService::new(
            &self.config.transport,
            Arc::clone(&self.transport),
            Arc::clone(&self.instances),
            Arc::clone(&self.handler),
        )
    }

    /// Releases the transport connection, if one was opened
    pub async fn shutdown(&self) {
        self.transport.dispose().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ArchiveError;
    use crate::test_support::{sample_app_metadata, sample_config};
    use std::io::Write;
    use tempfile::NamedTempFile;

    const PROCESS_BPMN: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<bpmn:definitions xmlns:bpmn="http://www.omg.org/spec/BPMN/20100524/MODEL" xmlns:altinn="http://altinn.no/process">
  <bpmn:process id="Process_1">
    <bpmn:task id="Task_1" name="Utfylling" altinn:tasktype="data" />
    <bpmn:task id="Task_2" name="Arkivering" altinn:tasktype="archive" />
  </bpmn:process>
</bpmn:definitions>"#;

    fn write_temp(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_build_wires_components() {
        let metadata = write_temp(&serde_json::to_string(&sample_app_metadata()).unwrap());
        let process = write_temp(PROCESS_BPMN);
        let mut config = sample_config();
        config.application.metadata_path = metadata.path().display().to_string();
        config.application.process_path = process.path().display().to_string();

        let runtime = ArchiveRuntime::build(config).unwrap();
        assert_eq!(runtime.app_metadata().display_title(), "Byggesøknad");
        assert_eq!(runtime.process_tasks().len(), 2);
    }

    #[test]
    fn test_build_rejects_unknown_task() {
        let metadata = write_temp(&serde_json::to_string(&sample_app_metadata()).unwrap());
        let process = write_temp(&PROCESS_BPMN.replace("Task_2", "Task_3"));
        let mut config = sample_config();
        config.application.metadata_path = metadata.path().display().to_string();
        config.application.process_path = process.path().display().to_string();

        let result = ArchiveRuntime::build(config);
        assert!(matches!(result, Err(ArchiveError::Configuration(_))));
    }

    #[test]
    fn test_build_requires_metadata_file() {
        let mut config = sample_config();
        config.application.metadata_path = "/nonexistent/applicationmetadata.json".to_string();
        assert!(ArchiveRuntime::build(config).is_err());
    }
}
