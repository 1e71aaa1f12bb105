//! Process task trigger for archive submissions

use crate::adapters::platform::{InstanceClient, NewDataElement};
use crate::adapters::transport::MessageTransport;
use crate::config::ArchivelinkConfig;
use crate::core::handler::ArchiveMessageHandler;
use crate::domain::{
    ArchiveError, Instance, Principal, Result, SentMessage, ARCHIVE_RECORD_FILENAME,
};
use crate::log_message_sent;
use std::sync::Arc;
use tokio::sync::watch;

/// Submits an instance to the archive when its trigger task completes
pub struct ArchiveServiceTask {
    config: Arc<ArchivelinkConfig>,
    handler: Arc<dyn ArchiveMessageHandler>,
    instances: Arc<dyn InstanceClient>,
    transport: Arc<MessageTransport>,
}

impl ArchiveServiceTask {
    pub fn new(
        config: Arc<ArchivelinkConfig>,
        handler: Arc<dyn ArchiveMessageHandler>,
        instances: Arc<dyn InstanceClient>,
        transport: Arc<MessageTransport>,
    ) -> Self {
        Self {
            config,
            handler,
            instances,
            transport,
        }
    }

    /// Builds the archive request, stores the archive record on the instance
    /// and sends the request
    ///
    /// Returns `Ok(None)` without side effects when auto-send is not
    /// configured for `task_id`. The shutdown signal is checked before any
    /// work is done and again before the message is dispatched.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Cancelled`] if shutdown was requested, or any
    /// error from request construction, persistence or sending.
    pub async fn execute(
        &self,
        task_id: &str,
        instance: &Instance,
        principal: &Principal,
        shutdown: &watch::Receiver<bool>,
    ) -> Result<Option<SentMessage>> {
        if !self.config.archive.is_auto_send_enabled_for(task_id) {
            tracing::debug!(instance_id = %instance.id, task_id, "Auto-send not enabled for task");
            return Ok(None);
        }
        ensure_running(shutdown)?;

        tracing::info!(instance_id = %instance.id, task_id, "Sending archive message");
        let request = self
            .handler
            .create_message_request(task_id, instance, principal)
            .await?;

        let archive_record = request
            .payloads
            .iter()
            .find(|p| p.filename == ARCHIVE_RECORD_FILENAME)
            .ok_or_else(|| {
                ArchiveError::Domain("Message request carries no archive record".to_string())
            })?;

        let target = &self.config.archive.receipt.archive_record;
        self.instances
            .insert_binary_data(
                &instance.id,
                NewDataElement {
                    data_type: target.data_type.clone(),
                    content_type: "application/xml".to_string(),
                    filename: target
                        .filename
                        .clone()
                        .unwrap_or_else(|| format!("{}.xml", target.data_type)),
                    content: archive_record.content.clone(),
                    generated_from_task: Some(task_id.to_string()),
                },
            )
            .await?;

        ensure_running(shutdown)?;
        let sent = self.transport.send_message(request).await?;
        log_message_sent!(sent.message_id, sent.message_type, instance.id);
        Ok(Some(sent))
    }
}

fn ensure_running(shutdown: &watch::Receiver<bool>) -> Result<()> {
    if *shutdown.borrow() {
        return Err(ArchiveError::Cancelled(
            "shutdown requested before dispatch".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::handler::DefaultMessageHandler;
    use crate::core::payload::PayloadGenerator;
    use crate::core::resolver::ConfigResolver;
    use crate::test_support::{
        sample_app_metadata, sample_config, sample_instance, FakeInstanceClient, FakeNotifier,
        FakeOrgRegistry, FakePartyRegistry, FakeTransportFactory,
    };

    struct Harness {
        task: ArchiveServiceTask,
        instances: Arc<FakeInstanceClient>,
        factory: Arc<FakeTransportFactory>,
    }

    fn harness() -> Harness {
        let config = Arc::new(sample_config());
        let instances = Arc::new(FakeInstanceClient::with_instance(sample_instance()));
        let resolver = Arc::new(ConfigResolver::new(
            config.clone(),
            instances.clone(),
            Arc::new(FakePartyRegistry::default()),
            Arc::new(FakeOrgRegistry::default()),
        ));
        let generator = PayloadGenerator::new(
            config.clone(),
            Arc::new(sample_app_metadata()),
            instances.clone(),
            resolver.clone(),
        );
        let handler = Arc::new(DefaultMessageHandler::new(
            config.clone(),
            resolver,
            generator,
            instances.clone(),
            Arc::new(FakeNotifier::default()),
        ));
        let factory = Arc::new(FakeTransportFactory::default());
        let transport = Arc::new(MessageTransport::new(factory.clone()));
        Harness {
            task: ArchiveServiceTask::new(config, handler, instances.clone(), transport),
            instances,
            factory,
        }
    }

    fn principal() -> Principal {
        Principal::ServiceOwner {
            org: "ttd".to_string(),
            org_number: "991825827".to_string(),
        }
    }

    #[tokio::test]
    async fn test_execute_stores_record_then_sends() {
        let h = harness();
        let (_tx, rx) = watch::channel(false);

        let sent = h
            .task
            .execute("Task_2", &sample_instance(), &principal(), &rx)
            .await
            .unwrap()
            .unwrap();

        let inserts = h.instances.inserts();
        assert_eq!(inserts.len(), 1);
        assert_eq!(inserts[0].data_type, "archive-record");
        assert_eq!(inserts[0].filename, "archive-record.xml");
        assert_eq!(inserts[0].content_type, "application/xml");
        assert!(String::from_utf8_lossy(&inserts[0].content).contains("<arkivmelding"));

        assert_eq!(h.factory.connection(0).sent_count(), 1);
        assert_eq!(sent.recipient_account_id, uuid::Uuid::from_u128(3));
    }

    #[tokio::test]
    async fn test_other_task_is_skipped() {
        let h = harness();
        let (_tx, rx) = watch::channel(false);

        let sent = h
            .task
            .execute("Task_1", &sample_instance(), &principal(), &rx)
            .await
            .unwrap();
        assert!(sent.is_none());
        assert!(h.instances.inserts().is_empty());
        assert_eq!(h.factory.connect_count(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_cancels_before_dispatch() {
        let h = harness();
        let (tx, rx) = watch::channel(false);
        tx.send(true).unwrap();

        let result = h
            .task
            .execute("Task_2", &sample_instance(), &principal(), &rx)
            .await;
        assert!(matches!(result, Err(ArchiveError::Cancelled(_))));
        assert!(h.instances.inserts().is_empty());
        assert_eq!(h.factory.connect_count(), 0);
    }
}
