//! Outbound request construction and inbound response handling
//!
//! The handler is the only place that decides what a response means for
//! the owning instance:
//!
//! ```text
//! receipt        -> store receipt, move process, mark complete
//! error / failed -> log, notify operators, move process along error action
//! anything else  -> logged once, no side effects
//! ```

pub mod response;
pub mod validation;

use crate::adapters::notify::{OperatorNotification, OperatorNotifier};
use crate::adapters::platform::{InstanceClient, NewDataElement};
use crate::adapters::transport::ReceivedMessage;
use crate::config::ArchivelinkConfig;
use crate::core::payload::PayloadGenerator;
use crate::core::resolver::{ConfigResolver, InstanceData};
use crate::domain::message::message_lifetime;
use crate::domain::{
    message_types, ArchiveError, DataType, Instance, MessageRequest, Principal, ProcessTask,
    Result,
};
use crate::log_error_with_context;
use async_trait::async_trait;
use response::{deserialize_payloads, DeserializedPayload};
use std::sync::Arc;

/// Archive message handling
#[async_trait]
pub trait ArchiveMessageHandler: Send + Sync {
    /// Builds the archive request for an instance whose `task_id` completed
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Configuration`] if auto-send is not enabled
    /// for `task_id`, or any error from recipient resolution and payload
    /// generation.
    async fn create_message_request(
        &self,
        task_id: &str,
        instance: &Instance,
        principal: &Principal,
    ) -> Result<MessageRequest>;

    /// Applies an inbound response to its instance
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be read or a platform side
    /// effect fails. The message is then nacked instead of acknowledged.
    async fn handle_received_message(
        &self,
        instance: &Instance,
        message: &ReceivedMessage,
    ) -> Result<()>;

    /// Checks the archive settings against the application definition
    fn validate_configuration(
        &self,
        data_types: &[DataType],
        process_tasks: &[ProcessTask],
    ) -> Result<()>;
}

/// Handler driven entirely by configuration
pub struct DefaultMessageHandler {
    config: Arc<ArchivelinkConfig>,
    resolver: Arc<ConfigResolver>,
    generator: PayloadGenerator,
    instances: Arc<dyn InstanceClient>,
    notifier: Arc<dyn OperatorNotifier>,
}

impl DefaultMessageHandler {
    pub fn new(
        config: Arc<ArchivelinkConfig>,
        resolver: Arc<ConfigResolver>,
        generator: PayloadGenerator,
        instances: Arc<dyn InstanceClient>,
        notifier: Arc<dyn OperatorNotifier>,
    ) -> Self {
        Self {
            config,
            resolver,
            generator,
            instances,
            notifier,
        }
    }

    async fn handle_success(
        &self,
        instance: &Instance,
        message: &ReceivedMessage,
        payloads: &[DeserializedPayload],
    ) -> Result<()> {
        let mut receipts = payloads.iter().filter_map(|p| match p {
            DeserializedPayload::Receipt { receipt, .. } => Some(receipt),
            _ => None,
        });
        let Some(receipt) = receipts.next() else {
            tracing::warn!(
                instance_id = %instance.id,
                message_id = %message.message_id,
                content = ?payloads.iter().map(DeserializedPayload::content).collect::<Vec<_>>(),
                "Receipt message carries no readable receipt; nothing stored"
            );
            return Ok(());
        };
        if receipts.next().is_some() {
            tracing::warn!(
                message_id = %message.message_id,
                "Message carries more than one receipt; storing the first"
            );
        }

        tracing::info!(
            instance_id = %instance.id,
            message_id = %message.message_id,
            content = ?payloads.iter().map(DeserializedPayload::content).collect::<Vec<_>>(),
            "Archive confirmed the submission"
        );

        let target = &self.config.archive.receipt.confirmation_record;
        let filename = target
            .filename
            .clone()
            .unwrap_or_else(|| format!("{}.json", target.data_type));
        self.instances
            .insert_binary_data(
                &instance.id,
                NewDataElement {
                    data_type: target.data_type.clone(),
                    content_type: "application/json".to_string(),
                    filename,
                    content: serde_json::to_vec_pretty(receipt)?,
                    generated_from_task: instance.current_task_id().map(str::to_string),
                },
            )
            .await?;

        let Some(success) = self
            .config
            .archive
            .auto_send
            .as_ref()
            .and_then(|a| a.success_handling.as_ref())
        else {
            tracing::debug!(instance_id = %instance.id, "Success handling is not configured");
            return Ok(());
        };

        if success.move_to_next_task {
            self.instances
                .process_move_next(&instance.id, success.action.as_deref())
                .await?;
        }
        if success.mark_instance_complete {
            self.instances.mark_instance_complete(&instance.id).await?;
        }
        Ok(())
    }

    async fn handle_error(
        &self,
        instance: &Instance,
        message: &ReceivedMessage,
        payloads: &[DeserializedPayload],
    ) -> Result<()> {
        let contents: Vec<&str> = payloads.iter().map(DeserializedPayload::content).collect();
        tracing::error!(
            instance_id = %instance.id,
            message_id = %message.message_id,
            message_type = %message.message_type,
            content = ?contents,
            "Archive reported an error"
        );

        let Some(error_handling) = self
            .config
            .archive
            .auto_send
            .as_ref()
            .and_then(|a| a.error_handling.as_ref())
        else {
            tracing::debug!(instance_id = %instance.id, "Error handling is not configured");
            return Ok(());
        };

        if error_handling.send_email_notifications {
            let error = payloads
                .iter()
                .find_map(DeserializedPayload::error_description)
                .unwrap_or_else(|| format!("Message type '{}'", message.message_type));
            let notifications = &self.config.notifications;
            let notification = OperatorNotification {
                senders_reference: instance.id.to_string(),
                recipients: error_handling.email_recipients.clone(),
                subject: render(&notifications.email_subject, instance, &error),
                body: render(&notifications.email_body, instance, &error),
            };
            if let Err(e) = self.notifier.notify(notification).await {
                log_error_with_context!(e, "Failed to notify operators of archive error");
            }
        }

        if error_handling.move_to_next_task {
            self.instances
                .process_move_next(&instance.id, error_handling.action.as_deref())
                .await?;
        }
        Ok(())
    }
}

/// How an inbound message was classified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Error,
    Ignored,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Error => "error",
            Outcome::Ignored => "ignored",
        }
    }
}

/// Name of the `archive.receive` span field holding the [`Outcome`]
pub const OUTCOME_FIELD: &str = "outcome";

/// Records on the enclosing `archive.receive` span, if any
fn record_outcome(outcome: Outcome) {
    tracing::Span::current().record(OUTCOME_FIELD, outcome.as_str());
}

fn render(template: &str, instance: &Instance, error: &str) -> String {
    template
        .replace("{instance_id}", &instance.id.to_string())
        .replace("{error}", error)
}

#[async_trait]
impl ArchiveMessageHandler for DefaultMessageHandler {
    async fn create_message_request(
        &self,
        task_id: &str,
        instance: &Instance,
        principal: &Principal,
    ) -> Result<MessageRequest> {
        if !self.config.archive.is_auto_send_enabled_for(task_id) {
            return Err(ArchiveError::Configuration(format!(
                "Archive submission is not enabled for task '{task_id}'"
            )));
        }

        let data = InstanceData::new(instance);
        let recipient = self.resolver.get_recipient(&data).await?;
        let payloads = self
            .generator
            .generate_payload(task_id, &data, &recipient, principal)
            .await?;

        Ok(MessageRequest {
            recipient: recipient.account_id,
            message_type: message_types::CREATE_ARCHIVE_RECORD.to_string(),
            senders_reference: instance.id.instance_guid(),
            time_to_live: message_lifetime(),
            payloads,
            correlation_id: self.resolver.correlation_id(instance),
            in_reply_to: None,
        })
    }

    async fn handle_received_message(
        &self,
        instance: &Instance,
        message: &ReceivedMessage,
    ) -> Result<()> {
        let is_transport_error = message.is_transport_error();
        if !is_transport_error && message.message_type != message_types::CREATE_ARCHIVE_RECORD_RECEIPT
        {
            tracing::info!(
                instance_id = %instance.id,
                message_id = %message.message_id,
                message_type = %message.message_type,
                "Ignoring archive message of unhandled type"
            );
            record_outcome(Outcome::Ignored);
            return Ok(());
        }

        let payloads = if message.has_payload {
            deserialize_payloads(&message.message_type, message.content.read_payloads().await?)
        } else {
            Vec::new()
        };

        let is_error = is_transport_error || payloads.iter().any(DeserializedPayload::is_error);
        if is_error {
            record_outcome(Outcome::Error);
            self.handle_error(instance, message, &payloads).await
        } else {
            record_outcome(Outcome::Success);
            self.handle_success(instance, message, &payloads).await
        }
    }

    fn validate_configuration(
        &self,
        data_types: &[DataType],
        process_tasks: &[ProcessTask],
    ) -> Result<()> {
        validation::validate_archive_settings(&self.config.archive, data_types, process_tasks)
    }
}
