//! Background receiver for archive responses
//!
//! One long-lived loop owns the subscription, a periodic tick that drives
//! health checks, and a set of per-message tasks. A failure inside a message
//! task is logged on its span, the message is nacked for redelivery, and the
//! loop carries on.

use crate::adapters::platform::InstanceClient;
use crate::adapters::transport::{decode_correlation_id, MessageTransport, ReceivedMessage};
use crate::config::TransportConfig;
use crate::core::handler::ArchiveMessageHandler;
use crate::domain::{ArchiveError, InstanceIdentifier, Result, TransportError};
use crate::{log_error_with_context, log_message_received};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinSet;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{field, Instrument, Span};

/// Listens for archive responses until shutdown
pub struct ReceiverService {
    transport: Arc<MessageTransport>,
    instances: Arc<dyn InstanceClient>,
    handler: Arc<dyn ArchiveMessageHandler>,
    tick_interval: Duration,
    health_check_interval: Duration,
}

impl ReceiverService {
    pub fn new(
        config: &TransportConfig,
        transport: Arc<MessageTransport>,
        instances: Arc<dyn InstanceClient>,
        handler: Arc<dyn ArchiveMessageHandler>,
    ) -> Self {
        Self {
            transport,
            instances,
            handler,
            tick_interval: Duration::from_millis(config.tick_interval_ms),
            health_check_interval: Duration::from_secs(config.health_check_interval_seconds),
        }
    }

    /// Runs until `shutdown` turns true or its sender is dropped
    ///
    /// In-flight messages are finished before the transport is disposed.
    ///
    /// # Errors
    ///
    /// Returns an error only if the initial subscription fails.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        let (sink, mut inbox) = mpsc::unbounded_channel();
        self.transport.on_message_received(sink).await?;
        tracing::info!(
            health_check_interval_seconds = self.health_check_interval.as_secs(),
            "Archive receiver listening"
        );

        let mut ticker = interval_at(Instant::now() + self.tick_interval, self.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut since_health_check = Duration::ZERO;
        let mut units: JoinSet<()> = JoinSet::new();

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    since_health_check += self.tick_interval;
                    if since_health_check >= self.health_check_interval {
                        since_health_check = Duration::ZERO;
                        self.check_health().await;
                    }
                }
                Some(message) = inbox.recv() => {
                    let unit = MessageUnit {
                        instances: Arc::clone(&self.instances),
                        handler: Arc::clone(&self.handler),
                    };
                    units.spawn(unit.run(message));
                }
                Some(joined) = units.join_next(), if !units.is_empty() => {
                    if let Err(e) = joined {
                        tracing::error!(error = %e, "Message task did not complete");
                    }
                }
            }
        }

        tracing::info!(in_flight = units.len(), "Archive receiver stopping");
        while let Some(joined) = units.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Message task did not complete");
            }
        }
        self.transport.dispose().await;
        tracing::info!("Archive receiver stopped");
        Ok(())
    }

    async fn check_health(&self) {
        if self.transport.is_healthy().await {
            tracing::debug!("Transport healthy");
            return;
        }

        tracing::warn!("Transport unhealthy, reconnecting");
        if let Err(e) = self.transport.reconnect().await {
            log_error_with_context!(e, "Transport reconnect failed");
        }
    }
}

/// Handles one inbound message
struct MessageUnit {
    instances: Arc<dyn InstanceClient>,
    handler: Arc<dyn ArchiveMessageHandler>,
}

impl MessageUnit {
    async fn run(self, message: ReceivedMessage) {
        let span = tracing::info_span!(
            "archive.receive",
            message_id = %message.message_id,
            message_type = %message.message_type,
            instance_id = field::Empty,
            outcome = field::Empty,
            "otel.status_code" = field::Empty,
        );

        async move {
            log_message_received!(message.message_id, message.message_type, message.in_reply_to);

            let outcome = match self.handle(&message).await {
                Ok(()) => message.responder.ack().await,
                Err(e) => Err(e),
            };

            match outcome {
                Ok(()) => {
                    Span::current().record("otel.status_code", "OK");
                    tracing::info!("Archive message acknowledged");
                }
                Err(e) => {
                    Span::current().record("otel.status_code", "ERROR");
                    log_error_with_context!(e, "Failed to handle received archive message");
                    if let Err(e) = message.responder.nack().await {
                        log_error_with_context!(e, "Failed to nack archive message");
                    }
                }
            }
        }
        .instrument(span)
        .await
    }

    async fn handle(&self, message: &ReceivedMessage) -> Result<()> {
        let wire = message.correlation_id.as_deref().ok_or_else(|| {
            TransportError::InvalidMessage(format!(
                "Message {} has no correlation id",
                message.message_id
            ))
        })?;
        let instance_url = decode_correlation_id(wire)?;
        let instance_id = InstanceIdentifier::from_url(&instance_url).map_err(ArchiveError::Domain)?;
        Span::current().record("instance_id", field::display(&instance_id));

        let instance = self.instances.get_instance(&instance_id).await?;
        self.handler.handle_received_message(&instance, message).await
    }
}
