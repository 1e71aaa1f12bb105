//! Message transport towards the national archive
//!
//! The transport is a message-queue-like service: requests are sent to an
//! account, replies arrive asynchronously on our own account and must be
//! acknowledged. This module defines the capability the archive flow needs
//! from it:
//!
//! - [`TransportConnection`] - one live connection (send, subscribe, health, close)
//! - [`TransportFactory`] - opens new connections, used on startup and reconnect
//! - [`MessageTransport`] - the shared handle the rest of the crate talks to
//!
//! [`gateway`] holds the HTTP gateway implementation and [`container`] the
//! payload container format.

pub mod container;
pub mod gateway;
pub mod handle;

use crate::domain::{message_types, MessageRequest, Result, SentMessage, TransportError};
use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use std::sync::Arc;
use tokio::sync::mpsc;
use uuid::Uuid;

pub use gateway::{GatewayTransportFactory, GatewayConnection};
pub use handle::MessageTransport;

/// Channel inbound messages are delivered on
pub type MessageSink = mpsc::UnboundedSender<ReceivedMessage>;

/// One entry of a decrypted payload container
#[derive(Clone, PartialEq, Eq)]
pub struct ReceivedPayload {
    pub filename: String,
    pub content: Vec<u8>,
}

impl std::fmt::Debug for ReceivedPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReceivedPayload")
            .field("filename", &self.filename)
            .field("size", &self.content.len())
            .finish()
    }
}

/// Access to the decrypted content of an inbound message
#[async_trait]
pub trait MessageContent: Send + Sync {
    /// Downloads and unpacks the payload container
    ///
    /// # Errors
    ///
    /// Returns an error if the content cannot be fetched or the container is
    /// malformed.
    async fn read_payloads(&self) -> Result<Vec<ReceivedPayload>>;
}

/// Acknowledgement callbacks of an inbound message
#[async_trait]
pub trait MessageResponder: Send + Sync {
    /// Confirms the message; the transport will not deliver it again
    async fn ack(&self) -> Result<()>;

    /// Rejects the message and asks for redelivery
    async fn nack(&self) -> Result<()>;
}

/// A message delivered on our account
#[derive(Clone)]
pub struct ReceivedMessage {
    pub message_id: Uuid,
    pub message_type: String,

    /// Account that sent the message
    pub sender_account_id: Uuid,

    /// Message this is a reply to
    pub in_reply_to: Option<Uuid>,

    pub senders_reference: Option<Uuid>,

    /// Correlation id as it appeared on the wire
    pub correlation_id: Option<String>,

    pub has_payload: bool,
    pub content: Arc<dyn MessageContent>,
    pub responder: Arc<dyn MessageResponder>,
}

impl ReceivedMessage {
    /// Whether the transport marked the message as an error reply
    ///
    /// A blank type tag counts as an error.
    pub fn is_transport_error(&self) -> bool {
        self.message_type.trim().is_empty() || message_types::is_error_type(&self.message_type)
    }
}

impl std::fmt::Debug for ReceivedMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReceivedMessage")
            .field("message_id", &self.message_id)
            .field("message_type", &self.message_type)
            .field("sender_account_id", &self.sender_account_id)
            .field("in_reply_to", &self.in_reply_to)
            .field("senders_reference", &self.senders_reference)
            .field("correlation_id", &self.correlation_id)
            .field("has_payload", &self.has_payload)
            .finish()
    }
}

/// A live transport connection
#[async_trait]
pub trait TransportConnection: Send + Sync {
    /// Sends a request
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the transport rejects the message or
    /// cannot be reached.
    async fn send(&self, request: MessageRequest) -> Result<SentMessage>;

    /// Starts delivering inbound messages to `sink`
    ///
    /// A connection delivers to at most one sink; subscribing again replaces it.
    async fn subscribe(&self, sink: MessageSink) -> Result<()>;

    /// Whether the connection is still usable
    async fn is_open(&self) -> bool;

    /// Stops delivery and releases the connection
    async fn close(&self);
}

/// Opens transport connections
#[async_trait]
pub trait TransportFactory: Send + Sync {
    /// # Errors
    ///
    /// Returns [`TransportError::ConnectionFailed`] if no connection can be
    /// established.
    async fn connect(&self) -> Result<Arc<dyn TransportConnection>>;
}

/// Encodes a correlation id for the wire
///
/// Correlation ids are instance URLs; they travel url-safe base64 encoded so
/// they survive header transport unchanged.
pub fn encode_correlation_id(correlation_id: &str) -> String {
    URL_SAFE_NO_PAD.encode(correlation_id.as_bytes())
}

/// Decodes a correlation id received from the wire
///
/// # Errors
///
/// Returns [`TransportError::InvalidMessage`] if the value is not url-safe
/// base64 or not UTF-8.
pub fn decode_correlation_id(wire: &str) -> Result<String> {
    let bytes = URL_SAFE_NO_PAD
        .decode(wire.trim_end_matches('=').as_bytes())
        .map_err(|e| TransportError::InvalidMessage(format!("Malformed correlation id: {e}")))?;
    let decoded = String::from_utf8(bytes).map_err(|e| {
        TransportError::InvalidMessage(format!("Correlation id is not valid UTF-8: {e}"))
    })?;
    Ok(decoded)
}
