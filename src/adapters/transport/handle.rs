//! Shared, reconnectable transport handle

use super::{MessageSink, TransportConnection, TransportFactory};
use crate::domain::{MessageRequest, Result, SentMessage};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// The single transport handle shared by senders and the receiver
///
/// The live connection sits behind a read-write lock. Senders clone the
/// current `Arc` under the read lock and send without holding it, so a
/// reconnect never waits for in-flight sends and those sends finish against
/// the connection they started on. The subscription is owned by the handle
/// and re-attached to every new connection.
pub struct MessageTransport {
    factory: Arc<dyn TransportFactory>,
    connection: RwLock<Option<Arc<dyn TransportConnection>>>,
    subscriber: Mutex<Option<MessageSink>>,
    reconnecting: Mutex<()>,
}

impl MessageTransport {
    /// Creates a handle without connecting
    pub fn new(factory: Arc<dyn TransportFactory>) -> Self {
        Self {
            factory,
            connection: RwLock::new(None),
            subscriber: Mutex::new(None),
            reconnecting: Mutex::new(()),
        }
    }

    /// Creates a handle and opens the first connection
    ///
    /// # Errors
    ///
    /// Returns an error if the connection cannot be established.
    pub async fn connect(factory: Arc<dyn TransportFactory>) -> Result<Self> {
        let transport = Self::new(factory);
        let connection = transport.factory.connect().await?;
        *transport.connection.write().await = Some(connection);
        tracing::info!("Transport connected");
        Ok(transport)
    }

    async fn current(&self) -> Result<Arc<dyn TransportConnection>> {
        if let Some(connection) = self.connection.read().await.as_ref() {
            return Ok(Arc::clone(connection));
        }

        let _guard = self.reconnecting.lock().await;
        let mut slot = self.connection.write().await;
        if let Some(connection) = slot.as_ref() {
            return Ok(Arc::clone(connection));
        }
        let connection = self.factory.connect().await?;
        *slot = Some(Arc::clone(&connection));
        Ok(connection)
    }

    /// Sends a request over the current connection
    pub async fn send_message(&self, request: MessageRequest) -> Result<SentMessage> {
        let connection = self.current().await?;
        connection.send(request).await
    }

    /// Registers the sink inbound messages are delivered to
    ///
    /// The sink survives reconnects.
    pub async fn on_message_received(&self, sink: MessageSink) -> Result<()> {
        let connection = self.current().await?;
        *self.subscriber.lock().await = Some(sink.clone());
        connection.subscribe(sink).await
    }

    /// Whether there is an open connection
    pub async fn is_healthy(&self) -> bool {
        let connection = self.connection.read().await.as_ref().map(Arc::clone);
        match connection {
            Some(connection) => connection.is_open().await,
            None => false,
        }
    }

    /// Replaces the connection with a fresh one
    ///
    /// The new connection is opened and subscribed before it is swapped in;
    /// if that fails the old connection stays in place. The old connection is
    /// closed after the swap.
    ///
    /// # Errors
    ///
    /// Returns an error if the new connection cannot be established or
    /// subscribed.
    pub async fn reconnect(&self) -> Result<()> {
        let _guard = self.reconnecting.lock().await;

        let fresh = self.factory.connect().await?;
        if let Some(sink) = self.subscriber.lock().await.clone() {
            fresh.subscribe(sink).await?;
        }

        let old = self.connection.write().await.replace(fresh);
        if let Some(old) = old {
            old.close().await;
        }

        tracing::info!("Transport reconnected");
        Ok(())
    }

    /// Drops the subscription and closes the connection
    pub async fn dispose(&self) {
        let _guard = self.reconnecting.lock().await;
        self.subscriber.lock().await.take();
        if let Some(connection) = self.connection.write().await.take() {
            connection.close().await;
        }
        tracing::debug!("Transport disposed");
    }
}
