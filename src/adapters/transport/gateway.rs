//! HTTP gateway transport
//!
//! Talks to the transport through its REST gateway:
//!
//! - `POST send` with a multipart body (`metadata` JSON + `data` container)
//! - `GET kontoer/{account}/meldinger` polled for inbound messages
//! - `GET kontoer/{account}/meldinger/{id}/payload` for the decrypted container
//! - `POST kontoer/{account}/meldinger/{id}/ack|nack`
//!
//! The gateway leases polled messages, so a message that is neither acked
//! nor nacked is handed out again once its lease expires.

use super::container;
use super::{
    encode_correlation_id, MessageContent, MessageResponder, MessageSink, ReceivedMessage,
    ReceivedPayload, TransportConnection, TransportFactory,
};
use crate::config::schema::with_trailing_slash;
use crate::config::{SecretString, TransportConfig};
use crate::domain::{MessageRequest, Result, SentMessage, TransportError};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, ClientBuilder, RequestBuilder, Response};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// Header carrying the encoded correlation id
pub const CORRELATION_HEADER: &str = "klientKorrelasjonsId";

/// Consecutive poll failures after which the connection reports unhealthy
const MAX_POLL_FAILURES: u32 = 3;

struct GatewaySettings {
    api_url: String,
    account_id: Uuid,
    integration_id: Uuid,
    integration_password: SecretString,
    poll_interval: Duration,
}

impl GatewaySettings {
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    fn messages_url(&self) -> String {
        self.url(&format!("kontoer/{}/meldinger", self.account_id))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("IntegrasjonId", self.integration_id.to_string())
            .header(
                "IntegrasjonPassord",
                self.integration_password.expose_secret().as_str(),
            )
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendMetadata<'a> {
    avsender_konto_id: Uuid,
    mottaker_konto_id: Uuid,
    melding_type: &'a str,
    /// Time to live in milliseconds
    ttl: i64,
    klient_melding_id: Uuid,
    #[serde(skip_serializing_if = "Option::is_none")]
    svar_pa_melding: Option<Uuid>,
    headere: HashMap<&'static str, String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendReceipt {
    melding_id: Uuid,
    melding_type: String,
    mottaker_konto_id: Uuid,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessageEnvelope {
    melding_id: Uuid,
    #[serde(default)]
    melding_type: String,
    avsender_konto_id: Uuid,
    #[serde(default)]
    svar_pa_melding: Option<Uuid>,
    #[serde(default)]
    klient_melding_id: Option<Uuid>,
    #[serde(default)]
    headere: HashMap<String, String>,
    #[serde(default)]
    har_payload: bool,
}

/// Opens [`GatewayConnection`]s
pub struct GatewayTransportFactory {
    client: Client,
    settings: Arc<GatewaySettings>,
}

impl GatewayTransportFactory {
    pub fn new(config: &TransportConfig) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                TransportError::ConnectionFailed(format!("Failed to build HTTP client: {e}"))
            })?;

        let settings = GatewaySettings {
            api_url: format!("{}fiks-io/api/v1/", with_trailing_slash(&config.base_url)),
            account_id: config.account_id,
            integration_id: config.integration_id,
            integration_password: config.integration_password.clone(),
            poll_interval: Duration::from_secs(config.poll_interval_seconds),
        };

        Ok(Self {
            client,
            settings: Arc::new(settings),
        })
    }
}

#[async_trait]
impl TransportFactory for GatewayTransportFactory {
    async fn connect(&self) -> Result<Arc<dyn TransportConnection>> {
        let url = self.settings.url(&format!("kontoer/{}", self.settings.account_id));
        let response = self
            .settings
            .authorize(self.client.get(url))
            .send()
            .await
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::ConnectionFailed(format!(
                "Account lookup returned {status}: {body}"
            ))
            .into());
        }

        tracing::debug!(account_id = %self.settings.account_id, "Gateway connection opened");
        Ok(Arc::new(GatewayConnection {
            client: self.client.clone(),
            settings: Arc::clone(&self.settings),
            open: Arc::new(AtomicBool::new(true)),
            closed: AtomicBool::new(false),
            poller: Mutex::new(None),
        }))
    }
}

/// A connection to the gateway
///
/// Inbound messages are fetched by a polling task started on subscribe.
pub struct GatewayConnection {
    client: Client,
    settings: Arc<GatewaySettings>,
    open: Arc<AtomicBool>,
    closed: AtomicBool,
    poller: Mutex<Option<JoinHandle<()>>>,
}

impl GatewayConnection {
    fn replace_poller(&self, poller: Option<JoinHandle<()>>) {
        let previous = match self.poller.lock() {
            Ok(mut slot) => std::mem::replace(&mut *slot, poller),
            Err(poisoned) => std::mem::replace(&mut *poisoned.into_inner(), poller),
        };
        if let Some(previous) = previous {
            previous.abort();
        }
    }
}

#[async_trait]
impl TransportConnection for GatewayConnection {
    async fn send(&self, request: MessageRequest) -> Result<SentMessage> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed.into());
        }

        let mut headers = HashMap::new();
        headers.insert(
            CORRELATION_HEADER,
            encode_correlation_id(&request.correlation_id),
        );

        let metadata = SendMetadata {
            avsender_konto_id: self.settings.account_id,
            mottaker_konto_id: request.recipient,
            melding_type: &request.message_type,
            ttl: request.time_to_live.num_milliseconds(),
            klient_melding_id: request.senders_reference,
            svar_pa_melding: request.in_reply_to,
            headere: headers,
        };
        let metadata = serde_json::to_string(&metadata)?;
        let data = container::pack(&request.payloads)?;

        let data_part = Part::bytes(data)
            .file_name("payload.zip")
            .mime_str("application/zip")
            .map_err(|e| TransportError::Container(e.to_string()))?;
        let form = Form::new().text("metadata", metadata).part("data", data_part);

        let response = self
            .settings
            .authorize(self.client.post(self.settings.url("send")))
            .multipart(form)
            .send()
            .await
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        let response = ensure_success(response).await?;
        let receipt = response.json::<SendReceipt>().await.map_err(|e| {
            TransportError::InvalidMessage(format!("Failed to parse send receipt: {e}"))
        })?;

        Ok(SentMessage {
            message_id: receipt.melding_id,
            message_type: receipt.melding_type,
            recipient_account_id: receipt.mottaker_konto_id,
        })
    }

    async fn subscribe(&self, sink: MessageSink) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(TransportError::Closed.into());
        }

        let poller = tokio::spawn(poll_messages(
            self.client.clone(),
            Arc::clone(&self.settings),
            sink,
            Arc::clone(&self.open),
        ));
        self.replace_poller(Some(poller));
        Ok(())
    }

    async fn is_open(&self) -> bool {
        !self.closed.load(Ordering::SeqCst) && self.open.load(Ordering::SeqCst)
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.replace_poller(None);
    }
}

async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(TransportError::SendFailed {
        status: status.as_u16(),
        body,
    }
    .into())
}

async fn poll_messages(
    client: Client,
    settings: Arc<GatewaySettings>,
    sink: MessageSink,
    open: Arc<AtomicBool>,
) {
    let mut ticker = tokio::time::interval(settings.poll_interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let mut failures = 0u32;

    loop {
        ticker.tick().await;
        if sink.is_closed() {
            break;
        }

        match fetch_envelopes(&client, &settings).await {
            Ok(envelopes) => {
                failures = 0;
                open.store(true, Ordering::SeqCst);
                for envelope in envelopes {
                    let message = into_received(&client, &settings, envelope);
                    if sink.send(message).is_err() {
                        return;
                    }
                }
            }
            Err(e) => {
                failures += 1;
                tracing::warn!(error = %e, failures, "Polling for inbound messages failed");
                if failures >= MAX_POLL_FAILURES {
                    open.store(false, Ordering::SeqCst);
                }
            }
        }
    }
}

async fn fetch_envelopes(
    client: &Client,
    settings: &GatewaySettings,
) -> Result<Vec<MessageEnvelope>> {
    let response = settings
        .authorize(client.get(settings.messages_url()))
        .send()
        .await
        .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

    let response = ensure_success(response).await?;
    let envelopes = response.json::<Vec<MessageEnvelope>>().await.map_err(|e| {
        TransportError::InvalidMessage(format!("Failed to parse message list: {e}"))
    })?;
    Ok(envelopes)
}

fn into_received(
    client: &Client,
    settings: &Arc<GatewaySettings>,
    envelope: MessageEnvelope,
) -> ReceivedMessage {
    let message_url = format!("{}/{}", settings.messages_url(), envelope.melding_id);
    let handle = Arc::new(GatewayMessage {
        client: client.clone(),
        settings: Arc::clone(settings),
        message_url,
        has_payload: envelope.har_payload,
    });

    ReceivedMessage {
        message_id: envelope.melding_id,
        message_type: envelope.melding_type,
        sender_account_id: envelope.avsender_konto_id,
        in_reply_to: envelope.svar_pa_melding,
        senders_reference: envelope.klient_melding_id,
        correlation_id: envelope.headere.get(CORRELATION_HEADER).cloned(),
        has_payload: envelope.har_payload,
        content: handle.clone(),
        responder: handle,
    }
}

/// Content and responder of one polled message
struct GatewayMessage {
    client: Client,
    settings: Arc<GatewaySettings>,
    message_url: String,
    has_payload: bool,
}

impl GatewayMessage {
    async fn post(&self, action: &str) -> Result<()> {
        let url = format!("{}/{}", self.message_url, action);
        let response = self
            .settings
            .authorize(self.client.post(url))
            .send()
            .await
            .map_err(|e| TransportError::AckFailed(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::AckFailed(format!("{action} returned {status}: {body}")).into());
        }
        Ok(())
    }
}

#[async_trait]
impl MessageContent for GatewayMessage {
    async fn read_payloads(&self) -> Result<Vec<ReceivedPayload>> {
        if !self.has_payload {
            return Ok(Vec::new());
        }

        let url = format!("{}/payload", self.message_url);
        let response = self
            .settings
            .authorize(self.client.get(url))
            .send()
            .await
            .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

        let response = ensure_success(response).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::InvalidMessage(format!("Failed to read payload: {e}")))?;
        container::unpack(&bytes)
    }
}

#[async_trait]
impl MessageResponder for GatewayMessage {
    async fn ack(&self) -> Result<()> {
        self.post("ack").await
    }

    async fn nack(&self) -> Result<()> {
        self.post("nack").await
    }
}
