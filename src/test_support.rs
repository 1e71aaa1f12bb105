//! Shared fixtures and in-memory fakes for unit tests

use crate::adapters::notify::{OperatorNotification, OperatorNotifier};
use crate::adapters::platform::{
    InstanceClient, NewDataElement, OrgDetails, OrgRegistry, Party, PartyRegistry,
};
use crate::adapters::transport::{
    encode_correlation_id, MessageContent, MessageResponder, MessageSink, ReceivedMessage,
    ReceivedPayload, TransportConnection, TransportFactory,
};
use crate::config::ArchivelinkConfig;
use crate::domain::{
    message_lifetime, message_types, ApplicationMetadata, ArchiveError, DataElement, DocumentRole,
    Instance, InstanceIdentifier, MessagePayload, MessageRequest, PlatformError, ProcessTask,
    Result, SentMessage, TransportError,
};
use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing_subscriber::fmt::MakeWriter;
use uuid::Uuid;

pub const SAMPLE_CONFIG_TOML: &str = r#"
environment = "development"

[application]
org = "ttd"
app = "my-app"
app_base_url = "https://ttd.apps.altinn.no/ttd/my-app"

[transport]
base_url = "https://api.fiks.ks.no"
account_id = "00000000-0000-0000-0000-000000000001"
integration_id = "00000000-0000-0000-0000-000000000002"
integration_password = "secret"

[archive.recipient]
account = { value = "00000000-0000-0000-0000-000000000003" }
identifier = { value = "KOMMUNE" }
name = { value = "Kommunen" }

[archive.documents]
primary = { data_type = "model" }
attachments = [{ data_type = "attachment" }]

[archive.receipt]
confirmation_record = { data_type = "archive-receipt" }
archive_record = { data_type = "archive-record" }

[archive.auto_send]
after_task_id = "Task_2"
success_handling = { move_to_next_task = true, mark_instance_complete = true }
error_handling = { move_to_next_task = true, action = "reject" }

[logging]
local_enabled = false
"#;

pub const INSTANCE_GUID: &str = "a4f1c8a4-2d6b-4e0b-8d4b-2b1f2a6f0c11";

pub const MODEL_ELEMENT_ID: Uuid = Uuid::from_u128(0x100);
const ATTACHMENT_ELEMENT_ID: Uuid = Uuid::from_u128(0x101);
const SECOND_ATTACHMENT_ELEMENT_ID: Uuid = Uuid::from_u128(0x102);

const MODEL_JSON: &str = r#"{
  "recipient": {
    "account": "00000000-0000-0000-0000-00000000000a",
    "name": "Bygdeby kommune",
    "orgNumber": "944000111"
  },
  "title": "Søknad om tillatelse"
}"#;

pub const RECEIPT_XML: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<arkivmeldingKvittering xmlns="https://ks-no.github.io/standarder/fiks-protokoll/fiks-arkiv/arkivmeldingkvittering/v1">
  <tidspunkt>2025-03-14T09:31:00</tidspunkt>
  <mappeKvittering>
    <systemID label="Arkiv">1f2e3d4c</systemID>
    <saksaar>2025</saksaar>
    <sakssekvensnummer>42</sakssekvensnummer>
  </mappeKvittering>
</arkivmeldingKvittering>"#;

pub fn sample_config() -> ArchivelinkConfig {
    toml::from_str(SAMPLE_CONFIG_TOML).unwrap()
}

pub fn sample_instance_url() -> String {
    format!("https://ttd.apps.altinn.no/ttd/my-app/instances/501337/{INSTANCE_GUID}")
}

pub fn sample_instance() -> Instance {
    serde_json::from_value(json!({
        "id": format!("501337/{INSTANCE_GUID}"),
        "appId": "ttd/my-app",
        "org": "ttd",
        "instanceOwner": { "partyId": "501337" },
        "process": { "currentTask": { "elementId": "Task_2", "name": "Arkivering" } },
        "data": [
            {
                "id": MODEL_ELEMENT_ID,
                "dataType": "model",
                "contentType": "application/json",
                "size": MODEL_JSON.len()
            },
            {
                "id": ATTACHMENT_ELEMENT_ID,
                "dataType": "attachment",
                "contentType": "application/pdf",
                "filename": "vedlegg.pdf",
                "size": 8
            },
            {
                "id": SECOND_ATTACHMENT_ELEMENT_ID,
                "dataType": "attachment",
                "contentType": "application/pdf",
                "filename": "Vedlegg.pdf",
                "size": 8
            }
        ]
    }))
    .unwrap()
}

pub fn sample_app_metadata() -> ApplicationMetadata {
    serde_json::from_value(json!({
        "id": "ttd/my-app",
        "org": "ttd",
        "title": { "nb": "Byggesøknad", "en": "Building application" },
        "dataTypes": [
            {
                "id": "model",
                "allowedContentTypes": ["application/xml"],
                "appLogic": { "classRef": "App.Models.Byggesoknad" },
                "taskId": "Task_1",
                "maxCount": 1
            },
            { "id": "attachment", "allowedContentTypes": ["application/pdf"], "taskId": "Task_1" },
            { "id": "archive-receipt", "allowedContentTypes": ["application/json"] },
            { "id": "archive-record", "allowedContentTypes": ["application/xml"] }
        ]
    }))
    .unwrap()
}

pub fn sample_process_tasks() -> Vec<ProcessTask> {
    vec![
        ProcessTask {
            id: "Task_1".to_string(),
            name: Some("Utfylling".to_string()),
            task_type: Some("data".to_string()),
        },
        ProcessTask {
            id: "Task_2".to_string(),
            name: Some("Arkivering".to_string()),
            task_type: Some("archive".to_string()),
        },
    ]
}

pub fn sample_message_request() -> MessageRequest {
    MessageRequest {
        recipient: Uuid::from_u128(3),
        message_type: message_types::CREATE_ARCHIVE_RECORD.to_string(),
        senders_reference: Uuid::parse_str(INSTANCE_GUID).unwrap(),
        time_to_live: message_lifetime(),
        payloads: vec![
            MessagePayload::new(
                "arkivmelding.xml",
                b"<arkivmelding/>".to_vec(),
                DocumentRole::Primary,
            ),
            MessagePayload::new("model.json", MODEL_JSON.as_bytes().to_vec(), DocumentRole::Primary),
        ],
        correlation_id: sample_instance_url(),
        in_reply_to: None,
    }
}

fn not_found(what: &str) -> ArchiveError {
    ArchiveError::Platform(PlatformError::ClientError {
        status: 404,
        body: format!("{what} not found"),
    })
}

/// Instance API over one stored instance, recording every write
pub struct FakeInstanceClient {
    instance: Instance,
    content: HashMap<Uuid, Vec<u8>>,
    reads: Mutex<Vec<Uuid>>,
    inserts: Mutex<Vec<NewDataElement>>,
    moves: Mutex<Vec<Option<String>>>,
    completions: AtomicUsize,
    fail_writes: AtomicBool,
}

impl FakeInstanceClient {
    pub fn with_instance(instance: Instance) -> Self {
        let content = instance
            .data
            .iter()
            .map(|element| {
                let bytes = if element.id == MODEL_ELEMENT_ID {
                    MODEL_JSON.as_bytes().to_vec()
                } else {
                    b"%PDF-1.7".to_vec()
                };
                (element.id, bytes)
            })
            .collect();

        Self {
            instance,
            content,
            reads: Mutex::default(),
            inserts: Mutex::default(),
            moves: Mutex::default(),
            completions: AtomicUsize::new(0),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn data_reads(&self) -> Vec<Uuid> {
        self.reads.lock().unwrap().clone()
    }

    pub fn inserts(&self) -> Vec<NewDataElement> {
        self.inserts.lock().unwrap().clone()
    }

    pub fn moves(&self) -> Vec<Option<String>> {
        self.moves.lock().unwrap().clone()
    }

    pub fn completions(&self) -> usize {
        self.completions.load(Ordering::SeqCst)
    }

    /// Makes every subsequent write fail with a server error
    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    fn check_writable(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(ArchiveError::Platform(PlatformError::ServerError {
                status: 503,
                body: "storage unavailable".to_string(),
            }));
        }
        Ok(())
    }

    fn check_id(&self, id: &InstanceIdentifier) -> Result<()> {
        if *id != self.instance.id {
            return Err(not_found(&format!("instance {id}")));
        }
        Ok(())
    }
}

#[async_trait]
impl InstanceClient for FakeInstanceClient {
    async fn get_instance(&self, id: &InstanceIdentifier) -> Result<Instance> {
        self.check_id(id)?;
        Ok(self.instance.clone())
    }

    async fn get_data_bytes(
        &self,
        id: &InstanceIdentifier,
        data_element_id: Uuid,
    ) -> Result<Vec<u8>> {
        self.check_id(id)?;
        self.reads.lock().unwrap().push(data_element_id);
        self.content
            .get(&data_element_id)
            .cloned()
            .ok_or_else(|| not_found(&format!("data element {data_element_id}")))
    }

    async fn insert_binary_data(
        &self,
        id: &InstanceIdentifier,
        element: NewDataElement,
    ) -> Result<DataElement> {
        self.check_id(id)?;
        self.check_writable()?;
        let stored = DataElement {
            id: Uuid::new_v4(),
            data_type: element.data_type.clone(),
            content_type: Some(element.content_type.clone()),
            filename: Some(element.filename.clone()),
            size: element.content.len() as u64,
        };
        self.inserts.lock().unwrap().push(element);
        Ok(stored)
    }

    async fn process_move_next(
        &self,
        id: &InstanceIdentifier,
        action: Option<&str>,
    ) -> Result<()> {
        self.check_id(id)?;
        self.check_writable()?;
        self.moves.lock().unwrap().push(action.map(str::to_string));
        Ok(())
    }

    async fn mark_instance_complete(&self, id: &InstanceIdentifier) -> Result<()> {
        self.check_id(id)?;
        self.check_writable()?;
        self.completions.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Party register that knows at most one party; unknown parties are 404s
#[derive(Default)]
pub struct FakePartyRegistry {
    party: Option<Party>,
}

impl FakePartyRegistry {
    pub fn with_party(party: Party) -> Self {
        Self { party: Some(party) }
    }
}

#[async_trait]
impl PartyRegistry for FakePartyRegistry {
    async fn get_party(&self, party_id: u64) -> Result<Party> {
        self.party
            .clone()
            .filter(|p| p.party_id == party_id)
            .ok_or_else(|| not_found(&format!("party {party_id}")))
    }
}

#[derive(Default)]
pub struct FakeOrgRegistry {
    orgs: HashMap<String, OrgDetails>,
    failing: bool,
}

impl FakeOrgRegistry {
    pub fn failing() -> Self {
        Self {
            failing: true,
            ..Self::default()
        }
    }

    pub fn insert(&mut self, org: &str, details: OrgDetails) {
        self.orgs.insert(org.to_string(), details);
    }
}

#[async_trait]
impl OrgRegistry for FakeOrgRegistry {
    async fn get_org(&self, org: &str) -> Result<Option<OrgDetails>> {
        if self.failing {
            return Err(ArchiveError::Platform(PlatformError::ConnectionFailed(
                "registry unreachable".to_string(),
            )));
        }
        Ok(self.orgs.get(org).cloned())
    }
}

#[derive(Default)]
pub struct FakeNotifier {
    sent: Mutex<Vec<OperatorNotification>>,
    failing: AtomicBool,
}

impl FakeNotifier {
    pub fn sent(&self) -> Vec<OperatorNotification> {
        self.sent.lock().unwrap().clone()
    }

    pub fn fail(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl OperatorNotifier for FakeNotifier {
    async fn notify(&self, notification: OperatorNotification) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ArchiveError::Notification("mail gateway down".to_string()));
        }
        self.sent.lock().unwrap().push(notification);
        Ok(())
    }
}

/// Transport connection that records sends and delivers on demand
pub struct FakeConnection {
    healthy: bool,
    closed: AtomicBool,
    sent: Mutex<Vec<MessageRequest>>,
    sink: Mutex<Option<MessageSink>>,
}

impl FakeConnection {
    fn new(healthy: bool) -> Self {
        Self {
            healthy,
            closed: AtomicBool::new(false),
            sent: Mutex::default(),
            sink: Mutex::default(),
        }
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn is_subscribed(&self) -> bool {
        self.sink.lock().unwrap().is_some()
    }

    /// Pushes a message to the current subscriber
    pub fn deliver(&self, message: ReceivedMessage) {
        let sink = self.sink.lock().unwrap();
        sink.as_ref()
            .expect("connection has no subscriber")
            .send(message)
            .unwrap();
    }
}

#[async_trait]
impl TransportConnection for FakeConnection {
    async fn send(&self, request: MessageRequest) -> Result<SentMessage> {
        if self.is_closed() {
            return Err(TransportError::Closed.into());
        }
        let sent = SentMessage {
            message_id: Uuid::new_v4(),
            message_type: request.message_type.clone(),
            recipient_account_id: request.recipient,
        };
        self.sent.lock().unwrap().push(request);
        Ok(sent)
    }

    async fn subscribe(&self, sink: MessageSink) -> Result<()> {
        *self.sink.lock().unwrap() = Some(sink);
        Ok(())
    }

    async fn is_open(&self) -> bool {
        self.healthy && !self.is_closed()
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.sink.lock().unwrap().take();
    }
}

/// Opens [`FakeConnection`]s, healthy unless scripted otherwise
#[derive(Default)]
pub struct FakeTransportFactory {
    health: Vec<bool>,
    connections: Mutex<Vec<Arc<FakeConnection>>>,
    fail_next: AtomicBool,
}

impl FakeTransportFactory {
    /// Health of each connection by the order it is opened in
    pub fn with_health(health: Vec<bool>) -> Self {
        Self {
            health,
            ..Self::default()
        }
    }

    pub fn connect_count(&self) -> usize {
        self.connections.lock().unwrap().len()
    }

    pub fn connection(&self, index: usize) -> Arc<FakeConnection> {
        Arc::clone(&self.connections.lock().unwrap()[index])
    }

    pub fn fail_next_connect(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl TransportFactory for FakeTransportFactory {
    async fn connect(&self) -> Result<Arc<dyn TransportConnection>> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(TransportError::ConnectionFailed("gateway unreachable".to_string()).into());
        }
        let mut connections = self.connections.lock().unwrap();
        let healthy = self.health.get(connections.len()).copied().unwrap_or(true);
        let connection = Arc::new(FakeConnection::new(healthy));
        connections.push(Arc::clone(&connection));
        Ok(connection)
    }
}

#[derive(Default)]
pub struct FakeResponder {
    acks: AtomicUsize,
    nacks: AtomicUsize,
}

impl FakeResponder {
    pub fn acks(&self) -> usize {
        self.acks.load(Ordering::SeqCst)
    }

    pub fn nacks(&self) -> usize {
        self.nacks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MessageResponder for FakeResponder {
    async fn ack(&self) -> Result<()> {
        self.acks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn nack(&self) -> Result<()> {
        self.nacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct FakeContent {
    payloads: Vec<ReceivedPayload>,
}

#[async_trait]
impl MessageContent for FakeContent {
    async fn read_payloads(&self) -> Result<Vec<ReceivedPayload>> {
        Ok(self.payloads.clone())
    }
}

/// Inbound message correlated with the sample instance
///
/// `content` becomes a single `svar.xml` payload when present.
pub fn received_message(
    message_type: &str,
    content: Option<&str>,
) -> (ReceivedMessage, Arc<FakeResponder>) {
    let responder = Arc::new(FakeResponder::default());
    let payloads = content
        .map(|c| {
            vec![ReceivedPayload {
                filename: "svar.xml".to_string(),
                content: c.as_bytes().to_vec(),
            }]
        })
        .unwrap_or_default();

    let message = ReceivedMessage {
        message_id: Uuid::new_v4(),
        message_type: message_type.to_string(),
        sender_account_id: Uuid::from_u128(3),
        in_reply_to: Some(Uuid::new_v4()),
        senders_reference: Some(Uuid::parse_str(INSTANCE_GUID).unwrap()),
        correlation_id: Some(encode_correlation_id(&sample_instance_url())),
        has_payload: content.is_some(),
        content: Arc::new(FakeContent { payloads }),
        responder: responder.clone(),
    };
    (message, responder)
}

/// Captures formatted log output of the current thread
#[derive(Clone, Default)]
pub struct LogCapture {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl LogCapture {
    /// Installs an INFO-level subscriber writing into this capture
    pub fn set_default(&self) -> tracing::subscriber::DefaultGuard {
        let subscriber = tracing_subscriber::fmt()
            .with_writer(self.clone())
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .without_time()
            .finish();
        tracing::subscriber::set_default(subscriber)
    }

    pub fn lines(&self) -> Vec<String> {
        let buffer = self.buffer.lock().unwrap();
        String::from_utf8_lossy(&buffer)
            .lines()
            .filter(|l| !l.trim().is_empty())
            .map(str::to_string)
            .collect()
    }
}

pub struct CaptureWriter(Arc<Mutex<Vec<u8>>>);

impl io::Write for CaptureWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = CaptureWriter;

    fn make_writer(&'a self) -> Self::Writer {
        CaptureWriter(Arc::clone(&self.buffer))
    }
}
