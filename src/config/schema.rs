//! Configuration schema types
//!
//! This module defines the configuration structure for archivelink. The
//! configuration is loaded once at startup and shared read-only between
//! components.

use crate::config::binding::BindableValue;
use crate::config::SecretString;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Runtime environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development against the platform test harness
    #[default]
    Development,
    /// Staging environment
    Staging,
    /// Production environment
    Production,
}

/// Main archivelink configuration
///
/// This is the root configuration structure that maps to the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchivelinkConfig {
    /// Application-level settings
    pub application: ApplicationConfig,

    /// Runtime environment (development, staging, production)
    #[serde(default)]
    pub environment: Environment,

    /// Hosting platform APIs
    #[serde(default)]
    pub platform: PlatformConfig,

    /// Message transport account and gateway
    pub transport: TransportConfig,

    /// Archive submission settings
    pub archive: ArchiveConfig,

    /// Operator notification texts
    #[serde(default)]
    pub notifications: NotificationConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ArchivelinkConfig {
    /// Validates the configuration
    ///
    /// Cross-checks against the application's declared data types happen
    /// later, once the application metadata is loaded.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid
    pub fn validate(&self) -> Result<(), String> {
        self.application.validate()?;
        self.platform.validate(&self.environment)?;
        self.transport.validate()?;
        self.archive.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// Application-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Service owner short code
    pub org: String,

    /// Application name
    pub app: String,

    /// Public base URL of the application, e.g. `https://ttd.apps.altinn.no/ttd/my-app/`
    pub app_base_url: String,

    /// Path to `applicationmetadata.json`
    #[serde(default = "default_metadata_path")]
    pub metadata_path: String,

    /// Path to the BPMN process definition
    #[serde(default = "default_process_path")]
    pub process_path: String,
}

impl ApplicationConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.as_str()) {
            return Err(format!(
                "Invalid log_level '{}'. Must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            ));
        }

        if self.org.trim().is_empty() {
            return Err("application.org cannot be empty".to_string());
        }
        if self.app.trim().is_empty() {
            return Err("application.app cannot be empty".to_string());
        }

        validate_url("application.app_base_url", &self.app_base_url)?;
        Ok(())
    }

    /// `{org}/{app}`
    pub fn app_id(&self) -> String {
        format!("{}/{}", self.org, self.app)
    }

    /// Base URL with a guaranteed trailing slash
    pub fn app_base_url(&self) -> String {
        with_trailing_slash(&self.app_base_url)
    }
}

/// Hosting platform configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Storage API base URL
    #[serde(default = "default_storage_endpoint")]
    pub storage_endpoint: String,

    /// Register API base URL
    #[serde(default = "default_register_endpoint")]
    pub register_endpoint: String,

    /// Notifications API base URL
    #[serde(default = "default_notifications_endpoint")]
    pub notifications_endpoint: String,

    /// Public registry of service owners
    #[serde(default = "default_org_registry_url")]
    pub org_registry_url: String,

    /// API management subscription key, sent on every request when set
    #[serde(default)]
    pub subscription_key: Option<SecretString>,

    /// Token identifying this application to the platform
    #[serde(default)]
    pub platform_access_token: Option<SecretString>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Service owner token acquisition
    #[serde(default)]
    pub auth: PlatformAuthConfig,
}

impl PlatformConfig {
    fn validate(&self, environment: &Environment) -> Result<(), String> {
        validate_url("platform.storage_endpoint", &self.storage_endpoint)?;
        validate_url("platform.register_endpoint", &self.register_endpoint)?;
        validate_url("platform.notifications_endpoint", &self.notifications_endpoint)?;
        validate_url("platform.org_registry_url", &self.org_registry_url)?;

        if self.timeout_seconds == 0 {
            return Err("platform.timeout_seconds must be > 0".to_string());
        }

        // Outside development the token is exchanged with client credentials
        if *environment != Environment::Development {
            use secrecy::ExposeSecret;

            let auth = &self.auth;
            if auth.token_url.as_deref().map_or(true, str::is_empty) {
                return Err(
                    "platform.auth.token_url is required outside development".to_string()
                );
            }
            if auth.client_id.as_deref().map_or(true, str::is_empty) {
                return Err(
                    "platform.auth.client_id is required outside development".to_string()
                );
            }
            if auth
                .client_secret
                .as_ref()
                .map_or(true, |s| s.expose_secret().is_empty())
            {
                return Err(
                    "platform.auth.client_secret is required outside development".to_string()
                );
            }
            if self.platform_access_token.is_none() {
                return Err(
                    "platform.platform_access_token is required outside development".to_string()
                );
            }
        }
        Ok(())
    }
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            storage_endpoint: default_storage_endpoint(),
            register_endpoint: default_register_endpoint(),
            notifications_endpoint: default_notifications_endpoint(),
            org_registry_url: default_org_registry_url(),
            subscription_key: None,
            platform_access_token: None,
            timeout_seconds: default_timeout_seconds(),
            auth: PlatformAuthConfig::default(),
        }
    }
}

/// Service owner token settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformAuthConfig {
    /// OAuth2 token endpoint (client credentials grant)
    #[serde(default)]
    pub token_url: Option<String>,

    #[serde(default)]
    pub client_id: Option<String>,

    #[serde(default)]
    pub client_secret: Option<SecretString>,

    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,

    /// Tokens are refreshed this many seconds before they expire
    #[serde(default = "default_token_refresh_margin_seconds")]
    pub token_refresh_margin_seconds: u64,

    /// Test token endpoint used in development
    #[serde(default = "default_local_token_url")]
    pub local_token_url: String,
}

impl Default for PlatformAuthConfig {
    fn default() -> Self {
        Self {
            token_url: None,
            client_id: None,
            client_secret: None,
            scopes: default_scopes(),
            token_refresh_margin_seconds: default_token_refresh_margin_seconds(),
            local_token_url: default_local_token_url(),
        }
    }
}

/// Message transport configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Gateway base URL
    pub base_url: String,

    /// Account this application sends from and receives on
    pub account_id: Uuid,

    /// Integration credentials for the gateway
    pub integration_id: Uuid,

    pub integration_password: SecretString,

    /// How often the gateway is polled for inbound messages
    #[serde(default = "default_poll_interval_seconds")]
    pub poll_interval_seconds: u64,

    /// Receiver loop tick in milliseconds
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Interval between transport health checks
    #[serde(default = "default_health_check_interval_seconds")]
    pub health_check_interval_seconds: u64,

    /// Request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
}

impl TransportConfig {
    fn validate(&self) -> Result<(), String> {
        validate_url("transport.base_url", &self.base_url)?;

        if self.account_id.is_nil() {
            return Err("transport.account_id cannot be the nil UUID".to_string());
        }
        if self.poll_interval_seconds == 0 {
            return Err("transport.poll_interval_seconds must be > 0".to_string());
        }
        if self.tick_interval_ms == 0 {
            return Err("transport.tick_interval_ms must be > 0".to_string());
        }
        if self.health_check_interval_seconds * 1000 < self.tick_interval_ms {
            return Err(
                "transport.health_check_interval_seconds must be at least one tick".to_string(),
            );
        }
        Ok(())
    }
}

/// Archive submission settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveConfig {
    pub recipient: RecipientConfig,

    pub documents: DocumentsConfig,

    /// Optional overrides for titles and identifiers in the archive record
    #[serde(default)]
    pub metadata: Option<MetadataConfig>,

    pub receipt: ReceiptConfig,

    /// Automatic submission when a process task completes
    #[serde(default)]
    pub auto_send: Option<AutoSendConfig>,
}

impl ArchiveConfig {
    fn validate(&self) -> Result<(), String> {
        self.recipient.validate()?;
        self.documents.validate()?;
        if let Some(metadata) = &self.metadata {
            metadata.validate()?;
        }
        self.receipt.validate()?;
        if let Some(auto_send) = &self.auto_send {
            auto_send.validate()?;
        }
        Ok(())
    }

    /// Whether a submission should be made when `task_id` completes
    pub fn is_auto_send_enabled_for(&self, task_id: &str) -> bool {
        self.auto_send
            .as_ref()
            .is_some_and(|a| a.after_task_id == task_id)
    }
}

/// Archive recipient
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipientConfig {
    /// Transport account of the archive
    pub account: BindableValue<Uuid>,

    /// Identifier used on the correspondence party record
    pub identifier: BindableValue<String>,

    pub name: BindableValue<String>,

    #[serde(default)]
    pub org_number: Option<BindableValue<String>>,
}

impl RecipientConfig {
    fn validate(&self) -> Result<(), String> {
        self.account.validate("archive.recipient.account")?;
        self.identifier.validate("archive.recipient.identifier")?;
        self.name.validate("archive.recipient.name")?;
        if let Some(org_number) = &self.org_number {
            org_number.validate("archive.recipient.org_number")?;
        }
        Ok(())
    }

    /// All bindings, labelled with the setting they belong to
    pub fn bindings(&self) -> Vec<(&'static str, &crate::config::DataBinding)> {
        let mut bindings = Vec::new();
        if let Some(b) = &self.account.binding {
            bindings.push(("archive.recipient.account", b));
        }
        if let Some(b) = &self.identifier.binding {
            bindings.push(("archive.recipient.identifier", b));
        }
        if let Some(b) = &self.name.binding {
            bindings.push(("archive.recipient.name", b));
        }
        if let Some(b) = self.org_number.as_ref().and_then(|o| o.binding.as_ref()) {
            bindings.push(("archive.recipient.org_number", b));
        }
        bindings
    }
}

/// Documents included in the submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentsConfig {
    pub primary: DocumentConfig,

    #[serde(default)]
    pub attachments: Vec<DocumentConfig>,
}

impl DocumentsConfig {
    fn validate(&self) -> Result<(), String> {
        self.primary.validate("archive.documents.primary")?;
        for (i, attachment) in self.attachments.iter().enumerate() {
            attachment.validate(&format!("archive.documents.attachments[{i}]"))?;
        }
        Ok(())
    }
}

/// A data type to include, with an optional filename override
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentConfig {
    pub data_type: String,

    #[serde(default)]
    pub filename: Option<String>,
}

impl DocumentConfig {
    pub fn new(data_type: impl Into<String>) -> Self {
        Self {
            data_type: data_type.into(),
            filename: None,
        }
    }

    fn validate(&self, name: &str) -> Result<(), String> {
        if self.data_type.trim().is_empty() {
            return Err(format!("{name}.data_type cannot be empty"));
        }
        if let Some(filename) = &self.filename {
            validate_filename(name, filename)?;
        }
        Ok(())
    }
}

/// Overrides for the archive record
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataConfig {
    #[serde(default)]
    pub case_file_id: Option<BindableValue<String>>,

    #[serde(default)]
    pub case_file_title: Option<BindableValue<String>>,

    #[serde(default)]
    pub journal_entry_title: Option<BindableValue<String>>,

    #[serde(default)]
    pub system_id: Option<BindableValue<String>>,

    #[serde(default)]
    pub rule_id: Option<BindableValue<String>>,
}

impl MetadataConfig {
    fn validate(&self) -> Result<(), String> {
        for (name, value) in self.fields() {
            value.validate(name)?;
        }
        Ok(())
    }

    /// Configured fields, labelled with their setting name
    pub fn fields(&self) -> Vec<(&'static str, &BindableValue<String>)> {
        [
            ("archive.metadata.case_file_id", &self.case_file_id),
            ("archive.metadata.case_file_title", &self.case_file_title),
            ("archive.metadata.journal_entry_title", &self.journal_entry_title),
            ("archive.metadata.system_id", &self.system_id),
            ("archive.metadata.rule_id", &self.rule_id),
        ]
        .into_iter()
        .filter_map(|(name, value)| value.as_ref().map(|v| (name, v)))
        .collect()
    }
}

/// Where receipts and the submitted archive record are stored on the instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReceiptConfig {
    /// Data type for the archive's receipt
    pub confirmation_record: DocumentConfig,

    /// Data type for a copy of the submitted archive record
    pub archive_record: DocumentConfig,
}

impl ReceiptConfig {
    fn validate(&self) -> Result<(), String> {
        self.confirmation_record
            .validate("archive.receipt.confirmation_record")?;
        self.archive_record.validate("archive.receipt.archive_record")?;
        Ok(())
    }
}

/// Automatic submission settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoSendConfig {
    /// Task whose completion triggers the submission
    pub after_task_id: String,

    #[serde(default)]
    pub success_handling: Option<SuccessHandlingConfig>,

    #[serde(default)]
    pub error_handling: Option<ErrorHandlingConfig>,
}

impl AutoSendConfig {
    fn validate(&self) -> Result<(), String> {
        if self.after_task_id.trim().is_empty() {
            return Err("archive.auto_send.after_task_id cannot be empty".to_string());
        }
        if let Some(error_handling) = &self.error_handling {
            error_handling.validate()?;
        }
        Ok(())
    }
}

/// What to do with the process when a receipt arrives
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuccessHandlingConfig {
    #[serde(default)]
    pub move_to_next_task: bool,

    /// Process action to use when moving on
    #[serde(default)]
    pub action: Option<String>,

    #[serde(default)]
    pub mark_instance_complete: bool,
}

/// What to do when the archive reports an error
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorHandlingConfig {
    #[serde(default)]
    pub move_to_next_task: bool,

    /// Process action to use when moving on, e.g. `reject`
    #[serde(default)]
    pub action: Option<String>,

    #[serde(default)]
    pub send_email_notifications: bool,

    #[serde(default)]
    pub email_recipients: Vec<String>,
}

impl ErrorHandlingConfig {
    /// Checks notification recipients when e-mail is enabled
    pub fn validate(&self) -> Result<(), String> {
        if self.send_email_notifications {
            if self.email_recipients.is_empty() {
                return Err(
                    "archive.auto_send.error_handling.email_recipients cannot be empty when \
                     send_email_notifications is enabled"
                        .to_string(),
                );
            }
            for recipient in &self.email_recipients {
                let valid = recipient
                    .split_once('@')
                    .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
                if !valid {
                    return Err(format!(
                        "Invalid e-mail address '{recipient}' in \
                         archive.auto_send.error_handling.email_recipients"
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Operator notification texts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "default_email_subject")]
    pub email_subject: String,

    /// Body template; `{instance_id}` and `{error}` are replaced
    #[serde(default = "default_email_body")]
    pub email_body: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            email_subject: default_email_subject(),
            email_body: default_email_body(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Enable local file logging
    #[serde(default = "default_true")]
    pub local_enabled: bool,

    /// Local log file path
    #[serde(default = "default_local_path")]
    pub local_path: String,

    /// Log rotation strategy
    #[serde(default = "default_local_rotation")]
    pub local_rotation: String,
}

impl LoggingConfig {
    fn validate(&self) -> Result<(), String> {
        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&self.local_rotation.as_str()) {
            return Err(format!(
                "Invalid logging.local_rotation '{}'. Must be one of: {}",
                self.local_rotation,
                valid_rotations.join(", ")
            ));
        }
        Ok(())
    }

    /// Console-only logging, used before the configuration file is read
    pub fn console_only() -> Self {
        Self {
            local_enabled: false,
            local_path: String::new(),
            ..Self::default()
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            local_enabled: true,
            local_path: default_local_path(),
            local_rotation: default_local_rotation(),
        }
    }
}

fn validate_url(name: &str, value: &str) -> Result<(), String> {
    if value.is_empty() {
        return Err(format!("{name} cannot be empty"));
    }
    if !value.starts_with("http://") && !value.starts_with("https://") {
        return Err(format!("{name} must start with http:// or https://"));
    }
    url::Url::parse(value).map_err(|e| format!("{name} is not a valid URL: {e}"))?;
    Ok(())
}

fn validate_filename(name: &str, filename: &str) -> Result<(), String> {
    if filename.trim().is_empty() {
        return Err(format!("{name}.filename cannot be empty when set"));
    }
    if filename.contains(['/', '\\']) {
        return Err(format!("{name}.filename cannot contain path separators"));
    }
    Ok(())
}

pub(crate) fn with_trailing_slash(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{url}/")
    }
}

// Default value functions

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_metadata_path() -> String {
    "config/applicationmetadata.json".to_string()
}

fn default_process_path() -> String {
    "config/process/process.bpmn".to_string()
}

fn default_storage_endpoint() -> String {
    "https://platform.altinn.no/storage/api/v1/".to_string()
}

fn default_register_endpoint() -> String {
    "https://platform.altinn.no/register/api/v1/".to_string()
}

fn default_notifications_endpoint() -> String {
    "https://platform.altinn.no/notifications/api/v1/".to_string()
}

fn default_org_registry_url() -> String {
    "https://altinncdn.no/orgs/altinn-orgs.json".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_scopes() -> Vec<String> {
    vec![
        "altinn:serviceowner/instances.read".to_string(),
        "altinn:serviceowner/instances.write".to_string(),
    ]
}

fn default_token_refresh_margin_seconds() -> u64 {
    60
}

fn default_local_token_url() -> String {
    "http://localhost:5101/Home/GetTestOrgToken".to_string()
}

fn default_poll_interval_seconds() -> u64 {
    5
}

fn default_tick_interval_ms() -> u64 {
    1000
}

fn default_health_check_interval_seconds() -> u64 {
    600
}

fn default_email_subject() -> String {
    "Arkivering feilet".to_string()
}

fn default_email_body() -> String {
    "Arkivering av instans {instance_id} feilet: {error}".to_string()
}

fn default_local_path() -> String {
    "/var/log/archivelink".to_string()
}

fn default_local_rotation() -> String {
    "daily".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{secret_string, DataBinding};
    use crate::test_support::sample_config;

    #[test]
    fn test_sample_config_is_valid() {
        assert!(sample_config().validate().is_ok());
    }

    #[test]
    fn test_app_base_url_trailing_slash() {
        let config = sample_config();
        assert_eq!(
            config.application.app_base_url(),
            "https://ttd.apps.altinn.no/ttd/my-app/"
        );
        assert_eq!(config.application.app_id(), "ttd/my-app");
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = sample_config();
        config.application.log_level = "verbose".to_string();
        assert!(config.validate().unwrap_err().contains("log_level"));
    }

    #[test]
    fn test_recipient_requires_value_or_binding() {
        let mut config = sample_config();
        config.archive.recipient.name = BindableValue::default();
        assert!(config
            .validate()
            .unwrap_err()
            .contains("archive.recipient.name"));
    }

    #[test]
    fn test_recipient_binding_must_be_well_formed() {
        let mut config = sample_config();
        config.archive.recipient.identifier =
            BindableValue::bound(DataBinding::new("model", "recipient..id"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_production_requires_client_credentials() {
        let mut config = sample_config();
        config.environment = Environment::Production;
        assert!(config.validate().unwrap_err().contains("token_url"));

        config.platform.auth.token_url = Some("https://maskinporten.no/token".to_string());
        config.platform.auth.client_id = Some("client".to_string());
        config.platform.auth.client_secret = Some(secret_string("secret".to_string()));
        assert!(config
            .validate()
            .unwrap_err()
            .contains("platform_access_token"));

        config.platform.platform_access_token = Some(secret_string("pat".to_string()));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_email_recipients_validated() {
        let mut config = sample_config();
        config.archive.auto_send = Some(AutoSendConfig {
            after_task_id: "Task_2".to_string(),
            success_handling: None,
            error_handling: Some(ErrorHandlingConfig {
                send_email_notifications: true,
                email_recipients: vec![],
                ..Default::default()
            }),
        });
        assert!(config.validate().is_err());

        if let Some(a) = config.archive.auto_send.as_mut() {
            a.error_handling = Some(ErrorHandlingConfig {
                send_email_notifications: true,
                email_recipients: vec!["not-an-address".to_string()],
                ..Default::default()
            });
        }
        assert!(config.validate().is_err());

        if let Some(a) = config.archive.auto_send.as_mut() {
            a.error_handling = Some(ErrorHandlingConfig {
                send_email_notifications: true,
                email_recipients: vec!["arkiv@kommune.no".to_string()],
                ..Default::default()
            });
        }
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_auto_send_enabled_for_task() {
        let mut config = sample_config();
        assert!(config.archive.is_auto_send_enabled_for("Task_2"));
        assert!(!config.archive.is_auto_send_enabled_for("Task_1"));

        config.archive.auto_send = None;
        assert!(!config.archive.is_auto_send_enabled_for("Task_2"));
    }

    #[test]
    fn test_filename_override_rejects_paths() {
        let mut config = sample_config();
        config.archive.documents.primary.filename = Some("../skjema.xml".to_string());
        assert!(config.validate().is_err());
    }
}
