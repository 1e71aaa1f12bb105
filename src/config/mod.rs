//! Configuration management for archivelink.
//!
//! archivelink reads a single TOML file at startup with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `ARCHIVELINK_*` environment overrides
//! - Default values for optional settings
//! - Literal-or-bound settings resolved against form data ([`BindableValue`])
//!
//! # Configuration Structure
//!
//! - [`ApplicationConfig`] - Application identity and metadata paths
//! - [`PlatformConfig`] - Platform endpoints and credentials
//! - [`TransportConfig`] - Transport account and receiver timing
//! - [`ArchiveConfig`] - Recipient, documents, metadata, receipt and auto-send
//! - [`NotificationConfig`] - Operator e-mail texts
//! - [`LoggingConfig`] - Logging configuration
//!
//! # Example Configuration
//!
//! ```toml
//! environment = "production"
//!
//! [application]
//! org = "ttd"
//! app = "building-permit"
//! app_base_url = "https://ttd.apps.altinn.no/ttd/building-permit/"
//!
//! [transport]
//! base_url = "https://api.fiks.ks.no"
//! account_id = "3f0c6e9a-8b1d-4c55-9d2e-7a1b2c3d4e5f"
//! integration_id = "9b7a2c10-1e2f-4a3b-8c4d-5e6f7a8b9c0d"
//! integration_password = "${ARCHIVELINK_INTEGRATION_PASSWORD}"
//!
//! [archive.recipient]
//! account = { value = "0e1d2c3b-4a59-4867-9a8b-7c6d5e4f3a2b" }
//! identifier = { value = "KOMMUNE-ARKIV" }
//! name = { binding = { data_type = "model", field = "municipality.name" } }
//!
//! [archive.documents.primary]
//! data_type = "model"
//!
//! [archive.receipt]
//! confirmation_record = { data_type = "archive-receipt" }
//! archive_record = { data_type = "archive-record" }
//!
//! [archive.auto_send]
//! after_task_id = "Task_2"
//! success_handling = { move_to_next_task = true }
//! ```

pub mod binding;
pub mod loader;
pub mod schema;
pub mod secret;

pub use binding::{BindableValue, DataBinding};
pub use loader::{load_config, parse_config};
pub use schema::{
    ApplicationConfig, ArchiveConfig, ArchivelinkConfig, AutoSendConfig, DocumentConfig,
    DocumentsConfig, Environment, ErrorHandlingConfig, LoggingConfig, MetadataConfig,
    NotificationConfig, PlatformAuthConfig, PlatformConfig, ReceiptConfig, RecipientConfig,
    SuccessHandlingConfig, TransportConfig,
};
pub use secret::{secret_string, SecretString, SecretValue};
