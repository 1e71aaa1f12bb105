//! Logging and observability
//!
//! Structured logging through `tracing`, with JSON file output and a set of
//! macros that keep field names consistent across the send and receive paths.
//!
//! # Example
//!
//! ```no_run
//! use archivelink::logging::init_logging;
//! use archivelink::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! tracing::info!(instance_id = "501337/a4f1c8a4-2d6b-4e0b-8d4b-2b1f2a6f0c11", "Archive record sent");
//! ```

pub mod structured;

pub use structured::{init_logging, LoggingGuard};

/// Log an outbound archive message
///
/// ```no_run
/// use archivelink::log_message_sent;
///
/// let message_id = uuid::Uuid::new_v4();
/// log_message_sent!(message_id, "no.ks.fiks.arkiv.v1.arkivering.arkivmelding.opprett", "501337/a4f1c8a4-2d6b-4e0b-8d4b-2b1f2a6f0c11");
/// ```
#[macro_export]
macro_rules! log_message_sent {
    ($message_id:expr, $message_type:expr, $instance_id:expr) => {
        tracing::info!(
            message_id = %$message_id,
            message_type = %$message_type,
            instance_id = %$instance_id,
            "Archive message sent"
        );
    };
}

/// Log an inbound archive message
#[macro_export]
macro_rules! log_message_received {
    ($message_id:expr, $message_type:expr, $in_reply_to:expr) => {
        tracing::info!(
            message_id = %$message_id,
            message_type = %$message_type,
            in_reply_to = ?$in_reply_to,
            "Received archive message"
        );
    };
}

/// Log an error with context
///
/// ```no_run
/// use archivelink::log_error_with_context;
/// use archivelink::domain::ArchiveError;
///
/// let error = ArchiveError::Configuration("recipient missing".to_string());
/// log_error_with_context!(&error, "Failed to validate configuration");
/// ```
#[macro_export]
macro_rules! log_error_with_context {
    ($error:expr, $context:expr) => {
        tracing::error!(
            error = %$error,
            context = $context,
            "Error occurred"
        );
    };
}
