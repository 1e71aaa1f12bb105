//! Domain error types
//!
//! This module defines the error hierarchy for archivelink. Errors are grouped
//! by the boundary they originate from so callers can decide what is fatal:
//!
//! - [`ArchiveError::Configuration`] aborts startup
//! - [`ArchiveError::Domain`] fails a single send attempt
//! - [`PlatformError`] and [`TransportError`] carry the remote status and are
//!   never retried inside this crate
//!
//! Third-party error types are converted to strings at the adapter boundary.

use thiserror::Error;

/// Main archivelink error type
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// Invalid or incomplete configuration, raised during startup validation
    /// or when a send is attempted for a task that is not configured
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Instance data does not satisfy the archive flow (unresolvable binding,
    /// missing data element, malformed form data)
    #[error("Domain error: {0}")]
    Domain(String),

    /// Hosting platform API errors
    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),

    /// Message transport errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Operator notification errors
    #[error("Notification error: {0}")]
    Notification(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// The operation was cancelled before it was dispatched
    #[error("Operation cancelled: {0}")]
    Cancelled(String),
}

/// Hosting platform API errors
///
/// Non-2xx responses are split by status class: 4xx means the request or the
/// configuration is wrong, 5xx may be transient.
#[derive(Debug, Error)]
pub enum PlatformError {
    /// Failed to reach the platform
    #[error("Failed to connect to platform: {0}")]
    ConnectionFailed(String),

    /// Access token could not be acquired
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Response body could not be understood
    #[error("Invalid response from platform: {0}")]
    InvalidResponse(String),

    /// Server error (5xx)
    #[error("Server error: {status} - {body}")]
    ServerError { status: u16, body: String },

    /// Client error (4xx)
    #[error("Client error: {status} - {body}")]
    ClientError { status: u16, body: String },
}

impl PlatformError {
    /// Builds the typed error for a non-success status code
    pub fn from_status(status: u16, body: String) -> Self {
        if status >= 500 {
            PlatformError::ServerError { status, body }
        } else {
            PlatformError::ClientError { status, body }
        }
    }

    /// HTTP status carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            PlatformError::ServerError { status, .. } | PlatformError::ClientError { status, .. } => {
                Some(*status)
            }
            _ => None,
        }
    }

    /// Whether a caller may reasonably try again later
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            PlatformError::ServerError { .. } | PlatformError::ConnectionFailed(_)
        )
    }
}

/// Message transport errors
#[derive(Debug, Error)]
pub enum TransportError {
    /// No connection could be established
    #[error("Failed to connect to transport: {0}")]
    ConnectionFailed(String),

    /// The connection was closed
    #[error("Transport connection is closed")]
    Closed,

    /// Sending a message failed
    #[error("Send failed: {status} - {body}")]
    SendFailed { status: u16, body: String },

    /// Inbound message is malformed
    #[error("Invalid message: {0}")]
    InvalidMessage(String),

    /// Payload container could not be built or read
    #[error("Payload container error: {0}")]
    Container(String),

    /// Acknowledging an inbound message failed
    #[error("Acknowledgement failed: {0}")]
    AckFailed(String),
}

impl From<std::io::Error> for ArchiveError {
    fn from(err: std::io::Error) -> Self {
        ArchiveError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ArchiveError {
    fn from(err: serde_json::Error) -> Self {
        ArchiveError::Serialization(err.to_string())
    }
}

impl From<quick_xml::de::DeError> for ArchiveError {
    fn from(err: quick_xml::de::DeError) -> Self {
        ArchiveError::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for ArchiveError {
    fn from(err: toml::de::Error) -> Self {
        ArchiveError::Configuration(format!("TOML parse error: {err}"))
    }
}
