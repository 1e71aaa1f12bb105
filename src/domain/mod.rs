//! Domain models and types for archivelink.
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`InstanceIdentifier`], [`AppId`])
//! - **Platform models** ([`Instance`], [`DataElement`], [`ApplicationMetadata`])
//! - **Message models** ([`MessageRequest`], [`MessagePayload`], [`ArchiveReceipt`])
//! - **Error types** ([`ArchiveError`], [`PlatformError`], [`TransportError`])
//! - **Result type alias** ([`Result`])
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, ArchiveError>`]:
//!
//! ```rust
//! use archivelink::domain::{ArchiveError, InstanceIdentifier, Result};
//!
//! fn parse(id: &str) -> Result<InstanceIdentifier> {
//!     id.parse().map_err(ArchiveError::Domain)
//! }
//! ```

pub mod errors;
pub mod ids;
pub mod instance;
pub mod message;
pub mod principal;
pub mod receipt;
pub mod result;

pub use errors::{ArchiveError, PlatformError, TransportError};
pub use ids::{AppId, InstanceIdentifier};
pub use instance::{
    ApplicationMetadata, DataElement, DataType, Instance, InstanceOwner, ProcessTask,
};
pub use message::{
    message_lifetime, message_types, DocumentRole, MessagePayload, MessageRequest, Recipient,
    SentMessage, ARCHIVE_RECORD_FILENAME,
};
pub use principal::Principal;
pub use receipt::{ArchiveErrorReport, ArchiveReceipt};
pub use result::Result;
