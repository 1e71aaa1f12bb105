//! Core archive logic
//!
//! # Modules
//!
//! - [`resolver`] - Recipient, metadata and correspondence party resolution
//! - [`payload`] - Archive record and document payload generation
//! - [`handler`] - Outbound request construction and inbound response handling
//! - [`service_task`] - Process task trigger that stores and sends a submission
//! - [`receiver`] - Long-running listener for archive responses
//! - [`runtime`] - Wiring of the above from configuration
//!
//! # Submission Workflow
//!
//! 1. **Trigger**: a process task completes and [`service_task`] is invoked
//! 2. **Resolve**: recipient and metadata are read from config or form data
//! 3. **Generate**: the archive record and documents become ordered payloads
//! 4. **Persist**: a copy of the archive record is stored on the instance
//! 5. **Send**: the request goes out over the message transport
//!
//! Responses arrive later on the [`receiver`], are correlated back to the
//! instance by its URL, and drive the process forward.

pub mod handler;
pub mod payload;
pub mod receiver;
pub mod resolver;
pub mod runtime;
pub mod service_task;
