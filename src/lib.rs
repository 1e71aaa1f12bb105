// Archivelink - Form submission archiving over a national archive message service
// Copyright (c) 2025 Archivelink Contributors
// Licensed under the MIT License

//! # Archivelink - Archive integration for form workflows
//!
//! Archivelink submits completed form instances to a municipal or state
//! archive. When a configured process task completes, it builds a standard
//! archive record (case file, journal entry, correspondence parties and
//! documents), stores a copy on the instance, and sends the package over an
//! asynchronous message transport. Receipts and error reports arrive later on
//! a background receiver and move the instance's process along.
//!
//! ## Architecture
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Resolution, payload generation, message handling, receiver
//! - [`adapters`] - Platform APIs, message transport, notifications
//! - [`domain`] - Core domain types and models
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging and observability
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use archivelink::config::load_config;
//! use archivelink::core::runtime::ArchiveRuntime;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("archivelink.toml")?;
//! let runtime = ArchiveRuntime::build(config)?;
//!
//! let (_shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//! runtime.receiver().run(shutdown_rx).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Triggering a Submission
//!
//! ```rust,no_run
//! use archivelink::core::runtime::ArchiveRuntime;
//! use archivelink::domain::{InstanceIdentifier, Principal};
//!
//! # async fn example(runtime: &ArchiveRuntime) -> Result<(), Box<dyn std::error::Error>> {
//! let id: InstanceIdentifier = "501337/a4f1c8a4-2d6b-4e0b-8d4b-2b1f2a6f0c11".parse()?;
//! let instance = runtime.instances().get_instance(&id).await?;
//! let principal = Principal::ServiceOwner {
//!     org: "ttd".to_string(),
//!     org_number: "991825827".to_string(),
//! };
//!
//! let (_tx, shutdown) = tokio::sync::watch::channel(false);
//! let sent = runtime
//!     .service_task()
//!     .execute("Task_2", &instance, &principal, &shutdown)
//!     .await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! All fallible operations return [`domain::Result`], an alias over
//! [`domain::ArchiveError`]. Platform and transport failures keep their HTTP
//! status in [`domain::PlatformError`] and [`domain::TransportError`].

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;

#[cfg(test)]
pub(crate) mod test_support;
