//! External system integrations
//!
//! - [`platform`] - Hosting platform APIs (instances, register, org registry)
//! - [`transport`] - Message transport towards the archive
//! - [`notify`] - Operator e-mail notifications
//! - [`app`] - Application definition files read at startup
//!
//! Core logic depends only on the traits these modules export, so every
//! integration can be swapped for an in-memory fake in tests.

pub mod app;
pub mod notify;
pub mod platform;
pub mod transport;
