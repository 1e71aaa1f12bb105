//! Run command implementation
//!
//! Starts the background receiver and keeps it running until a shutdown
//! signal arrives.

use super::{exit_code_for, EXIT_CONFIG, EXIT_OK};
use crate::config::load_config;
use crate::core::runtime::ArchiveRuntime;
use clap::Args;
use tokio::sync::watch;

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {}

impl RunArgs {
    /// Execute the run command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Starting archive receiver");

        let config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("Configuration error: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        let runtime = match ArchiveRuntime::build(config) {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(error = %e, "Failed to initialize archive integration");
                eprintln!("Failed to initialize: {e}");
                return Ok(exit_code_for(&e));
            }
        };

        println!(
            "📥 Listening for archive responses for {} (Ctrl+C to stop)",
            runtime.config().application.app_id()
        );

        if let Err(e) = runtime.receiver().run(shutdown_signal).await {
            tracing::error!(error = %e, "Archive receiver failed");
            eprintln!("Receiver failed: {e}");
            runtime.shutdown().await;
            return Ok(exit_code_for(&e));
        }

        println!("✅ Receiver stopped");
        Ok(EXIT_OK)
    }
}
