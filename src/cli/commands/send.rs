//! Send command implementation
//!
//! Triggers an archive submission for one instance as the service owner,
//! the same way a completed process task would.

use super::{exit_code_for, EXIT_CONFIG, EXIT_OK};
use crate::config::load_config;
use crate::core::runtime::ArchiveRuntime;
use crate::domain::{InstanceIdentifier, Principal};
use clap::Args;
use tokio::sync::watch;

/// Arguments for the send command
#[derive(Args, Debug)]
pub struct SendArgs {
    /// Instance to submit, as `{partyId}/{instanceGuid}`
    #[arg(long)]
    pub instance: InstanceIdentifier,

    /// Task whose completion triggers the submission
    #[arg(long)]
    pub task: String,

    /// Organisation number of the service owner
    #[arg(long, env = "ARCHIVELINK_ORG_NUMBER")]
    pub org_number: String,
}

impl SendArgs {
    /// Execute the send command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!(instance_id = %self.instance, task_id = %self.task, "Starting send command");

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
                eprintln!("Failed to initialize: {e}");
                return Ok(exit_code_for(&e));
            }
        };

        let principal = Principal::ServiceOwner {
            org: runtime.config().application.org.clone(),
            org_number: self.org_number.clone(),
        };

        let outcome = async {
            let instance = runtime.instances().get_instance(&self.instance).await?;
            runtime
                .service_task()
                .execute(&self.task, &instance, &principal, &shutdown_signal)
                .await
        }
        .await;
        runtime.shutdown().await;

        match outcome {
            Ok(Some(sent)) => {
                println!("✅ Archive message sent");
                println!("  Message ID: {}", sent.message_id);
                println!("  Recipient: {}", sent.recipient_account_id);
                Ok(EXIT_OK)
            }
            Ok(None) => {
                println!(
                    "⚠️  Auto-send is not configured for task {}; nothing was sent",
                    self.task
                );
                Ok(EXIT_CONFIG)
            }
            Err(e) => {
                tracing::error!(error = %e, instance_id = %self.instance, "Send failed");
                eprintln!("Send failed: {e}");
                Ok(exit_code_for(&e))
            }
        }
    }
}
