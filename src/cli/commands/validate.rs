//! Validate config command implementation
//!
//! Loads the configuration file and cross-checks the archive settings
//! against the application's metadata and process definition.

use super::{EXIT_CONFIG, EXIT_OK};
use crate::adapters::app::{load_application_metadata, load_process_tasks};
use crate::config::{load_config, ArchivelinkConfig};
use crate::core::handler::validation::validate_archive_settings;
use crate::domain::Result;
use clap::Args;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Only check the configuration file, not the application definition
    #[arg(long)]
    pub skip_app: bool,
}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        let config = match load_config(config_path) {
            Ok(c) => {
                println!("✅ Configuration file loaded and valid");
                c
            }
            Err(e) => {
                println!("❌ Configuration is invalid");
                println!("   Error: {e}");
                return Ok(EXIT_CONFIG);
            }
        };

        if !self.skip_app {
            if let Err(e) = check_application(&config) {
                println!("❌ Configuration does not match the application definition");
                println!("   Error: {e}");
                return Ok(EXIT_CONFIG);
            }
            println!("✅ Archive settings match the application definition");
        }

        println!();
        println!("Configuration Summary:");
        println!("  Application: {}", config.application.app_id());
        println!("  Environment: {:?}", config.environment);
        println!("  Log Level: {}", config.application.log_level);
        println!("  Transport: {}", config.transport.base_url);
        println!("  Account: {}", config.transport.account_id);
        println!(
            "  Documents: {} + {} attachment type(s)",
            config.archive.documents.primary.data_type,
            config.archive.documents.attachments.len()
        );
        match &config.archive.auto_send {
            Some(auto_send) => println!("  Auto-send after: {}", auto_send.after_task_id),
            None => println!("  Auto-send: disabled"),
        }
        println!();
        Ok(EXIT_OK)
    }
}

fn check_application(config: &ArchivelinkConfig) -> Result<()> {
    let metadata = load_application_metadata(&config.application.metadata_path)?;
    let tasks = load_process_tasks(&config.application.process_path)?;
    validate_archive_settings(&config.archive, &metadata.data_types, &tasks)
}
