//! Init command implementation
//!
//! This module implements the `init` command for generating a sample
//! configuration file.

use super::{EXIT_CONFIG, EXIT_FATAL, EXIT_OK};
use clap::Args;
use std::fs;
use std::path::Path;

/// Arguments for the init command
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Path where to create the configuration file
    #[arg(short, long, default_value = "archivelink.toml")]
    pub output: String,

    /// Include optional sections with comments
    #[arg(long)]
    pub with_examples: bool,

    /// Overwrite existing file
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    /// Execute the init command
    pub async fn execute(&self) -> anyhow::Result<i32> {
        tracing::info!(output = %self.output, "Initializing configuration file");

        println!("📝 Initializing archivelink configuration");
        println!();

        if Path::new(&self.output).exists() && !self.force {
            println!("❌ Configuration file already exists: {}", self.output);
            println!("   Use --force to overwrite");
            return Ok(EXIT_CONFIG);
        }

        let config_content = Self::generate_config(self.with_examples);

        match fs::write(&self.output, config_content) {
            Ok(_) => {
                println!("✅ Configuration file created: {}", self.output);
                println!();
                println!("Next steps:");
                println!("  1. Edit {} with your application and archive settings", self.output);
                println!("  2. Create a .env file with your credentials:");
                println!("     - Set ARCHIVELINK_TRANSPORT_INTEGRATION_PASSWORD");
                println!("     - Set ARCHIVELINK_PLATFORM_AUTH_CLIENT_SECRET (staging and production)");
                println!("  3. Validate configuration: archivelink validate-config");
                println!("  4. Start the receiver: archivelink run");
                println!();
                Ok(EXIT_OK)
            }
            Err(e) => {
                println!("❌ Failed to write configuration file");
                println!("   Error: {e}");
                Ok(EXIT_FATAL)
            }
        }
    }

    /// Generate the configuration, without comments unless `with_examples`
    fn generate_config(with_examples: bool) -> String {
        if with_examples {
            return CONFIG_TEMPLATE.to_string();
        }

        let mut lines: Vec<&str> = Vec::new();
        for line in CONFIG_TEMPLATE.lines() {
            if line.trim_start().starts_with('#') {
                continue;
            }
            if line.is_empty() && lines.last().map_or(true, |l| l.is_empty()) {
                continue;
            }
            lines.push(line);
        }
        let mut config = lines.join("\n");
        config.push('\n');
        config
    }
}

/// Every section, with optional ones commented out
const CONFIG_TEMPLATE: &str = r#"# Archivelink Configuration File
# Submits completed form instances to an archive over the message transport

# development | staging | production
environment = "development"

[application]
org = "ttd"
app = "my-app"
# Public URL of the app; instance URLs are built from it and used as
# correlation ids on archive messages
app_base_url = "https://ttd.apps.altinn.no/ttd/my-app/"
log_level = "info"
metadata_path = "config/applicationmetadata.json"
process_path = "config/process/process.bpmn"

[platform]
storage_endpoint = "https://platform.altinn.no/storage/api/v1/"
register_endpoint = "https://platform.altinn.no/register/api/v1/"
notifications_endpoint = "https://platform.altinn.no/notifications/api/v1/"
org_registry_url = "https://altinncdn.no/orgs/altinn-orgs.json"
timeout_seconds = 30
# subscription_key = "${ARCHIVELINK_PLATFORM_SUBSCRIPTION_KEY}"
# platform_access_token = "${ARCHIVELINK_PLATFORM_ACCESS_TOKEN}"

# Required outside development
# [platform.auth]
# token_url = "https://maskinporten.no/token"
# client_id = "your-client-id"
# client_secret = "${ARCHIVELINK_PLATFORM_AUTH_CLIENT_SECRET}"

[transport]
base_url = "https://api.fiks.ks.no"
account_id = "00000000-0000-0000-0000-000000000000"
integration_id = "00000000-0000-0000-0000-000000000000"
integration_password = "${ARCHIVELINK_TRANSPORT_INTEGRATION_PASSWORD}"
poll_interval_seconds = 5
tick_interval_ms = 1000
health_check_interval_seconds = 600

# Each value is either a literal or a binding into form data:
#   name = { value = "Kommunen" }
#   name = { binding = { data_type = "model", field = "recipient.name" } }
[archive.recipient]
account = { value = "00000000-0000-0000-0000-000000000000" }
identifier = { value = "KOMMUNE" }
name = { binding = { data_type = "model", field = "recipient.name" } }
# org_number = { value = "944000111" }

[archive.documents]
primary = { data_type = "model", filename = "skjema.json" }
attachments = [{ data_type = "attachment" }]

# Overrides for the archive record; all optional
# [archive.metadata]
# case_file_id = { binding = { data_type = "model", field = "caseFileId" } }
# case_file_title = { value = "Byggesøknad" }
# journal_entry_title = { binding = { data_type = "model", field = "title" } }
# system_id = { value = "Skjemasystem" }
# rule_id = { value = "regel-1" }

[archive.receipt]
confirmation_record = { data_type = "archive-receipt" }
archive_record = { data_type = "archive-record" }

[archive.auto_send]
after_task_id = "Task_2"
success_handling = { move_to_next_task = true, mark_instance_complete = true }
error_handling = { move_to_next_task = true, action = "reject", send_email_notifications = true, email_recipients = ["arkiv@example.no"] }

[notifications]
email_subject = "Arkivering feilet"
email_body = "Arkivering av instans {instance_id} feilet: {error}"

[logging]
local_enabled = true
local_path = "/var/log/archivelink"
local_rotation = "daily"
"#;
