//! Configuration loader with TOML parsing and environment variable overrides

use super::schema::{ArchivelinkConfig, Environment};
use super::secret::secret_string;
use crate::domain::errors::ArchiveError;
use crate::domain::result::Result;
use regex::Regex;
use std::fs;
use std::path::Path;

/// Loads configuration from a TOML file
///
/// This function:
/// 1. Reads the TOML file
/// 2. Performs environment variable substitution (`${VAR}` syntax)
/// 3. Parses the TOML into [`ArchivelinkConfig`]
/// 4. Applies environment variable overrides (`ARCHIVELINK_*` prefix)
/// 5. Validates the configuration
///
/// # Errors
///
/// Returns [`ArchiveError::Configuration`] if the file cannot be read, a
/// referenced environment variable is missing, parsing fails or validation
/// fails.
///
/// # Examples
///
/// ```no_run
/// use archivelink::config::load_config;
///
/// let config = load_config("archivelink.toml").expect("Failed to load config");
/// println!("Archiving for {}", config.application.app_id());
/// ```
pub fn load_config(path: impl AsRef<Path>) -> Result<ArchivelinkConfig> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(ArchiveError::Configuration(format!(
            "Configuration file not found: {}",
            path.display()
        )));
    }

    let contents = fs::read_to_string(path).map_err(|e| {
        ArchiveError::Configuration(format!(
            "Failed to read configuration file {}: {}",
            path.display(),
            e
        ))
    })?;

    parse_config(&contents)
}

/// Parses and validates configuration from TOML text
pub fn parse_config(contents: &str) -> Result<ArchivelinkConfig> {
    let contents = substitute_env_vars(contents)?;

    let mut config: ArchivelinkConfig = toml::from_str(&contents)
        .map_err(|e| ArchiveError::Configuration(format!("Failed to parse TOML: {e}")))?;

    apply_env_overrides(&mut config)?;

    config.validate().map_err(|e| {
        ArchiveError::Configuration(format!("Configuration validation failed: {e}"))
    })?;

    Ok(config)
}

/// Substitutes environment variables in the format `${VAR_NAME}`
///
/// Lines starting with `#` are left untouched so commented-out settings can
/// reference variables that are not set.
fn substitute_env_vars(contents: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")
        .map_err(|e| ArchiveError::Configuration(format!("Invalid substitution pattern: {e}")))?;

    let mut result = String::with_capacity(contents.len());
    for (i, line) in contents.lines().enumerate() {
        if i > 0 {
            result.push('\n');
        }

        if line.trim_start().starts_with('#') {
            result.push_str(line);
            continue;
        }

        let mut missing = None;
        let substituted = re.replace_all(line, |caps: &regex::Captures| {
            let var_name = &caps[1];
            match std::env::var(var_name) {
                Ok(value) => value,
                Err(_) => {
                    missing.get_or_insert_with(|| var_name.to_string());
                    String::new()
                }
            }
        });

        if let Some(var_name) = missing {
            return Err(ArchiveError::Configuration(format!(
                "Environment variable '{var_name}' referenced on line {} is not set",
                i + 1
            )));
        }
        result.push_str(&substituted);
    }

    Ok(result)
}

/// Applies `ARCHIVELINK_*` environment variable overrides
fn apply_env_overrides(config: &mut ArchivelinkConfig) -> Result<()> {
    if let Ok(val) = std::env::var("ARCHIVELINK_ENVIRONMENT") {
        config.environment = match val.to_lowercase().as_str() {
            "development" => Environment::Development,
            "staging" => Environment::Staging,
            "production" => Environment::Production,
            other => {
                return Err(ArchiveError::Configuration(format!(
                    "Invalid ARCHIVELINK_ENVIRONMENT '{other}'. Must be one of: development, staging, production"
                )))
            }
        };
    }

    // Application overrides
    if let Ok(val) = std::env::var("ARCHIVELINK_APPLICATION_LOG_LEVEL") {
        config.application.log_level = val;
    }
    if let Ok(val) = std::env::var("ARCHIVELINK_APPLICATION_APP_BASE_URL") {
        config.application.app_base_url = val;
    }

    // Platform overrides
    if let Ok(val) = std::env::var("ARCHIVELINK_PLATFORM_STORAGE_ENDPOINT") {
        config.platform.storage_endpoint = val;
    }
    if let Ok(val) = std::env::var("ARCHIVELINK_PLATFORM_SUBSCRIPTION_KEY") {
        config.platform.subscription_key = Some(secret_string(val));
    }
    if let Ok(val) = std::env::var("ARCHIVELINK_PLATFORM_ACCESS_TOKEN") {
        config.platform.platform_access_token = Some(secret_string(val));
    }
    if let Ok(val) = std::env::var("ARCHIVELINK_PLATFORM_AUTH_CLIENT_ID") {
        config.platform.auth.client_id = Some(val);
    }
    if let Ok(val) = std::env::var("ARCHIVELINK_PLATFORM_AUTH_CLIENT_SECRET") {
        config.platform.auth.client_secret = Some(secret_string(val));
    }

    // Transport overrides
    if let Ok(val) = std::env::var("ARCHIVELINK_TRANSPORT_BASE_URL") {
        config.transport.base_url = val;
    }
    if let Ok(val) = std::env::var("ARCHIVELINK_TRANSPORT_ACCOUNT_ID") {
        config.transport.account_id = val.parse().map_err(|_| {
            ArchiveError::Configuration(format!(
                "ARCHIVELINK_TRANSPORT_ACCOUNT_ID '{val}' is not a valid UUID"
            ))
        })?;
    }
    if let Ok(val) = std::env::var("ARCHIVELINK_TRANSPORT_INTEGRATION_PASSWORD") {
        config.transport.integration_password = secret_string(val);
    }
    if let Ok(val) = std::env::var("ARCHIVELINK_TRANSPORT_HEALTH_CHECK_INTERVAL_SECONDS") {
        if let Ok(interval) = val.parse() {
            config.transport.health_check_interval_seconds = interval;
        }
    }

    // Logging overrides
    if let Ok(val) = std::env::var("ARCHIVELINK_LOGGING_LOCAL_ENABLED") {
        config.logging.local_enabled = val.parse().unwrap_or(true);
    }
    if let Ok(val) = std::env::var("ARCHIVELINK_LOGGING_LOCAL_PATH") {
        config.logging.local_path = val;
    }

    Ok(())
}
