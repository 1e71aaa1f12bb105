//! Literal-or-data-bound settings
//!
//! Several archive settings can either be written directly in the
//! configuration file or read from the instance's form data at send time:
//!
//! ```toml
//! [archive.recipient]
//! account = { value = "a1b2c3d4-0000-4000-8000-000000000001" }
//! name = { binding = { data_type = "model", field = "recipient.name" } }
//! ```
//!
//! When both are present the literal wins.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

/// Reference to a field inside a form data element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataBinding {
    /// Data type id holding the form data
    pub data_type: String,

    /// Dotted field path, with optional indexes: `applicant.addresses[0].city`
    pub field: String,
}

impl DataBinding {
    pub fn new(data_type: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            data_type: data_type.into(),
            field: field.into(),
        }
    }

    /// Checks that the binding names a data type and a well-formed path
    pub fn validate(&self) -> Result<(), String> {
        if self.data_type.trim().is_empty() {
            return Err("binding data_type cannot be empty".to_string());
        }
        if !field_path_regex().is_match(&self.field) {
            return Err(format!(
                "binding field '{}' on data type '{}' is not a valid field path",
                self.field, self.data_type
            ));
        }
        Ok(())
    }
}

fn field_path_regex() -> &'static Regex {
    static FIELD_PATH: OnceLock<Regex> = OnceLock::new();
    FIELD_PATH.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_\-]*(\[\d+\])*(\.[A-Za-z_][A-Za-z0-9_\-]*(\[\d+\])*)*$")
            .unwrap_or_else(|_| unreachable!("field path pattern is a valid regex"))
    })
}

/// A setting that is either a literal value or bound to form data
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindableValue<T> {
    #[serde(default = "Option::default", skip_serializing_if = "Option::is_none")]
    pub value: Option<T>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binding: Option<DataBinding>,
}

impl<T> Default for BindableValue<T> {
    fn default() -> Self {
        Self {
            value: None,
            binding: None,
        }
    }
}

impl<T> BindableValue<T> {
    pub fn literal(value: T) -> Self {
        Self {
            value: Some(value),
            binding: None,
        }
    }

    pub fn bound(binding: DataBinding) -> Self {
        Self {
            value: None,
            binding: Some(binding),
        }
    }

    /// Whether the setting can produce a value at all
    pub fn is_configured(&self) -> bool {
        self.value.is_some() || self.binding.is_some()
    }

    /// Validates the binding, if any, and that the setting is not empty
    pub fn validate(&self, name: &str) -> Result<(), String> {
        if !self.is_configured() {
            return Err(format!("{name} must have either a value or a binding"));
        }
        if let Some(binding) = &self.binding {
            binding.validate().map_err(|e| format!("{name}: {e}"))?;
        }
        Ok(())
    }
}
