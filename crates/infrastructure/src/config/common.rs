//! Shared error type and validation helpers for the config modules.

use domain::firewall::error::FirewallError;

// ── Config errors ──────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error reading config: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parse error: {0}")]
    Yaml(String),

    #[error("validation error: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("failed to initialise logging: {0}")]
    Logging(String),

    #[error("invalid rule at {field}: '{value}': {source}")]
    InvalidRule {
        field: String,
        value: String,
        #[source]
        source: FirewallError,
    },
}

impl From<serde_yaml_ng::Error> for ConfigError {
    fn from(e: serde_yaml_ng::Error) -> Self {
        Self::Yaml(e.to_string())
    }
}

/// Enforce a maximum count on a config collection.
pub(super) fn check_limit(field: &str, count: usize, max: usize) -> Result<(), ConfigError> {
    if count > max {
        return Err(ConfigError::Validation {
            field: field.to_string(),
            message: format!("count {count} exceeds maximum {max}"),
        });
    }
    Ok(())
}

/// Reject zero for sizes and capacities.
pub(super) fn check_positive(field: &str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Validation {
            field: field.to_string(),
            message: "must be greater than 0".to_string(),
        });
    }
    Ok(())
}
