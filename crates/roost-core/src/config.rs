//! Configuration system for Roost.
//!
//! Application configuration (where the store lives, runtime limits) is
//! layered with figment: defaults, then the user config file, then
//! `ROOST_`-prefixed environment variables. The operator's fleet settings
//! live in the store, not here — see [`crate::store`].

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Error;

/// Main configuration struct for Roost.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,
    /// Runtime limits
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Override for the store directory (defaults to the platform data dir)
    pub data_dir: Option<PathBuf>,
    /// Color mode: auto, always, never
    pub color: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: None,
            color: "auto".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum concurrently live sessions
    pub max_sessions: usize,
    /// Capacity of the event fan-out channel
    pub event_buffer: usize,
    /// Capacity of each session's command channel
    pub command_buffer: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_sessions: 64,
            event_buffer: 256,
            command_buffer: 32,
        }
    }
}

/// Validation result with multiple issues.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    /// List of validation issues
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Create a new empty validation result.
    pub fn new() -> Self {
        Self { issues: Vec::new() }
    }

    /// Check if validation passed (no errors).
    pub fn is_ok(&self) -> bool {
        !self.issues.iter().any(|i| i.severity == IssueSeverity::Error)
    }

    /// Get only error-level issues.
    pub fn errors(&self) -> Vec<&ValidationIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == IssueSeverity::Error)
            .collect()
    }

    /// Get only warning-level issues.
    pub fn warnings(&self) -> Vec<&ValidationIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == IssueSeverity::Warning)
            .collect()
    }

    /// Add an error.
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            severity: IssueSeverity::Error,
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning.
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            severity: IssueSeverity::Warning,
            field: field.into(),
            message: message.into(),
        });
    }
}

/// A single validation issue.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Severity of the issue
    pub severity: IssueSeverity,
    /// Field path (e.g., "limits.max_sessions")
    pub field: String,
    /// Human-readable message
    pub message: String,
}

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueSeverity {
    /// Warnings don't prevent loading
    Warning,
    /// Errors prevent loading
    Error,
}

impl Config {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self, figment::Error> {
        let config_dir = Self::config_dir();

        Figment::new()
            // Default values
            .merge(figment::providers::Serialized::defaults(Config::default()))
            // User config
            .merge(Toml::file(config_dir.join("config.toml")))
            // Environment variables
            .merge(Env::prefixed("ROOST_").split("_"))
            .extract()
    }

    /// Load and validate configuration.
    pub fn load_validated() -> Result<Self, Error> {
        let config = Self::load().map_err(|e| Error::Config(e.to_string()))?;
        let result = config.validate();

        if !result.is_ok() {
            let errors: Vec<String> = result
                .errors()
                .iter()
                .map(|e| format!("{}: {}", e.field, e.message))
                .collect();
            return Err(Error::Config(format!(
                "Configuration validation failed:\n  {}",
                errors.join("\n  ")
            )));
        }

        for warning in result.warnings() {
            tracing::warn!("Config warning - {}: {}", warning.field, warning.message);
        }

        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();

        if self.limits.max_sessions == 0 {
            result.add_error("limits.max_sessions", "max_sessions must be greater than 0");
        }

        if self.limits.max_sessions > 1024 {
            result.add_warning(
                "limits.max_sessions",
                "max_sessions is very high (> 1024), expect resource pressure",
            );
        }

        if self.limits.event_buffer == 0 {
            result.add_error("limits.event_buffer", "event_buffer must be greater than 0");
        }

        if self.limits.command_buffer == 0 {
            result.add_error(
                "limits.command_buffer",
                "command_buffer must be greater than 0",
            );
        }

        let valid_color_modes = ["auto", "always", "never"];
        if !valid_color_modes.contains(&self.general.color.as_str()) {
            result.add_error(
                "general.color",
                format!(
                    "Invalid color mode '{}'. Valid values: {:?}",
                    self.general.color, valid_color_modes
                ),
            );
        }

        result
    }

    /// Get the configuration directory.
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|p| p.join("roost"))
            .unwrap_or_else(|| PathBuf::from("~/.config/roost"))
    }

    /// Get the data directory (for the store), honoring the override.
    pub fn data_dir(&self) -> PathBuf {
        self.general.data_dir.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .map(|p| p.join("roost"))
                .unwrap_or_else(|| PathBuf::from("~/.local/share/roost"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        let result = config.validate();
        assert!(result.is_ok(), "Default config should be valid: {:?}", result.issues);
    }

    #[test]
    fn test_zero_max_sessions_is_error() {
        let mut config = Config::default();
        config.limits.max_sessions = 0;
        let result = config.validate();
        assert!(!result.is_ok());
        assert!(result.errors().iter().any(|e| e.field == "limits.max_sessions"));
    }

    #[test]
    fn test_high_max_sessions_is_warning() {
        let mut config = Config::default();
        config.limits.max_sessions = 4096;
        let result = config.validate();
        assert!(result.is_ok()); // Warnings don't fail validation
        assert!(result.warnings().iter().any(|e| e.field == "limits.max_sessions"));
    }

    #[test]
    fn test_invalid_color_mode() {
        let mut config = Config::default();
        config.general.color = "invalid".to_string();
        let result = config.validate();
        assert!(!result.is_ok());
        assert!(result.errors().iter().any(|e| e.field == "general.color"));
    }

    #[test]
    fn test_data_dir_override() {
        let mut config = Config::default();
        config.general.data_dir = Some(PathBuf::from("/tmp/roost-data"));
        assert_eq!(config.data_dir(), PathBuf::from("/tmp/roost-data"));
    }
}
