use config::{Config, Environment, File, FileFormat};
use error_stack::{Report, ResultExt};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::AdapterError;
use crate::integrations::sublime::config::{SublimeConfig, TelemetryConfig};

pub const ENVIRONMENT_VARIABLE_PREFIX: &str = "SUBLIME";
pub const ENVIRONMENT_VARIABLE_SEPARATOR: &str = "__";

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct Settings {
    #[serde(default)]
    #[validate(nested)]
    pub adapter: SublimeConfig,

    #[serde(default)]
    #[validate(nested)]
    pub telemetry: TelemetryConfig,
}

impl Settings {
    /// Load the settings shipped with the repository (`sublime.toml`), merged
    /// with `SUBLIME__*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] when the merged configuration
    /// cannot be deserialized or fails validation.
    pub fn new() -> Result<Self, Report<AdapterError>> {
        let toml_str = include_str!("../../../sublime.toml");

        Self::from_toml(toml_str)
    }

    /// Parse settings from a TOML string, apply environment overrides and
    /// validate the result.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] on invalid TOML, type mismatches
    /// or values rejected by validation.
    pub fn from_toml(toml_str: &str) -> Result<Self, Report<AdapterError>> {
        let environment = Environment::default()
            .prefix(ENVIRONMENT_VARIABLE_PREFIX)
            .separator(ENVIRONMENT_VARIABLE_SEPARATOR);

        let toml = File::from_str(toml_str, FileFormat::Toml);
        let config = Config::builder()
            .add_source(toml)
            .add_source(environment)
            .build()
            .change_context(AdapterError::Configuration {
                message: "Failed to build configuration".to_string(),
            })?;

        let settings: Self =
            config
                .try_deserialize()
                .change_context(AdapterError::Configuration {
                    message: "Failed to deserialize configuration".to_string(),
                })?;

        settings
            .validate()
            .change_context(AdapterError::Configuration {
                message: "Settings validation failed".to_string(),
            })?;

        Ok(settings)
    }

    /// Serialize the effective settings (after environment overrides) back to
    /// TOML.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterError::Configuration`] if serialization fails.
    pub fn to_canonical_toml(&self) -> Result<String, Report<AdapterError>> {
        toml::to_string_pretty(self).change_context(AdapterError::Configuration {
            message: "Failed to serialize settings to TOML".to_string(),
        })
    }
}
