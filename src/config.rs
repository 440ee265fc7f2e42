//! Search configuration
//!
//! One JSON document configures both the predicate compiler and the
//! federation router. Every field is optional:
//!
//! ```json
//! {
//!   "compiler": { "substring_search": false, "empty_scope_policy": "reject" },
//!   "router": { "provider_timeout_ms": 2000, "max_concurrent_dispatches": 1 }
//! }
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::catalog::{FieldCatalog, ValueCodec};
use crate::compiler::CompilerOptions;
use crate::federation::RouterConfig;

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Configuration errors. All are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {reason}")]
    Unreadable { path: String, reason: String },

    #[error("Invalid config JSON: {0}")]
    Malformed(String),

    #[error("Invalid config value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl ConfigError {
    pub fn code(&self) -> &'static str {
        match self {
            ConfigError::Unreadable { .. } => "CONTACT_CONFIG_UNREADABLE",
            ConfigError::Malformed(_) => "CONTACT_CONFIG_MALFORMED",
            ConfigError::InvalidValue { .. } => "CONTACT_CONFIG_INVALID",
        }
    }
}

/// Aggregate configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SearchConfig {
    #[serde(default)]
    pub compiler: CompilerOptions,

    #[serde(default)]
    pub router: RouterConfig,
}

impl SearchConfig {
    /// Loads and validates a config file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Unreadable {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json_str(&content)
    }

    /// Parses and validates a config document
    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        let config: SearchConfig =
            serde_json::from_str(content).map_err(|e| ConfigError::Malformed(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges serde cannot express
    pub fn validate(&self) -> ConfigResult<()> {
        if self.router.provider_timeout_ms == 0 {
            return Err(ConfigError::InvalidValue {
                field: "router.provider_timeout_ms",
                reason: "must be > 0".to_string(),
            });
        }

        if self.router.max_concurrent_dispatches == 0 {
            return Err(ConfigError::InvalidValue {
                field: "router.max_concurrent_dispatches",
                reason: "must be >= 1".to_string(),
            });
        }

        for (field, id) in [
            ("compiler.display_field", self.compiler.display_field),
            ("compiler.letter_field", self.compiler.letter_field),
        ] {
            let mapping = FieldCatalog::standard()
                .resolve(id)
                .map_err(|e| ConfigError::InvalidValue {
                    field,
                    reason: e.to_string(),
                })?;
            if mapping.codec != ValueCodec::Text || !mapping.filterable {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: format!("{} is not a searchable text field", mapping.name),
                });
            }
        }

        Ok(())
    }
}
