//! Settings type definitions.
//!
//! All types use camelCase field names and `#[serde(default)]`, so a partial
//! JSON file only needs to name the values it overrides.

use serde::{Deserialize, Serialize};

/// Root settings type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FeedscopeSettings {
    /// Settings schema version.
    pub version: String,
    /// Application name.
    pub name: String,
    /// Pipeline behaviour.
    pub devtools: DevtoolsSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

impl Default for FeedscopeSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            name: "feedscope".to_string(),
            devtools: DevtoolsSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

/// Block-window and subscription settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DevtoolsSettings {
    /// Window size used when a block subscription does not name one.
    pub default_max_blocks: usize,
    /// Delay before a block subscription's first emission, in milliseconds.
    pub initial_emit_delay_ms: u64,
}

impl Default for DevtoolsSettings {
    fn default() -> Self {
        Self {
            default_max_blocks: 10,
            initial_emit_delay_ms: 0,
        }
    }
}

/// Logging settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default `tracing` filter directive.
    pub level: String,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json: false,
        }
    }
}
