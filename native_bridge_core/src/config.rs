// Bridge configuration.
//
// `BridgeConfig` is deserialized from a JSON string handed over by the host
// (in Godot: `NativeBridge.set_config_json`). Every field has a default, so
// an empty object `{}` is a valid config and partial configs only override
// what they name. Unknown fields are rejected to surface typos.
//
// - `route`: where `call` sends requests. `auto` picks the platform default
//   (boundary on iOS, local everywhere else).
// - `log_traffic`: log every call and response at info level.
// - `log_level`: maximum level the host's log sink should pass through.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid bridge config JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// How `Dispatcher::call` routes requests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteMode {
    /// Boundary on platforms with a native counterpart, local otherwise.
    #[default]
    Auto,
    /// Always run the in-process handler table.
    Local,
    /// Always forward across the platform boundary.
    Boundary,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Off => log::LevelFilter::Off,
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BridgeConfig {
    pub route: RouteMode,
    pub log_traffic: bool,
    pub log_level: LogLevel,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            route: RouteMode::Auto,
            log_traffic: true,
            log_level: LogLevel::Info,
        }
    }
}

impl BridgeConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}
