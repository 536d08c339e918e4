//! Settings loading

use config::{Config, Environment, File};
use std::env;

use rates_core::{ConfigError, ConfigResult, MonitorConfig};

/// Environment variable naming the settings file
pub const CONFIG_PATH_VAR: &str = "RATES_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config.json";

pub fn config_path() -> String {
    env::var(CONFIG_PATH_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
}

/// Load settings from `path`, with `RATES__<KEY>` environment overrides on top
pub fn load(path: &str) -> ConfigResult<MonitorConfig> {
    Config::builder()
        .add_source(File::with_name(path))
        .add_source(Environment::with_prefix("RATES").separator("__"))
        .build()
        .and_then(|settings| settings.try_deserialize::<MonitorConfig>())
        .map_err(|e| ConfigError::Load(e.to_string()))
}
