//! Environment variable overrides for configuration.
//!
//! Supports overriding config values with environment variables:
//! - `MARQUEE_CONFIG` - path to the config file
//! - `MARQUEE_PLATFORM_HOST` - gateway host
//! - `MARQUEE_PLATFORM_PORT` - gateway port
//! - `MARQUEE_PLATFORM_ROOM` - room to watch

use std::env;

use crate::config::types::Config;

/// Environment variable prefix for all config overrides.
const ENV_PREFIX: &str = "MARQUEE";

/// Default config file path when `MARQUEE_CONFIG` is unset.
const DEFAULT_CONFIG_PATH: &str = "marquee.conf";

/// Path to the configuration file.
pub fn get_config_path() -> String {
    env::var(format!("{}_CONFIG", ENV_PREFIX)).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string())
}

/// Apply environment variable overrides to a config.
pub fn apply_env_overrides(mut config: Config) -> Config {
    if let Ok(host) = env::var(format!("{}_PLATFORM_HOST", ENV_PREFIX)) {
        config.platform.host = host;
    }
    if let Ok(port) = env::var(format!("{}_PLATFORM_PORT", ENV_PREFIX)) {
        if let Ok(port) = port.parse() {
            config.platform.port = port;
        }
    }
    if let Ok(room) = env::var(format!("{}_PLATFORM_ROOM", ENV_PREFIX)) {
        config.platform.room = room;
    }

    config
}
