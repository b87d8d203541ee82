//! Configuration validation.
//!
//! Validates configuration values and reports every problem at once.

use crate::common::error::ConfigError;
use crate::config::env::apply_env_overrides;
use crate::config::parser::load_config;
use crate::config::types::Config;

/// Validate a configuration and return detailed errors.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let mut errors = Vec::new();

    if config.platform.host.is_empty() {
        errors.push("platform.host is required".to_string());
    }
    if config.platform.port == 0 {
        errors.push("platform.port must be non-zero".to_string());
    }
    if config.platform.room.is_empty() {
        errors.push("platform.room is required".to_string());
    }

    if let Some(ref reconnect) = config.reconnect {
        if reconnect.max_attempts == Some(0) {
            errors.push("reconnect.max_attempts must be at least 1".to_string());
        }
        if reconnect.initial_delay_ms == Some(0) {
            errors.push("reconnect.initial_delay_ms must be non-zero".to_string());
        }
    }

    // Check the effective policy, so a partial reconnect section cannot
    // smuggle an initial delay past the default maximum.
    let policy = config.reconnect_policy();
    if policy.initial_delay > policy.max_delay {
        errors.push(format!(
            "reconnect.initial_delay_ms ({}) must not exceed reconnect.max_delay_ms ({})",
            policy.initial_delay.as_millis(),
            policy.max_delay.as_millis()
        ));
    }

    // Try to compile filter patterns so broken ones fail at startup.
    if let Some(ref filters) = config.filters {
        if let Some(ref patterns) = filters.chat {
            for (i, pattern) in patterns.iter().enumerate() {
                if fancy_regex::Regex::new(pattern).is_err() {
                    errors.push(format!(
                        "filters.chat[{}] is not a valid regex: '{}'",
                        i, pattern
                    ));
                }
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError {
            message: errors.join("; "),
        })
    }
}

/// Load, apply env overrides, and validate a config file.
pub fn load_and_validate(path: &str) -> Result<Config, ConfigError> {
    let config = apply_env_overrides(load_config(path)?);
    validate_config(&config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parser::load_config_str;

    fn valid() -> Config {
        load_config_str(
            r#"
            platform { host = "gw", port = 7480, room = "lobby" }
            "#,
        )
        .unwrap()
    }

    #[test]
    fn test_valid_config_passes() {
        validate_config(&valid()).unwrap();
    }

    #[test]
    fn test_empty_host_and_room_collected_together() {
        let mut config = valid();
        config.platform.host.clear();
        config.platform.room.clear();
        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("platform.host"));
        assert!(err.contains("platform.room"));
    }

    #[test]
    fn test_zero_max_attempts_rejected() {
        let config = load_config_str(
            r#"
            platform { host = "gw", port = 7480, room = "lobby" }
            reconnect { max_attempts = 0 }
            "#,
        )
        .unwrap();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_inverted_delays_rejected() {
        let config = load_config_str(
            r#"
            platform { host = "gw", port = 7480, room = "lobby" }
            reconnect { initial_delay_ms = 5000, max_delay_ms = 1000 }
            "#,
        )
        .unwrap();
        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("initial_delay_ms"));
    }

    #[test]
    fn test_initial_delay_above_default_max_rejected() {
        let config = load_config_str(
            r#"
            platform { host = "gw", port = 7480, room = "lobby" }
            reconnect { initial_delay_ms = 60000 }
            "#,
        )
        .unwrap();
        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("initial_delay_ms"));
    }

    #[test]
    fn test_bad_filter_regex_rejected() {
        let config = load_config_str(
            r#"
            platform { host = "gw", port = 7480, room = "lobby" }
            filters { chat = ["[broken"] }
            "#,
        )
        .unwrap();
        let err = validate_config(&config).unwrap_err().to_string();
        assert!(err.contains("filters.chat[0]"));
    }
}
