//! Configuration file parsing (HOCON format).

use std::path::Path;

use hocon::HoconLoader;

use crate::common::error::ConfigError;
use crate::config::types::Config;

/// Load configuration from a HOCON file.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();

    HoconLoader::new()
        .load_file(path)
        .map_err(|e| ConfigError::IoError {
            path: path.display().to_string(),
            source: std::io::Error::new(std::io::ErrorKind::Other, e.to_string()),
        })?
        .resolve()
        .map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })
}

/// Load configuration from a HOCON string.
#[allow(dead_code)]
pub fn load_config_str(content: &str) -> Result<Config, ConfigError> {
    HoconLoader::new()
        .load_str(content)
        .map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?
        .resolve()
        .map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_minimal_config() {
        let config = load_config_str(
            r#"
            platform {
                host = "gateway.example.com"
                port = 7480
                room = "lobby"
            }
            "#,
        )
        .unwrap();
        assert_eq!(config.platform.host, "gateway.example.com");
        assert_eq!(config.platform.port, 7480);
        assert_eq!(config.platform.room, "lobby");

        let policy = config.reconnect_policy();
        assert!(policy.enabled);
        assert_eq!(policy.max_attempts, 5);
    }

    #[test]
    fn test_reconnect_overrides() {
        let config = load_config_str(
            r#"
            platform { host = "h", port = 1, room = "r" }
            reconnect {
                enabled = true
                max_attempts = 8
                initial_delay_ms = 500
                max_delay_ms = 16000
            }
            "#,
        )
        .unwrap();
        let policy = config.reconnect_policy();
        assert_eq!(policy.max_attempts, 8);
        assert_eq!(policy.initial_delay, Duration::from_millis(500));
        assert_eq!(policy.max_delay, Duration::from_millis(16_000));
    }

    #[test]
    fn test_filters_section() {
        let config = load_config_str(
            r#"
            platform { host = "h", port = 1, room = "r" }
            filters {
                chat = ["(?i)spam"]
                min_gift_value = 10
            }
            "#,
        )
        .unwrap();
        assert_eq!(config.chat_filter_patterns().unwrap().len(), 1);
        assert_eq!(config.min_gift_value(), Some(10));
    }

    #[test]
    fn test_missing_platform_section_fails() {
        assert!(load_config_str("reconnect { enabled = false }").is_err());
    }
}
