//! Configuration type definitions.

use std::time::Duration;

use serde::Deserialize;

use crate::common::reconnect::ReconnectPolicy;

/// Root configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub platform: PlatformConfig,
    pub reconnect: Option<ReconnectSettings>,
    pub filters: Option<FiltersConfig>,
}

/// Platform gateway connection configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct PlatformConfig {
    pub host: String,
    pub port: u16,
    /// Room/channel to watch.
    pub room: String,
}

/// Reconnection settings. Every field is optional; defaults come from
/// [`ReconnectPolicy::default`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReconnectSettings {
    pub enabled: Option<bool>,
    pub max_attempts: Option<u32>,
    pub initial_delay_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
}

/// Event filtering configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct FiltersConfig {
    /// Regex patterns; matching chat messages are not relayed.
    pub chat: Option<Vec<String>>,
    /// Gifts worth fewer coins than this are not relayed.
    pub min_gift_value: Option<u32>,
}

impl Config {
    /// Reconnect policy with defaults applied.
    pub fn reconnect_policy(&self) -> ReconnectPolicy {
        let defaults = ReconnectPolicy::default();
        match &self.reconnect {
            Some(settings) => ReconnectPolicy {
                enabled: settings.enabled.unwrap_or(defaults.enabled),
                max_attempts: settings.max_attempts.unwrap_or(defaults.max_attempts),
                initial_delay: settings
                    .initial_delay_ms
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.initial_delay),
                max_delay: settings
                    .max_delay_ms
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.max_delay),
            },
            None => defaults,
        }
    }

    pub fn chat_filter_patterns(&self) -> Option<Vec<String>> {
        self.filters.as_ref().and_then(|f| f.chat.clone())
    }

    pub fn min_gift_value(&self) -> Option<u32> {
        self.filters.as_ref().and_then(|f| f.min_gift_value)
    }
}
