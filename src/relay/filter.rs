//! Live event filtering.
//!
//! Drops unwanted events before they reach the overlays: chat messages
//! matching configurable regex patterns, and gifts below a configurable
//! coin value.

use fancy_regex::Regex;
use tracing::warn;

use crate::common::types::LiveEvent;

/// Filter applied to live events on their way to the overlays.
#[derive(Debug, Clone)]
pub struct EventFilter {
    chat_patterns: Vec<CompiledPattern>,
    min_gift_value: Option<u32>,
}

/// A compiled regex pattern with its original string for debugging.
#[derive(Debug, Clone)]
struct CompiledPattern {
    original: String,
    regex: Regex,
}

impl EventFilter {
    /// Create a filter from pattern strings.
    ///
    /// Invalid regex patterns are logged and skipped.
    pub fn new(chat_patterns: Option<Vec<String>>, min_gift_value: Option<u32>) -> Self {
        Self {
            chat_patterns: compile_patterns(chat_patterns.unwrap_or_default()),
            min_gift_value,
        }
    }

    /// A filter that passes everything.
    #[allow(dead_code)]
    pub fn empty() -> Self {
        Self {
            chat_patterns: Vec::new(),
            min_gift_value: None,
        }
    }

    /// Returns `true` if the event should be dropped.
    pub fn should_drop(&self, event: &LiveEvent) -> bool {
        match event {
            LiveEvent::Chat(chat) => self.chat_patterns.iter().any(|p| {
                p.regex.is_match(&chat.text).unwrap_or_else(|e| {
                    warn!("Regex match error for pattern '{}': {}", p.original, e);
                    false
                })
            }),
            LiveEvent::Gift(gift) => match self.min_gift_value {
                // Wire-supplied values; the product can exceed u32.
                Some(min) => {
                    u64::from(gift.coin_value) * u64::from(gift.count) < u64::from(min)
                }
                None => false,
            },
            LiveEvent::PollVote(_) | LiveEvent::Like(_) => false,
        }
    }
}

/// Compile a list of regex pattern strings, skipping invalid ones.
fn compile_patterns(patterns: Vec<String>) -> Vec<CompiledPattern> {
    patterns
        .into_iter()
        .filter_map(|pattern| match Regex::new(&pattern) {
            Ok(regex) => Some(CompiledPattern {
                original: pattern,
                regex,
            }),
            Err(e) => {
                warn!("Invalid filter regex pattern '{}': {}", pattern, e);
                None
            }
        })
        .collect()
}
