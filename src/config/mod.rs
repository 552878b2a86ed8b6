//! Watcher configuration
//!
//! Configuration is persisted as a JSON object. Loading and updating never
//! trust the whole document: every field is type- and range-checked on its
//! own, valid fields are applied and invalid ones are dropped, leaving the
//! previous value in place.

pub mod store;
pub mod url_match;

pub use store::ConfigStore;
pub use url_match::UrlMatcher;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::ops::RangeInclusive;

pub const RESPONSE_DELAY_RANGE: RangeInclusive<u64> = 0..=60_000;
pub const MAX_RETRIES_RANGE: RangeInclusive<u64> = 0..=10;
pub const COOLDOWN_RANGE: RangeInclusive<u64> = 0..=600_000;
pub const POLL_INTERVAL_RANGE: RangeInclusive<u64> = 50..=60_000;

/// Error texts shown by the generation UI when a run fails
pub const DEFAULT_ERROR_PATTERNS: &[&str] = &[
    "Failed to generate content",
    "Please try again",
    "An internal error has occurred",
    "Something went wrong",
    "Generation failed",
];

pub const DEFAULT_MATCH_URLS: &[&str] = &["https://aistudio.google.com/*"];

/// Explicit selectors for locator strategy 1, tried in order
pub const DEFAULT_BUTTON_SELECTORS: &[&str] = &[
    r#"button[aria-label*="rerun" i]"#,
    r#"button[title*="rerun" i]"#,
    r#"button[class*="rerun" i]"#,
    r#"button[data-testid*="rerun" i]"#,
    r#"[role="button"][aria-label*="rerun" i]"#,
    r#"[role="button"][title*="rerun" i]"#,
    r#"button[aria-label*="regenerate" i]"#,
    r#"button[title*="regenerate" i]"#,
];

/// Watcher configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct Config {
    /// Master switch; when false detections are ignored
    pub enabled: bool,

    /// Wait after a detection before acting, in milliseconds
    pub response_delay_ms: u64,

    /// Extra attempts after the first one fails
    pub max_retries: u32,

    /// Minimum time between two recovery cycles, in milliseconds
    pub cooldown_ms: u64,

    /// Verbose logging
    pub debug: bool,

    /// Case-sensitive substrings that mark a generation failure
    pub error_patterns: Vec<String>,

    /// URL wildcard patterns (`*` matches anything) the watcher is active on
    pub match_urls: Vec<String>,

    /// Attribute selectors identifying the rerun control
    pub button_selectors: Vec<String>,

    /// How often queued page mutations are drained, in milliseconds
    pub poll_interval_ms: u64,

    /// Draw the status indicator in the page
    pub show_indicator: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            enabled: true,
            response_delay_ms: 1500,
            max_retries: 3,
            cooldown_ms: 3000,
            debug: false,
            error_patterns: to_strings(DEFAULT_ERROR_PATTERNS),
            match_urls: to_strings(DEFAULT_MATCH_URLS),
            button_selectors: to_strings(DEFAULT_BUTTON_SELECTORS),
            poll_interval_ms: 250,
            show_indicator: true,
        }
    }
}

/// Outcome of applying a partial configuration object
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplyReport {
    /// Fields that were accepted
    pub applied: Vec<String>,

    /// Fields that were dropped, with the reason
    pub rejected: Vec<(String, String)>,
}

impl ApplyReport {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

impl Config {
    /// Apply every valid field of `patch`; invalid or unknown fields are reported and skipped
    pub fn apply(&mut self, patch: &Map<String, Value>) -> ApplyReport {
        let mut report = ApplyReport::default();

        for (key, value) in patch {
            let outcome = match key.as_str() {
                "enabled" => bool_field(value).map(|v| self.enabled = v),
                "debug" => bool_field(value).map(|v| self.debug = v),
                "show_indicator" => bool_field(value).map(|v| self.show_indicator = v),
                "response_delay_ms" => u64_field(value, RESPONSE_DELAY_RANGE).map(|v| self.response_delay_ms = v),
                "cooldown_ms" => u64_field(value, COOLDOWN_RANGE).map(|v| self.cooldown_ms = v),
                "poll_interval_ms" => u64_field(value, POLL_INTERVAL_RANGE).map(|v| self.poll_interval_ms = v),
                "max_retries" => u64_field(value, MAX_RETRIES_RANGE).map(|v| self.max_retries = v as u32),
                "error_patterns" => string_list_field(value).map(|v| self.error_patterns = v),
                "match_urls" => string_list_field(value).map(|v| self.match_urls = v),
                "button_selectors" => string_list_field(value).map(|v| self.button_selectors = v),
                _ => Err("unknown field".to_string()),
            };

            match outcome {
                Ok(()) => report.applied.push(key.clone()),
                Err(reason) => report.rejected.push((key.clone(), reason)),
            }
        }

        report
    }

    /// Total attempts per recovery cycle
    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// Serialize as a JSON object
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn bool_field(value: &Value) -> Result<bool, String> {
    value.as_bool().ok_or_else(|| format!("expected a boolean, got {}", value))
}

fn u64_field(value: &Value, range: RangeInclusive<u64>) -> Result<u64, String> {
    let number = value.as_u64().ok_or_else(|| format!("expected a non-negative integer, got {}", value))?;
    if range.contains(&number) {
        Ok(number)
    } else {
        Err(format!("{} is outside {}..={}", number, range.start(), range.end()))
    }
}

fn string_list_field(value: &Value) -> Result<Vec<String>, String> {
    let items = value.as_array().ok_or_else(|| format!("expected an array of strings, got {}", value))?;
    if items.is_empty() {
        return Err("list must not be empty".to_string());
    }
    items
        .iter()
        .map(|item| match item.as_str() {
            Some(s) if !s.trim().is_empty() => Ok(s.to_string()),
            _ => Err(format!("invalid list entry {}", item)),
        })
        .collect()
}
