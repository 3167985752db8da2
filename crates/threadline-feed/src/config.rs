//! Feed configuration loaded from environment variables.
//!
//! All settings have defaults so a conversation can be opened with zero
//! configuration.

use threadline_shared::constants::{
    DEFAULT_PAGE_SIZE, DEFAULT_PENDING_WARN_THRESHOLD, DEFAULT_SINK_BUFFER, MAX_PAGE_SIZE,
};

/// Per-conversation feed settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    /// Messages requested per page.
    /// Env: `THREADLINE_PAGE_SIZE`
    /// Default: `50`, clamped to `1..=100`
    pub page_size: u16,

    /// Pending table length that triggers a stuck-operation warning.
    /// Env: `THREADLINE_PENDING_WARN`
    /// Default: `256`
    pub pending_warn_threshold: usize,

    /// Capacity of channel-backed render sinks.
    /// Env: `THREADLINE_SINK_BUFFER`
    /// Default: `64`
    pub sink_buffer: usize,

    /// Whether a successful mutation triggers a feed refresh.
    /// Env: `THREADLINE_REFRESH_AFTER_COMMIT` (true/false)
    /// Default: `true`
    pub refresh_after_commit: bool,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            pending_warn_threshold: DEFAULT_PENDING_WARN_THRESHOLD,
            sink_buffer: DEFAULT_SINK_BUFFER,
            refresh_after_commit: true,
        }
    }
}

impl FeedConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(val) = lookup("THREADLINE_PAGE_SIZE") {
            match val.trim().parse::<u16>() {
                Ok(n) => config.page_size = bounded_page_size(n),
                Err(e) => tracing::warn!(
                    value = %val,
                    error = %e,
                    "Invalid THREADLINE_PAGE_SIZE, using default"
                ),
            }
        }

        if let Some(val) = lookup("THREADLINE_PENDING_WARN") {
            match val.trim().parse::<usize>() {
                Ok(n) if n > 0 => config.pending_warn_threshold = n,
                _ => tracing::warn!(value = %val, "Invalid THREADLINE_PENDING_WARN, using default"),
            }
        }

        if let Some(val) = lookup("THREADLINE_SINK_BUFFER") {
            match val.trim().parse::<usize>() {
                Ok(n) if n > 0 => config.sink_buffer = n,
                _ => tracing::warn!(value = %val, "Invalid THREADLINE_SINK_BUFFER, using default"),
            }
        }

        if let Some(val) = lookup("THREADLINE_REFRESH_AFTER_COMMIT") {
            match parse_flag(&val) {
                Some(flag) => config.refresh_after_commit = flag,
                None => tracing::warn!(
                    value = %val,
                    "Invalid THREADLINE_REFRESH_AFTER_COMMIT, using default"
                ),
            }
        }

        config
    }
}

fn parse_flag(val: &str) -> Option<bool> {
    match val.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Clamp a requested page size to `1..=MAX_PAGE_SIZE`.
pub fn bounded_page_size(requested: u16) -> u16 {
    requested.clamp(1, MAX_PAGE_SIZE)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = FeedConfig::default();
        assert_eq!(config.page_size, 50);
        assert_eq!(config.pending_warn_threshold, 256);
        assert!(config.refresh_after_commit);
    }

    #[test]
    fn test_env_overrides() {
        let config = FeedConfig::from_lookup(lookup_from(&[
            ("THREADLINE_PAGE_SIZE", "20"),
            ("THREADLINE_PENDING_WARN", "8"),
            ("THREADLINE_REFRESH_AFTER_COMMIT", "false"),
        ]));
        assert_eq!(config.page_size, 20);
        assert_eq!(config.pending_warn_threshold, 8);
        assert!(!config.refresh_after_commit);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = FeedConfig::from_lookup(lookup_from(&[
            ("THREADLINE_PAGE_SIZE", "lots"),
            ("THREADLINE_PENDING_WARN", "0"),
        ]));
        assert_eq!(config, FeedConfig::default());
    }

    #[test]
    fn test_refresh_flag_parsing() {
        for val in ["FALSE", "no", " 0 ", "Off"] {
            let config =
                FeedConfig::from_lookup(lookup_from(&[("THREADLINE_REFRESH_AFTER_COMMIT", val)]));
            assert!(!config.refresh_after_commit, "{val:?} should disable");
        }
        let config =
            FeedConfig::from_lookup(lookup_from(&[("THREADLINE_REFRESH_AFTER_COMMIT", "Yes")]));
        assert!(config.refresh_after_commit);

        let config =
            FeedConfig::from_lookup(lookup_from(&[("THREADLINE_REFRESH_AFTER_COMMIT", "nope")]));
        assert_eq!(config, FeedConfig::default());
    }

    #[test]
    fn test_page_size_is_clamped() {
        assert_eq!(bounded_page_size(0), 1);
        assert_eq!(bounded_page_size(500), 100);
        let config = FeedConfig::from_lookup(lookup_from(&[("THREADLINE_PAGE_SIZE", "999")]));
        assert_eq!(config.page_size, 100);
    }
}
