/// Logger configuration with global access
///
/// Holds the minimum level threshold and the set of tags with debug
/// logging enabled. Stored behind a process-wide lock so every module
/// logs through the same filter without threading a handle around.

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::collections::HashSet;

use super::levels::LogLevel;
use super::tags::LogTag;

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Minimum level threshold (messages above are dropped)
    pub min_level: LogLevel,

    /// Tags with debug logging enabled (debug keys, see `LogTag::to_debug_key`)
    pub debug_tags: HashSet<String>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            min_level: LogLevel::Info,
            debug_tags: HashSet::new(),
        }
    }
}

static LOGGER_CONFIG: Lazy<RwLock<LoggerConfig>> =
    Lazy::new(|| RwLock::new(LoggerConfig::default()));

/// Get a snapshot of the current logger configuration
pub fn get_logger_config() -> LoggerConfig {
    LOGGER_CONFIG.read().clone()
}

/// Replace the logger configuration
pub fn set_logger_config(config: LoggerConfig) {
    *LOGGER_CONFIG.write() = config;
}

/// Check whether debug logging is enabled for a tag
pub fn is_debug_enabled_for_tag(tag: &LogTag) -> bool {
    LOGGER_CONFIG.read().debug_tags.contains(&tag.to_debug_key())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_tag_toggle() {
        let mut config = LoggerConfig::default();
        config.debug_tags.insert("channel".to_string());
        set_logger_config(config);

        assert!(is_debug_enabled_for_tag(&LogTag::Channel));
        assert!(!is_debug_enabled_for_tag(&LogTag::Notify));

        set_logger_config(LoggerConfig::default());
        assert!(!is_debug_enabled_for_tag(&LogTag::Channel));
    }
}
