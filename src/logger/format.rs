//! Log formatting and output with ANSI colors
//!
//! Colorized console output with aligned tag and level columns.

use chrono::Local;
use colored::*;

use super::levels::LogLevel;
use super::tags::LogTag;

/// Log format widths for alignment
const TAG_WIDTH: usize = 10;
const LEVEL_WIDTH: usize = 7;

/// Format and output a log message
pub fn format_and_log(tag: LogTag, level: LogLevel, message: &str) {
    let time = Local::now().format("%H:%M:%S").to_string();

    let tag_str = format_tag(&tag);
    let level_str = format_level(level);

    println!("{} [{}] [{}] {}", time.dimmed(), tag_str, level_str, message);
}

fn format_tag(tag: &LogTag) -> ColoredString {
    let padded = format!("{:<width$}", tag.display_name(), width = TAG_WIDTH);
    match tag {
        LogTag::Channel => padded.cyan().bold(),
        LogTag::Feed => padded.magenta().bold(),
        LogTag::Reconcile => padded.blue().bold(),
        LogTag::Notify => padded.yellow().bold(),
        LogTag::Config => padded.green().bold(),
        LogTag::System => padded.white().bold(),
    }
}

fn format_level(level: LogLevel) -> ColoredString {
    let padded = format!("{:<width$}", level.as_str(), width = LEVEL_WIDTH);
    match level {
        LogLevel::Error => padded.red().bold(),
        LogLevel::Warning => padded.yellow(),
        LogLevel::Info => padded.normal(),
        LogLevel::Debug => padded.dimmed(),
        LogLevel::Verbose => padded.dimmed(),
    }
}
