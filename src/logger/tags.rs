/// Log tags identifying the subsystem a message originates from
///
/// Each tag maps to a fixed display name and a debug key usable in the
/// logger config (`debug_tags`).

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogTag {
    Channel,   // WebSocket channel lifecycle (connect/reconnect/heartbeat)
    Feed,      // Topic multiplexer and subscriber fan-out
    Reconcile, // Canonical order/table state merging
    Notify,    // Notification store
    Config,    // Configuration loading
    System,    // Everything else
}

impl LogTag {
    /// Display name used in the console prefix
    pub fn display_name(&self) -> &'static str {
        match self {
            LogTag::Channel => "CHANNEL",
            LogTag::Feed => "FEED",
            LogTag::Reconcile => "RECONCILE",
            LogTag::Notify => "NOTIFY",
            LogTag::Config => "CONFIG",
            LogTag::System => "SYSTEM",
        }
    }

    /// Key used to enable per-tag debug logging
    pub fn to_debug_key(&self) -> String {
        self.display_name().to_lowercase()
    }
}

impl std::fmt::Display for LogTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}
