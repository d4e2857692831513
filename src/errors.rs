//! Error taxonomy for the realtime core
//!
//! Everything here is fail-open: transport and parse failures are logged
//! and recovered (backoff, skip-message), never propagated as panics into
//! callers. These types exist for the fallible edges (setup, decode) that
//! do return `Result`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RealtimeError {
    /// WebSocket transport failure (connect, read or write)
    #[error("transport error: {0}")]
    Transport(#[from] tokio_tungstenite::tungstenite::Error),

    /// Envelope or domain-event body that failed to parse
    #[error("malformed feed message: {0}")]
    Malformed(#[from] serde_json::Error),

    /// Invalid or incomplete configuration
    #[error("configuration error: {0}")]
    Config(String),
}
