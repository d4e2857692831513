//! Persistent feed channel
//!
//! One channel owns one WebSocket connection to a server-side feed and
//! its whole lifecycle: connect, heartbeat, backoff reconnect, close.
//! Raw envelopes are forwarded to the owner in receipt order over an
//! unbounded pipe; `pong` frames are consumed here and never forwarded.
//!
//! A transport failure is fatal only to this channel, never the process:
//! the channel keeps retrying per its policy until the caller tears it
//! down or the policy gives up (state `failed`).

use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, WebSocketStream};

use crate::errors::RealtimeError;
use crate::logger::{self, LogTag};
use crate::realtime::backoff::{ExhaustPolicy, ReconnectDecision, ReconnectPolicy};
use crate::realtime::message::{Feed, FeedEnvelope};

// ============================================================================
// CHANNEL STATE
// ============================================================================

/// Connection status of one channel, observable by consumers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Disconnected,
    Connecting,
    Connected,
    Error,
    Failed,
}

impl ChannelState {
    /// Status string surfaced to consumers
    pub fn as_str(&self) -> &'static str {
        match self {
            ChannelState::Disconnected => "disconnected",
            ChannelState::Connecting => "connecting",
            ChannelState::Connected => "connected",
            ChannelState::Error => "error",
            ChannelState::Failed => "failed",
        }
    }
}

impl std::fmt::Display for ChannelState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// CHANNEL
// ============================================================================

/// Everything a channel needs to run one feed connection
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    pub feed: Feed,
    pub url: String,
    pub policy: ReconnectPolicy,
    /// Client-side keepalive interval; `None` means the feed relies on
    /// transport-level keepalive (intentional for the order feeds)
    pub heartbeat: Option<Duration>,
}

/// Handle to a running channel task
pub struct ChannelHandle {
    state_rx: watch::Receiver<ChannelState>,
    shutdown_tx: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ChannelHandle {
    /// Current connection state
    pub fn state(&self) -> ChannelState {
        *self.state_rx.borrow()
    }

    /// Watcher over state transitions
    pub fn watch_state(&self) -> watch::Receiver<ChannelState> {
        self.state_rx.clone()
    }

    /// Close the channel with the normal code. Suppresses any scheduled
    /// reconnect; safe to call more than once.
    pub fn close(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Whether the channel task has terminated (gave up, was closed, or
    /// the server ended the session normally). A finished channel never
    /// serves again; owners must open a fresh one.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Abort the channel task outright (teardown path; `close` is the
    /// graceful route)
    pub fn abort(&self) {
        self.task.abort();
    }
}

pub struct Channel;

impl Channel {
    /// Open a channel: spawns the connection task and returns the handle
    /// together with the envelope receiver (receipt order preserved)
    pub fn open(config: ChannelConfig) -> (ChannelHandle, mpsc::UnboundedReceiver<FeedEnvelope>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(ChannelState::Disconnected);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let task = tokio::spawn(run_channel(config, state_tx, shutdown_rx, events_tx));

        (
            ChannelHandle {
                state_rx,
                shutdown_tx,
                task,
            },
            events_rx,
        )
    }
}

// ============================================================================
// CONNECTION TASK
// ============================================================================

/// Why one served connection ended
enum ServeEnd {
    /// Caller asked us to close (normal code sent); never reconnect
    LocalClose,
    /// Server closed with the normal code; never reconnect
    NormalClose,
    /// Server closed abnormally or the stream ended; reconnect
    AbnormalClose,
    /// Transport-level error; reconnect
    Transport,
}

async fn run_channel(
    config: ChannelConfig,
    state_tx: watch::Sender<ChannelState>,
    mut shutdown_rx: watch::Receiver<bool>,
    events_tx: mpsc::UnboundedSender<FeedEnvelope>,
) {
    let feed = config.feed;
    let mut policy = config.policy;

    let set_state = |state: ChannelState| {
        if *state_tx.borrow() != state {
            logger::debug(
                LogTag::Channel,
                &format!("{}: state -> {}", feed, state),
            );
            let _ = state_tx.send(state);
        }
    };

    loop {
        if *shutdown_rx.borrow() {
            set_state(ChannelState::Disconnected);
            return;
        }

        set_state(ChannelState::Connecting);
        logger::info(
            LogTag::Channel,
            &format!(
                "{}: connecting to {} (attempt {})",
                feed,
                config.url,
                policy.attempt() + 1
            ),
        );

        let connected = tokio::select! {
            _ = shutdown_rx.changed() => {
                set_state(ChannelState::Disconnected);
                return;
            }
            result = connect_async(&config.url) => result,
        };

        match connected {
            Ok((stream, _response)) => {
                policy.reset();
                set_state(ChannelState::Connected);
                logger::info(LogTag::Channel, &format!("{}: connected", feed));

                let end = serve(
                    feed,
                    stream,
                    &mut shutdown_rx,
                    &events_tx,
                    config.heartbeat,
                )
                .await;

                match end {
                    ServeEnd::LocalClose => {
                        logger::info(LogTag::Channel, &format!("{}: closed by caller", feed));
                        set_state(ChannelState::Disconnected);
                        return;
                    }
                    ServeEnd::NormalClose => {
                        logger::info(
                            LogTag::Channel,
                            &format!("{}: server closed normally", feed),
                        );
                        set_state(ChannelState::Disconnected);
                        return;
                    }
                    ServeEnd::AbnormalClose => {
                        logger::warning(
                            LogTag::Channel,
                            &format!("{}: connection lost", feed),
                        );
                        set_state(ChannelState::Disconnected);
                    }
                    ServeEnd::Transport => {
                        set_state(ChannelState::Error);
                    }
                }
            }
            Err(err) => {
                let err = RealtimeError::from(err);
                logger::warning(
                    LogTag::Channel,
                    &format!("{}: connect failed: {}", feed, err),
                );
                set_state(ChannelState::Error);
            }
        }

        // Backoff path, shared by abnormal closure and transport error
        match policy.next() {
            ReconnectDecision::Retry(delay) => {
                logger::info(
                    LogTag::Channel,
                    &format!("{}: reconnecting in {}ms", feed, delay.as_millis()),
                );
                tokio::select! {
                    _ = shutdown_rx.changed() => {
                        set_state(ChannelState::Disconnected);
                        return;
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            ReconnectDecision::Exhausted => match policy.on_exhaust() {
                ExhaustPolicy::GiveUp => {
                    logger::warning(
                        LogTag::Channel,
                        &format!(
                            "{}: giving up after {} attempts",
                            feed,
                            policy.attempt()
                        ),
                    );
                    set_state(ChannelState::Failed);
                    return;
                }
                ExhaustPolicy::ResetAndRetry => {
                    logger::info(
                        LogTag::Channel,
                        &format!("{}: attempts exhausted, resetting counter", feed),
                    );
                    policy.reset();
                }
            },
        }
    }
}

/// Drive one established connection until it ends
async fn serve<S>(
    feed: Feed,
    stream: WebSocketStream<S>,
    shutdown_rx: &mut watch::Receiver<bool>,
    events_tx: &mpsc::UnboundedSender<FeedEnvelope>,
    heartbeat: Option<Duration>,
) -> ServeEnd
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (mut ws_tx, mut ws_rx) = stream.split();

    let mut ticker = heartbeat.map(|period| {
        tokio::time::interval_at(tokio::time::Instant::now() + period, period)
    });

    loop {
        tokio::select! {
            biased;

            _ = shutdown_rx.changed() => {
                let frame = CloseFrame {
                    code: CloseCode::Normal,
                    reason: "client shutdown".into(),
                };
                let _ = ws_tx.send(Message::Close(Some(frame))).await;
                return ServeEnd::LocalClose;
            }

            _ = heartbeat_tick(&mut ticker) => {
                match FeedEnvelope::Ping.to_json() {
                    Ok(text) => {
                        logger::debug(LogTag::Channel, &format!("{}: ping", feed));
                        if ws_tx.send(Message::Text(text)).await.is_err() {
                            return ServeEnd::Transport;
                        }
                    }
                    Err(err) => {
                        logger::error(
                            LogTag::Channel,
                            &format!("{}: failed to serialize ping: {}", feed, err),
                        );
                    }
                }
            }

            message = ws_rx.next() => match message {
                Some(Ok(Message::Text(text))) => {
                    if !handle_text(feed, &text, events_tx) {
                        // Owner dropped the receiver; nothing left to feed
                        return ServeEnd::LocalClose;
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    let normal = frame
                        .as_ref()
                        .map(|f| f.code == CloseCode::Normal)
                        .unwrap_or(false);
                    return if normal {
                        ServeEnd::NormalClose
                    } else {
                        ServeEnd::AbnormalClose
                    };
                }
                Some(Ok(_)) => {
                    // Binary and transport-level ping/pong frames are not
                    // part of the feed protocol
                }
                Some(Err(err)) => {
                    let err = RealtimeError::from(err);
                    logger::warning(
                        LogTag::Channel,
                        &format!("{}: websocket error: {}", feed, err),
                    );
                    return ServeEnd::Transport;
                }
                None => return ServeEnd::AbnormalClose,
            }
        }
    }
}

/// Tick the heartbeat, or park forever when the feed has none
async fn heartbeat_tick(ticker: &mut Option<tokio::time::Interval>) {
    match ticker {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

/// Parse and forward one text frame. A parse failure is logged and
/// skipped; it must not take the channel down or block later messages.
/// Returns false when the owner has gone away.
fn handle_text(feed: Feed, text: &str, events_tx: &mpsc::UnboundedSender<FeedEnvelope>) -> bool {
    match serde_json::from_str::<FeedEnvelope>(text) {
        Ok(FeedEnvelope::Pong) => {
            logger::debug(LogTag::Channel, &format!("{}: pong", feed));
            true
        }
        Ok(envelope) => events_tx.send(envelope).is_ok(),
        Err(err) => {
            logger::warning(
                LogTag::Channel,
                &format!("{}: malformed message ({}): {}", feed, err, text),
            );
            true
        }
    }
}
