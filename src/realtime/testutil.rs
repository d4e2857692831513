//! Loopback feed servers and polling helpers shared by the realtime tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use super::channel::{ChannelHandle, ChannelState};
use futures_util::StreamExt;

/// TCP listener that counts accepted connections
pub(crate) struct CountingListener {
    inner: TcpListener,
    accepts: Arc<AtomicUsize>,
}

impl CountingListener {
    pub(crate) fn inner_addr(&self) -> std::net::SocketAddr {
        self.inner.local_addr().expect("listener addr")
    }

    pub(crate) async fn accept(&self) -> std::io::Result<(TcpStream, std::net::SocketAddr)> {
        let accepted = self.inner.accept().await?;
        self.accepts.fetch_add(1, Ordering::SeqCst);
        Ok(accepted)
    }
}

/// Bind a loopback listener and return it with its ws:// URL and the
/// accept counter
pub(crate) async fn spawn_listener() -> (CountingListener, String, Arc<AtomicUsize>) {
    let inner = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind loopback listener");
    let addr = inner.local_addr().expect("listener addr");
    let url = format!("ws://{}", addr);
    let accepts = Arc::new(AtomicUsize::new(0));
    (
        CountingListener {
            inner,
            accepts: accepts.clone(),
        },
        url,
        accepts,
    )
}

/// Wait until the channel reports the target state, or time out
pub(crate) async fn wait_for_state(
    handle: &ChannelHandle,
    target: ChannelState,
    limit: Duration,
) -> bool {
    let mut rx = handle.watch_state();
    tokio::time::timeout(limit, async {
        loop {
            if *rx.borrow() == target {
                return;
            }
            if rx.changed().await.is_err() {
                if *rx.borrow() == target {
                    return;
                }
                // Channel task is gone and will never reach the target
                std::future::pending::<()>().await;
            }
        }
    })
    .await
    .is_ok()
}

/// Read the next text frame from a server-side socket, skipping
/// non-text frames; None once the connection ends
pub(crate) async fn recv_text(ws: &mut WebSocketStream<TcpStream>) -> Option<String> {
    while let Some(message) = ws.next().await {
        match message {
            Ok(Message::Text(text)) => return Some(text),
            Ok(Message::Close(_)) | Err(_) => return None,
            Ok(_) => continue,
        }
    }
    None
}
