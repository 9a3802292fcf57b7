//! Chat socket task: connect, authenticate, pump frames, reconnect

use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, RwLock};
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message as WsMessage};
use tracing::{debug, error, info, warn};

use ragchat_api::TokenStore;
use ragchat_core::protocol::Envelope;

use crate::events::StoreEvent;
use crate::reconnect::ReconnectPolicy;
use crate::state::{ConnectionState, StoreState};

pub(crate) type WsSink = futures::stream::SplitSink<
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
    WsMessage,
>;

type WsSource = futures::stream::SplitStream<
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
>;

/// Everything the connection task shares with the store
#[derive(Clone)]
pub(crate) struct ConnectionContext {
    pub session_id: String,
    pub url: String,
    pub token: TokenStore,
    pub policy: ReconnectPolicy,
    pub state: Arc<RwLock<StoreState>>,
    pub ws_tx: Arc<RwLock<Option<WsSink>>>,
    pub events: broadcast::Sender<StoreEvent>,
}

enum ReadOutcome {
    Shutdown,
    /// Peer closed or the stream failed; `rejected` is true if the last frame carried an error
    Closed { rejected: bool },
}

/// Owned handle to the running connection task
pub(crate) struct ConnectionHandle {
    session_id: String,
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl ConnectionHandle {
    pub fn spawn(ctx: ConnectionContext) -> Self {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let session_id = ctx.session_id.clone();
        let task = tokio::spawn(async move {
            ctx.run(shutdown_rx).await;
        });

        Self {
            session_id,
            shutdown_tx,
            task,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Stop the task and wait until its socket is closed
    pub async fn close(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.task.await {
            warn!("Chat connection task ended abnormally: {}", e);
        }
    }
}

impl ConnectionContext {
    async fn run(self, mut shutdown_rx: mpsc::Receiver<()>) {
        let mut failures: u32 = 0;

        loop {
            self.set_connection(ConnectionState::Connecting).await;
            info!(session_id = %self.session_id, "Connecting to chat socket at {}...", self.url);

            let connected = tokio::select! {
                res = connect_async(self.url.as_str()) => res,
                _ = shutdown_rx.recv() => {
                    info!(session_id = %self.session_id, "Shutdown signal received while connecting");
                    return;
                }
            };

            match connected {
                Ok((ws_stream, _)) => {
                    info!(session_id = %self.session_id, "Connected to chat socket");
                    let (write, read) = ws_stream.split();

                    {
                        let mut tx = self.ws_tx.write().await;
                        *tx = Some(write);
                    }

                    if self.on_open().await {
                        let outcome = self.read_loop(read, &mut shutdown_rx).await;

                        let sink = self.ws_tx.write().await.take();
                        match outcome {
                            ReadOutcome::Shutdown => {
                                close_sink(sink).await;
                                info!(session_id = %self.session_id, "Chat socket closed");
                                return;
                            }
                            ReadOutcome::Closed { rejected } => {
                                failures = next_failure_count(failures, rejected);
                                self.state.write().await.on_close();
                                self.publish(StoreEvent::Disconnected {
                                    session_id: self.session_id.clone(),
                                });
                            }
                        }
                    } else {
                        warn!(session_id = %self.session_id, "Auth frame not sent, dropping socket");
                        let sink = self.ws_tx.write().await.take();
                        close_sink(sink).await;
                        failures += 1;
                    }
                }
                Err(e) => {
                    error!(session_id = %self.session_id, "Failed to connect to chat socket: {}", e);
                    failures += 1;
                }
            }

            let Some(delay) = self.policy.delay_for(failures) else {
                warn!(
                    session_id = %self.session_id,
                    "Giving up on chat socket after {} failed attempts",
                    failures - 1
                );
                {
                    let mut state = self.state.write().await;
                    state.connection = ConnectionState::Disconnected;
                    state.is_chat_disabled = true;
                }
                self.publish(StoreEvent::ReconnectExhausted {
                    session_id: self.session_id.clone(),
                });
                return;
            };

            self.set_connection(ConnectionState::Reconnecting { attempt: failures })
                .await;
            self.publish(StoreEvent::Reconnecting {
                session_id: self.session_id.clone(),
                attempt: failures,
                delay,
            });
            info!(
                session_id = %self.session_id,
                "Reconnecting in {:?} (attempt {}/{})",
                delay,
                failures,
                self.policy.max_attempts
            );

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = shutdown_rx.recv() => {
                    info!(session_id = %self.session_id, "Shutdown signal received while waiting to reconnect");
                    return;
                }
            }
        }
    }

    /// Send the auth frame and mark the session active. Returns false, leaving the state alone, if the frame could not be sent.
    async fn on_open(&self) -> bool {
        let selection = self.state.read().await.selection();
        let token = self.token.get().unwrap_or_default();
        let sent = match Envelope::auth(token, selection).encode() {
            Ok(frame) => self.send_text(frame).await,
            Err(e) => {
                error!("Failed to encode auth frame: {}", e);
                false
            }
        };
        if !sent {
            return false;
        }

        self.state.write().await.on_open(&self.session_id);
        self.publish(StoreEvent::Connected {
            session_id: self.session_id.clone(),
        });
        true
    }

    async fn read_loop(&self, mut read: WsSource, shutdown_rx: &mut mpsc::Receiver<()>) -> ReadOutcome {
        let mut rejected = false;

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(WsMessage::Text(text))) => {
                            if let Some(ok) = self.handle_frame(&text).await {
                                rejected = !ok;
                            }
                        }
                        Some(Ok(WsMessage::Close(frame))) => {
                            info!(session_id = %self.session_id, "Chat socket closed by server: {:?}", frame);
                            return ReadOutcome::Closed { rejected };
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            error!(session_id = %self.session_id, "WebSocket error: {}", e);
                            return ReadOutcome::Closed { rejected };
                        }
                        None => {
                            info!(session_id = %self.session_id, "Chat socket stream ended");
                            return ReadOutcome::Closed { rejected };
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    return ReadOutcome::Shutdown;
                }
            }
        }
    }

    /// Apply one text frame. Returns whether it carried no error, `None` when it did not decode.
    async fn handle_frame(&self, text: &str) -> Option<bool> {
        debug!(session_id = %self.session_id, "Received frame: {}", text);

        let env = match Envelope::decode(text) {
            Ok(env) => env,
            Err(e) => {
                warn!("Ignoring malformed chat frame: {}", e);
                return None;
            }
        };

        let events = self.state.write().await.on_envelope(&env);
        for event in events {
            self.publish(event);
        }
        Some(env.error_message().is_none())
    }

    async fn send_text(&self, frame: String) -> bool {
        send_frame(&self.ws_tx, frame).await
    }

    async fn set_connection(&self, connection: ConnectionState) {
        self.state.write().await.connection = connection;
    }

    fn publish(&self, event: StoreEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

/// Failure count after an authenticated socket closed.
///
/// An idle close starts the count over. A close right after an error frame,
/// such as a rejected token, counts as one more failure.
fn next_failure_count(failures: u32, rejected: bool) -> u32 {
    if rejected {
        failures + 1
    } else {
        1
    }
}

async fn close_sink(sink: Option<WsSink>) {
    if let Some(mut sink) = sink {
        if let Err(e) = sink.close().await {
            debug!("Failed to close chat socket cleanly: {}", e);
        }
    }
}

/// Write one text frame if a socket is open
pub(crate) async fn send_frame(ws_tx: &RwLock<Option<WsSink>>, frame: String) -> bool {
    let mut tx = ws_tx.write().await;
    match tx.as_mut() {
        Some(sink) => match sink.send(WsMessage::Text(frame)).await {
            Ok(()) => true,
            Err(e) => {
                error!("Failed to send chat frame: {}", e);
                false
            }
        },
        None => false,
    }
}
