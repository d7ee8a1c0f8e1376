//! WebSocket connection and event loop.
//!
//! A [`Connection`] is the session handle handed to the host. Sends and
//! closes are queued on a command channel; a tokio task owns the socket
//! and delivers every incoming message to the connection's
//! [`TransportHandler`].
//!
//! # Event Loop
//!
//! The spawned task handles:
//!
//! - Incoming text/binary messages, checked against the [`MessagePolicy`]
//! - Outgoing frames queued by [`Connection::send_text`] and friends
//! - The close handshake, bounded by a timeout
//! - Exactly one terminal callback (`on_close` or `on_error`)

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::time::{Instant, sleep_until};
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::error::CapacityError;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{Error as WsError, Message as WsMessage};
use tracing::{debug, trace, warn};
use url::Url;
use uuid::Uuid;

use crate::error::{Error, Result};

use super::policy::MessagePolicy;
use super::traits::{SessionHandle, TransportHandler, TransportSession};

// ============================================================================
// Constants
// ============================================================================

/// How long to wait for the peer's close frame after sending ours.
const CLOSE_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(5);

/// Close received without a status code.
const CLOSE_NO_STATUS: u16 = 1005;

/// Connection dropped without a close frame.
const CLOSE_ABNORMAL: u16 = 1006;

// ============================================================================
// Types
// ============================================================================

/// Live connections keyed by connection id, shared with the owning client.
pub(crate) type ConnectionRegistry = Arc<Mutex<FxHashMap<Uuid, Arc<Connection>>>>;

/// Internal commands for the event loop.
enum ConnectionCommand {
    /// Write a frame.
    Send(WsMessage),
    /// Start the close handshake.
    Close,
}

/// How the event loop ended.
enum Outcome {
    Closed { code: u16, reason: String },
    Failed(Error),
}

// ============================================================================
// Connection
// ============================================================================

/// An open WebSocket connection.
///
/// # Thread Safety
///
/// `Connection` is `Send + Sync`. All operations are non-blocking: they
/// queue work for the event loop and return.
#[derive(Debug)]
pub struct Connection {
    /// Connection id, unique per client.
    id: Uuid,
    /// Remote endpoint.
    url: Url,
    /// Channel to the event loop.
    command_tx: mpsc::UnboundedSender<ConnectionCommand>,
    /// Set once `close()` has been requested.
    closing: AtomicBool,
}

impl Connection {
    /// Takes over an established WebSocket stream.
    ///
    /// Registers the connection, reports it through `handler.on_connect`
    /// and spawns the event loop on `executor`, in that order.
    ///
    /// `accepting` is read under the registry lock, so a client that clears
    /// it while holding the same lock either sees this connection in the
    /// registry or makes this call fail.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectCancelled`] if `accepting` is false. The
    /// stream is dropped and no callback fires.
    pub(crate) fn open<S>(
        ws_stream: WebSocketStream<S>,
        url: Url,
        handler: Arc<dyn TransportHandler>,
        policy: MessagePolicy,
        registry: &ConnectionRegistry,
        accepting: &AtomicBool,
        executor: &Handle,
    ) -> Result<Arc<Self>>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let connection = Arc::new(Self {
            id: Uuid::new_v4(),
            url,
            command_tx,
            closing: AtomicBool::new(false),
        });

        {
            let mut live = registry.lock();
            if !accepting.load(Ordering::Acquire) {
                debug!(url = %connection.url, "Client stopped during handshake");
                return Err(Error::ConnectCancelled);
            }
            live.insert(connection.id, Arc::clone(&connection));
        }

        debug!(id = %connection.id, url = %connection.url, "Connection open");

        handler.on_connect(Arc::clone(&connection) as SessionHandle);

        executor.spawn(Self::run_event_loop(
            connection.id,
            ws_stream,
            command_rx,
            handler,
            policy,
            Arc::clone(registry),
        ));

        Ok(connection)
    }

    /// Returns the connection id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Returns the remote endpoint.
    #[inline]
    #[must_use]
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Returns `true` once a close has been requested.
    #[inline]
    #[must_use]
    pub fn is_closing(&self) -> bool {
        self.closing.load(Ordering::Acquire)
    }

    fn dispatch(&self, command: ConnectionCommand) -> Result<()> {
        if self.is_closing() {
            return Err(Error::ConnectionClosed);
        }
        self.command_tx
            .send(command)
            .map_err(|_| Error::ConnectionClosed)
    }

    /// Event loop that owns the socket.
    async fn run_event_loop<S>(
        id: Uuid,
        ws_stream: WebSocketStream<S>,
        mut command_rx: mpsc::UnboundedReceiver<ConnectionCommand>,
        handler: Arc<dyn TransportHandler>,
        policy: MessagePolicy,
        registry: ConnectionRegistry,
    ) where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let (mut ws_write, mut ws_read) = ws_stream.split();
        let mut commands_open = true;
        let mut close_deadline: Option<Instant> = None;

        let outcome = loop {
            tokio::select! {
                // Incoming messages from the peer
                message = ws_read.next() => {
                    match message {
                        Some(Ok(WsMessage::Text(text))) => {
                            if let Err(e) = policy.check_text(text.len()) {
                                let _ = ws_write.send(too_large_frame()).await;
                                break Outcome::Failed(e);
                            }
                            handler.on_text(text.as_str());
                        }

                        Some(Ok(WsMessage::Binary(data))) => {
                            if let Err(e) = policy.check_binary(data.len()) {
                                let _ = ws_write.send(too_large_frame()).await;
                                break Outcome::Failed(e);
                            }
                            handler.on_binary(&data[..], 0, data.len());
                        }

                        Some(Ok(WsMessage::Close(frame))) => {
                            // Push out tungstenite's queued close reply
                            let _ = ws_write.flush().await;
                            break match frame {
                                Some(frame) => Outcome::Closed {
                                    code: u16::from(frame.code),
                                    reason: frame.reason.as_str().to_owned(),
                                },
                                None => Outcome::Closed {
                                    code: CLOSE_NO_STATUS,
                                    reason: String::new(),
                                },
                            };
                        }

                        // Over tungstenite's cap, so over both per-kind bounds
                        Some(Err(WsError::Capacity(CapacityError::MessageTooLong { size, .. }))) => {
                            let _ = ws_write.send(too_large_frame()).await;
                            break Outcome::Failed(policy.oversized(size));
                        }

                        Some(Err(e)) => break Outcome::Failed(Error::WebSocket(e)),

                        None => {
                            break Outcome::Closed {
                                code: CLOSE_ABNORMAL,
                                reason: "Disconnected".to_owned(),
                            };
                        }

                        // Ping, Pong, raw frames
                        Some(Ok(_)) => {}
                    }
                }

                // Commands from session handles
                command = command_rx.recv(), if commands_open => {
                    // Every handle dropped: close as if asked to
                    commands_open = command.is_some();
                    let frame = match command {
                        Some(ConnectionCommand::Send(message)) => message,
                        Some(ConnectionCommand::Close) | None => {
                            if close_deadline.is_some() {
                                continue;
                            }
                            close_deadline = Some(Instant::now() + CLOSE_HANDSHAKE_TIMEOUT);
                            debug!(%id, "Close handshake started");
                            normal_close_frame()
                        }
                    };

                    if let Err(e) = ws_write.send(frame).await {
                        break Outcome::Failed(Error::WebSocket(e));
                    }
                    trace!(%id, "Frame sent");
                }

                () = wait_until(close_deadline) => {
                    warn!(%id, "Peer did not answer close frame");
                    break Outcome::Closed {
                        code: CLOSE_ABNORMAL,
                        reason: "Close handshake timed out".to_owned(),
                    };
                }
            }
        };

        registry.lock().remove(&id);

        match outcome {
            Outcome::Closed { code, reason } => {
                debug!(%id, code, reason = %reason, "Connection closed");
                handler.on_close(code, &reason);
            }
            Outcome::Failed(cause) => {
                warn!(%id, error = %cause, "Connection failed");
                handler.on_error(cause);
            }
        }
    }
}

impl TransportSession for Connection {
    fn send_text(&self, text: &str) -> Result<()> {
        self.dispatch(ConnectionCommand::Send(WsMessage::text(text.to_owned())))
    }

    fn send_binary(&self, data: &[u8]) -> Result<()> {
        self.dispatch(ConnectionCommand::Send(WsMessage::binary(data.to_vec())))
    }

    fn close(&self) {
        if self.closing.swap(true, Ordering::AcqRel) {
            return;
        }
        // Loop already gone means the connection is already closed
        let _ = self.command_tx.send(ConnectionCommand::Close);
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn normal_close_frame() -> WsMessage {
    WsMessage::Close(Some(CloseFrame {
        code: CloseCode::Normal,
        reason: "".into(),
    }))
}

fn too_large_frame() -> WsMessage {
    WsMessage::Close(Some(CloseFrame {
        code: CloseCode::Size,
        reason: "Message too large".into(),
    }))
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

// ============================================================================
// Tests
// ============================================================================
