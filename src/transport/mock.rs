//! Test doubles for the transport boundary.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio_tungstenite::accept_async;
use url::Url;

use crate::error::{Error, Result};
use crate::protocol::{EventChannel, EventDispatcher, Message};

use super::policy::MessagePolicy;
use super::traits::{ConnectFuture, SessionHandle, Transport, TransportHandler, TransportSession};

// ============================================================================
// Echo Server
// ============================================================================

/// Echoes every text and binary frame back to the sender.
pub(crate) async fn spawn_echo_server() -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let port = listener.local_addr().expect("addr").port();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let Ok(mut ws) = accept_async(stream).await else {
                    return;
                };
                while let Some(Ok(message)) = ws.next().await {
                    if (message.is_text() || message.is_binary())
                        && ws.send(message).await.is_err()
                    {
                        break;
                    }
                }
            });
        }
    });

    Url::parse(&format!("ws://127.0.0.1:{port}/")).expect("url")
}

// ============================================================================
// ChannelHandler
// ============================================================================

/// Transport handler that forwards straight into an [`EventChannel`].
pub(crate) struct ChannelHandler(pub EventChannel);

impl TransportHandler for ChannelHandler {
    fn on_connect(&self, _session: SessionHandle) {
        self.0.on_connect();
    }

    fn on_close(&self, code: u16, reason: &str) {
        self.0.on_close(code, reason);
    }

    fn on_text(&self, message: &str) {
        self.0.on_text(message);
    }

    fn on_binary(&self, data: &[u8], offset: usize, length: usize) {
        self.0.on_binary(data, offset, length);
    }

    fn on_error(&self, cause: Error) {
        self.0.on_error(cause);
    }
}

// ============================================================================
// MockSession
// ============================================================================

/// Session that records what was sent through it.
#[derive(Debug, Default)]
pub(crate) struct MockSession {
    pub sent: Mutex<Vec<Message>>,
    pub closed: AtomicBool,
}

impl MockSession {
    pub fn sent(&self) -> Vec<Message> {
        self.sent.lock().clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl TransportSession for MockSession {
    fn send_text(&self, text: &str) -> Result<()> {
        self.sent.lock().push(Message::text(text));
        Ok(())
    }

    fn send_binary(&self, data: &[u8]) -> Result<()> {
        self.sent.lock().push(Message::binary(data));
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

// ============================================================================
// MockTransport
// ============================================================================

/// A connect call the test resolves by hand.
struct Attempt {
    handler: Arc<dyn TransportHandler>,
    resolve: Option<oneshot::Sender<Result<SessionHandle>>>,
}

/// Transport whose connects stay pending until the test resolves them.
#[derive(Default)]
pub(crate) struct MockTransport {
    running: AtomicBool,
    released: AtomicBool,
    fail_start: AtomicBool,
    pub start_calls: AtomicUsize,
    pub stop_calls: AtomicUsize,
    policy: Mutex<MessagePolicy>,
    attempts: Mutex<Vec<Attempt>>,
}

impl MockTransport {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_start(&self) {
        self.fail_start.store(true, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::SeqCst)
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.lock().len()
    }

    /// Returns the handler passed to the `index`-th connect.
    pub fn handler(&self, index: usize) -> Arc<dyn TransportHandler> {
        Arc::clone(&self.attempts.lock()[index].handler)
    }

    /// Completes the `index`-th connect with a fresh session.
    pub fn accept(&self, index: usize) -> Arc<MockSession> {
        let session = Arc::new(MockSession::default());
        self.resolve(index, Ok(Arc::clone(&session) as SessionHandle));
        session
    }

    /// Fails the `index`-th connect.
    pub fn reject(&self, index: usize, cause: Error) {
        self.resolve(index, Err(cause));
    }

    fn resolve(&self, index: usize, outcome: Result<SessionHandle>) {
        let tx = self.attempts.lock()[index]
            .resolve
            .take()
            .expect("attempt already resolved");
        let _ = tx.send(outcome);
    }
}

impl Transport for MockTransport {
    fn start(&self) -> Result<()> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_start.load(Ordering::SeqCst) {
            return Err(Error::lifecycle("mock start failure"));
        }
        if self.is_released() {
            return Err(Error::lifecycle("mock released"));
        }
        self.running.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn release(&self) {
        self.released.store(true, Ordering::SeqCst);
    }

    fn connect(&self, handler: Arc<dyn TransportHandler>, _url: Url) -> ConnectFuture {
        let (tx, rx) = oneshot::channel();
        self.attempts.lock().push(Attempt {
            handler: Arc::clone(&handler),
            resolve: Some(tx),
        });

        // Like a real transport: on_connect fires before the future resolves
        Box::pin(async move {
            let session = rx.await.map_err(|_| Error::ConnectCancelled)??;
            handler.on_connect(Arc::clone(&session));
            Ok(session)
        })
    }

    fn policy(&self) -> MessagePolicy {
        *self.policy.lock()
    }

    fn set_policy(&self, policy: MessagePolicy) {
        *self.policy.lock() = policy;
    }
}
