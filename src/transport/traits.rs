//! Collaborator boundary to the WebSocket transport.
//!
//! The adapter never speaks the wire protocol itself. It drives a
//! [`Transport`] and receives callbacks through a [`TransportHandler`].
//! [`WebSocketClient`](super::WebSocketClient) is the bundled
//! implementation; hosts may plug in their own.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use url::Url;

use crate::error::{Error, Result};

use super::policy::MessagePolicy;

// ============================================================================
// Types
// ============================================================================

/// Shared handle to an open transport session.
pub type SessionHandle = Arc<dyn TransportSession>;

/// Pending session returned by [`Transport::connect`].
///
/// Nothing happens until the future is polled.
pub type ConnectFuture = BoxFuture<'static, Result<SessionHandle>>;

// ============================================================================
// Transport
// ============================================================================

/// A WebSocket client library the adapter delegates to.
pub trait Transport: Send + Sync + 'static {
    /// Starts the client. Blocks until the client is ready.
    ///
    /// # Errors
    ///
    /// Returns a lifecycle error if the client cannot be started.
    fn start(&self) -> Result<()>;

    /// Stops the client, closing every session it opened.
    ///
    /// # Errors
    ///
    /// Returns a lifecycle error if the client cannot be stopped.
    fn stop(&self) -> Result<()>;

    /// Frees resources held by a stopped client. The client cannot be
    /// started again afterwards.
    fn release(&self);

    /// Prepares a connection to `url`, reporting its callbacks to `handler`.
    ///
    /// The handler's `on_connect` runs before the returned future resolves.
    /// A failed future is not reported through the handler.
    fn connect(&self, handler: Arc<dyn TransportHandler>, url: Url) -> ConnectFuture;

    /// Returns the message policy currently in effect.
    fn policy(&self) -> MessagePolicy;

    /// Replaces the message policy for future connections.
    fn set_policy(&self, policy: MessagePolicy);
}

// ============================================================================
// TransportSession
// ============================================================================

/// One open WebSocket connection.
///
/// Sends return once the frame has been handed to the transport, not when
/// it reaches the peer.
pub trait TransportSession: Send + Sync + fmt::Debug + 'static {
    /// Queues a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the session is closed.
    fn send_text(&self, text: &str) -> Result<()>;

    /// Queues a binary frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConnectionClosed`] if the session is closed.
    fn send_binary(&self, data: &[u8]) -> Result<()>;

    /// Starts the close handshake. No-op on a closed session.
    fn close(&self);
}

// ============================================================================
// TransportHandler
// ============================================================================

/// Callbacks a transport delivers for a single connection.
pub trait TransportHandler: Send + Sync + 'static {
    /// Handshake completed.
    fn on_connect(&self, session: SessionHandle);

    /// Connection closed.
    fn on_close(&self, code: u16, reason: &str);

    /// Text message received.
    fn on_text(&self, message: &str);

    /// Binary message received.
    fn on_binary(&self, data: &[u8], offset: usize, length: usize);

    /// The open connection failed.
    fn on_error(&self, cause: Error);
}
