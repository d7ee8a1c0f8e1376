//! Connection events and the dispatcher contract.
//!
//! The host implements [`EventDispatcher`] to receive lifecycle and data
//! events for the adapter's connection. [`EventChannel`] is a ready-made
//! dispatcher that turns every callback into a [`ConnectionEvent`] on a
//! tokio channel.
//!
//! # Ordering
//!
//! For a single connection attempt:
//!
//! 1. `on_connecting` precedes every other event
//! 2. exactly one of `on_connect` or `on_error` follows
//! 3. `on_text` / `on_binary` may follow `on_connect`
//! 4. `on_close` or `on_error` ends the attempt; nothing follows them
//!
//! Callbacks run on whichever worker thread delivers them.

// ============================================================================
// Imports
// ============================================================================

use tokio::sync::mpsc;
use tracing::trace;

use crate::error::Error;

// ============================================================================
// EventDispatcher
// ============================================================================

/// Host-side receiver of connection events.
///
/// Every method may be invoked from an arbitrary thread, concurrently with
/// the thread that called `connect()`.
pub trait EventDispatcher: Send + Sync + 'static {
    /// A connect attempt has been scheduled and is about to resolve.
    fn on_connecting(&self);

    /// The outgoing session is open.
    fn on_connect(&self);

    /// The connection closed with the given status code.
    fn on_close(&self, code: u16, reason: &str);

    /// A text message arrived.
    fn on_text(&self, message: &str);

    /// A binary message arrived; the payload is `data[offset..offset + length]`.
    fn on_binary(&self, data: &[u8], offset: usize, length: usize);

    /// The attempt failed, or the open connection broke.
    fn on_error(&self, cause: Error);
}

// ============================================================================
// ConnectionEvent
// ============================================================================

/// Owned form of a dispatcher callback.
#[derive(Debug)]
pub enum ConnectionEvent {
    /// See [`EventDispatcher::on_connecting`].
    Connecting,
    /// See [`EventDispatcher::on_connect`].
    Connected,
    /// See [`EventDispatcher::on_close`].
    Closed {
        /// WebSocket close status code.
        code: u16,
        /// Close reason sent by the peer.
        reason: String,
    },
    /// See [`EventDispatcher::on_text`].
    Text {
        /// Message body.
        body: String,
    },
    /// See [`EventDispatcher::on_binary`].
    Binary {
        /// Backing buffer.
        bytes: Vec<u8>,
        /// Start of the payload in `bytes`.
        offset: usize,
        /// Payload length.
        length: usize,
    },
    /// See [`EventDispatcher::on_error`].
    Error {
        /// What went wrong.
        cause: Error,
    },
}

impl ConnectionEvent {
    /// Returns `true` for events that end a connection attempt.
    #[inline]
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed { .. } | Self::Error { .. })
    }

    /// Returns the binary payload slice, if this is a binary event.
    #[must_use]
    pub fn payload(&self) -> Option<&[u8]> {
        match self {
            Self::Binary {
                bytes,
                offset,
                length,
            } => bytes.get(*offset..offset + length),
            _ => None,
        }
    }

    /// Returns a short name for logging.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Closed { .. } => "closed",
            Self::Text { .. } => "text",
            Self::Binary { .. } => "binary",
            Self::Error { .. } => "error",
        }
    }
}

// ============================================================================
// EventChannel
// ============================================================================

/// Dispatcher that forwards every callback into an unbounded channel.
///
/// # Example
///
/// ```ignore
/// let (events, mut rx) = EventChannel::new();
/// let controller = ConnectionController::builder().dispatcher(events).build()?;
///
/// while let Some(event) = rx.recv().await {
///     println!("{}", event.name());
/// }
/// ```
#[derive(Debug, Clone)]
pub struct EventChannel {
    tx: mpsc::UnboundedSender<ConnectionEvent>,
}

impl EventChannel {
    /// Creates the dispatcher and the receiving end of its channel.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ConnectionEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn emit(&self, event: ConnectionEvent) {
        let name = event.name();
        if self.tx.send(event).is_err() {
            trace!(event = name, "Event receiver dropped");
        }
    }
}

impl EventDispatcher for EventChannel {
    fn on_connecting(&self) {
        self.emit(ConnectionEvent::Connecting);
    }

    fn on_connect(&self) {
        self.emit(ConnectionEvent::Connected);
    }

    fn on_close(&self, code: u16, reason: &str) {
        self.emit(ConnectionEvent::Closed {
            code,
            reason: reason.to_owned(),
        });
    }

    fn on_text(&self, message: &str) {
        self.emit(ConnectionEvent::Text {
            body: message.to_owned(),
        });
    }

    fn on_binary(&self, data: &[u8], offset: usize, length: usize) {
        self.emit(ConnectionEvent::Binary {
            bytes: data.to_vec(),
            offset,
            length,
        });
    }

    fn on_error(&self, cause: Error) {
        self.emit(ConnectionEvent::Error { cause });
    }
}

// ============================================================================
// Tests
// ============================================================================
