//! Error types for the WebSocket adapter.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! Fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use websocket_adapter::{Message, Result};
//!
//! fn greet(controller: &ConnectionController) -> Result<()> {
//!     controller.send(Message::text("hello"))?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants | Surfaces as |
//! |----------|----------|-------------|
//! | Lifecycle | [`Error::Lifecycle`], [`Error::ClientClosed`] | `start()` / `close_client()` / `connect()` return value |
//! | Send | [`Error::UnsupportedPayload`], [`Error::NoSession`] | `send()` return value |
//! | Connect | [`Error::Connect`], [`Error::NotStarted`], [`Error::ConnectCancelled`] | `on_error` event |
//! | Transport | [`Error::ConnectionClosed`], [`Error::MessageTooLarge`] | `on_error` event |
//! | Configuration | [`Error::Config`] | builder return value |
//! | External | [`Error::Io`], [`Error::Url`], [`Error::WebSocket`], [`Error::Tls`] | either |

// ============================================================================
// Imports
// ============================================================================

use std::convert::Infallible;
use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned by the controller builder when options are inconsistent.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Lifecycle Errors
    // ========================================================================
    /// Transport start or stop failed.
    #[error("Lifecycle error: {message}")]
    Lifecycle {
        /// Description of the lifecycle failure.
        message: String,
    },

    /// The transport client has been closed and released.
    ///
    /// Returned by every lifecycle operation after `close_client()`.
    #[error("Client closed")]
    ClientClosed,

    // ========================================================================
    // Send Errors
    // ========================================================================
    /// Payload is neither text nor binary.
    #[error("Unsupported payload: cannot send a {kind} value")]
    UnsupportedPayload {
        /// Kind of value that was rejected.
        kind: String,
    },

    /// No outgoing session is open.
    #[error("No open session to send on")]
    NoSession,

    // ========================================================================
    // Connect Errors
    // ========================================================================
    /// Connecting to the remote end failed.
    #[error("Connect failed: {message}")]
    Connect {
        /// Description of the connect failure.
        message: String,
    },

    /// Connect attempted on a transport that is not running.
    #[error("Transport not started")]
    NotStarted,

    /// The pending connect was dropped before it resolved.
    #[error("Connect cancelled")]
    ConnectCancelled,

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// The connection is already closed.
    #[error("Connection closed")]
    ConnectionClosed,

    /// An incoming message exceeded the transport policy.
    #[error("{kind} message of {size} bytes exceeds limit of {limit} bytes")]
    MessageTooLarge {
        /// `"Text"` or `"Binary"`, or `"Incoming"` when the message was
        /// rejected before its kind was known.
        kind: &'static str,
        /// Size of the offending message.
        size: usize,
        /// Policy limit in effect.
        limit: usize,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// Invalid WebSocket URL.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// WebSocket protocol error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// TLS connector setup error.
    #[error("TLS error: {0}")]
    Tls(#[from] native_tls::Error),
}

impl From<Infallible> for Error {
    fn from(never: Infallible) -> Self {
        match never {}
    }
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a lifecycle error.
    #[inline]
    pub fn lifecycle(message: impl Into<String>) -> Self {
        Self::Lifecycle {
            message: message.into(),
        }
    }

    /// Creates an unsupported payload error.
    #[inline]
    pub fn unsupported_payload(kind: impl Into<String>) -> Self {
        Self::UnsupportedPayload { kind: kind.into() }
    }

    /// Creates a connect error.
    #[inline]
    pub fn connect(message: impl Into<String>) -> Self {
        Self::Connect {
            message: message.into(),
        }
    }

    /// Creates a message too large error.
    #[inline]
    pub fn message_too_large(kind: &'static str, size: usize, limit: usize) -> Self {
        Self::MessageTooLarge { kind, size, limit }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this error came from starting or stopping the client.
    #[inline]
    #[must_use]
    pub fn is_lifecycle_error(&self) -> bool {
        matches!(self, Self::Lifecycle { .. } | Self::ClientClosed)
    }

    /// Returns `true` if this error was raised locally by `send()`.
    #[inline]
    #[must_use]
    pub fn is_send_error(&self) -> bool {
        matches!(self, Self::UnsupportedPayload { .. } | Self::NoSession)
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connect { .. }
                | Self::NotStarted
                | Self::ConnectCancelled
                | Self::ConnectionClosed
                | Self::WebSocket(_)
                | Self::Tls(_)
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
