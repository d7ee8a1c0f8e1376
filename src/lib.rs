//! WebSocket connection adapter.
//!
//! This library bridges a host environment to a WebSocket client library.
//! The host starts and stops the client, opens connections in the
//! background, sends text or binary messages, and receives lifecycle and
//! data events through a callback trait.
//!
//! # Architecture
//!
//! - **Controller**: [`ConnectionController`] owns one transport client,
//!   schedules connects on the host's tokio runtime and routes sends
//! - **Transport**: [`Transport`] is the seam to the wire; [`WebSocketClient`]
//!   is the bundled `tokio-tungstenite` implementation
//! - **Events**: the host implements [`EventDispatcher`], or uses
//!   [`EventChannel`] to consume [`ConnectionEvent`]s from a channel
//!
//! Key design principles:
//!
//! - `connect()` never blocks; outcomes arrive as events
//! - `Connecting` precedes every other event of an attempt
//! - `Closed` and `Error` are terminal, and the outgoing session is already
//!   gone when they are dispatched
//! - No retries anywhere
//!
//! # Quick Start
//!
//! ```no_run
//! use websocket_adapter::{ConnectionController, ConnectionEvent, EventChannel, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let (events, mut rx) = EventChannel::new();
//!     let controller = ConnectionController::builder()
//!         .max_text_message_size(1 << 20)
//!         .dispatcher(events)
//!         .build()?;
//!
//!     controller.start()?;
//!     controller.connect("wss://echo.example.com/")?;
//!
//!     while let Some(event) = rx.recv().await {
//!         match event {
//!             ConnectionEvent::Connected => controller.send("hello")?,
//!             ConnectionEvent::Text { body } => {
//!                 println!("Received: {}", body);
//!                 controller.close_outgoing_session();
//!             }
//!             event if event.is_terminal() => break,
//!             _ => {}
//!         }
//!     }
//!
//!     controller.close_client()
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapter`] | [`ConnectionController`], [`ControllerBuilder`], [`SessionState`] |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`protocol`] | [`Message`], [`ConnectionEvent`], [`EventDispatcher`] |
//! | [`transport`] | Transport traits and the tungstenite client |

// ============================================================================
// Modules
// ============================================================================

/// Connection controller and its configuration.
///
/// Use [`ConnectionController::builder()`] to create a controller.
pub mod adapter;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Host-facing message and event types.
pub mod protocol;

/// WebSocket transport layer.
///
/// Collaborator traits plus the bundled `tokio-tungstenite` client.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Adapter types
pub use adapter::{ConnectionController, ControllerBuilder, MessageLimits, SessionState};

// Error types
pub use error::{Error, Result};

// Protocol types
pub use protocol::{ConnectionEvent, EventChannel, EventDispatcher, Message};

// Transport types
pub use transport::{
    ClientOptions, CookieStore, MessagePolicy, SessionHandle, Transport, TransportHandler,
    TransportSession, WebSocketClient,
};
