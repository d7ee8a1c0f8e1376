//! WebSocket transport layer.
//!
//! This module defines the boundary between the adapter and the library
//! that actually speaks WebSocket, plus the bundled `tokio-tungstenite`
//! implementation of that boundary.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐   Transport::connect   ┌──────────────────────┐
//! │ ConnectionController │───────────────────────►│  WebSocketClient     │
//! │                      │                        │                      │
//! │  SessionListener     │◄───────────────────────│  Connection          │
//! │  (TransportHandler)  │   on_connect/on_text/  │  (event loop task)   │
//! └──────────────────────┘   on_close/on_error    └──────────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `client` | `tokio-tungstenite` client with lifecycle and handshake |
//! | `connection` | Open connection handle and its event loop |
//! | `cookie` | Cookie bridge consulted during the handshake |
//! | `policy` | Message size policy |
//! | `traits` | `Transport`, `TransportSession`, `TransportHandler` |

// ============================================================================
// Submodules
// ============================================================================

/// Tungstenite-backed client.
pub mod client;

/// WebSocket connection and event loop.
pub mod connection;

/// Cookie bridge for the handshake.
pub mod cookie;

/// Message size policy.
pub mod policy;

/// Collaborator traits.
pub mod traits;

#[cfg(test)]
pub(crate) mod mock;

// ============================================================================
// Re-exports
// ============================================================================

pub use client::{ClientOptions, WebSocketClient};
pub use connection::Connection;
pub use cookie::CookieStore;
pub use policy::MessagePolicy;
pub use traits::{ConnectFuture, SessionHandle, Transport, TransportHandler, TransportSession};
