//! Host-facing connection adapter.
//!
//! The adapter sits between a host and a [`Transport`](crate::transport::Transport):
//! the host drives a [`ConnectionController`], the transport reports back
//! through a private listener, and the host observes everything through its
//! [`EventDispatcher`](crate::protocol::EventDispatcher).
//!
//! # Event Order
//!
//! For one `connect()` call:
//!
//! ```text
//! Connecting ─┬─► Connected ─► (Text | Binary)* ─► Closed | Error
//!             └─► Error
//! ```
//!
//! The outgoing session is cleared before `Closed` or `Error` is dispatched.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `builder` | [`ControllerBuilder`] |
//! | `controller` | [`ConnectionController`] |
//! | `options` | [`MessageLimits`] |
//! | `state` | [`SessionState`] |

// ============================================================================
// Submodules
// ============================================================================

/// Controller configuration.
pub mod builder;

/// Lifecycle, connect and send operations.
pub mod controller;

/// Transport callback listener.
mod listener;

/// Message size limits.
pub mod options;

/// Incoming and outgoing session handles.
pub mod state;

/// Background connect resolution.
mod task;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::ControllerBuilder;
pub use controller::ConnectionController;
pub use options::MessageLimits;
pub use state::SessionState;
