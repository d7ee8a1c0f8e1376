//! Host-facing message and event types.
//!
//! # Overview
//!
//! | Type | Direction | Purpose |
//! |------|-----------|---------|
//! | [`Message`] | Host → Remote | Text or binary payload for `send()` |
//! | [`ConnectionEvent`] | Remote → Host | Owned lifecycle / data event |
//! | [`EventDispatcher`] | Remote → Host | Callback contract the host implements |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `event` | Dispatcher contract and event types |
//! | `message` | Outgoing payload type |

// ============================================================================
// Submodules
// ============================================================================

/// Dispatcher contract and connection events.
pub mod event;

/// Outgoing message payloads.
pub mod message;

// ============================================================================
// Re-exports
// ============================================================================

pub use event::{ConnectionEvent, EventChannel, EventDispatcher};
pub use message::Message;
