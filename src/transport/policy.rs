//! Message size policy enforced by the transport.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default upper bound for a single text or binary message (64 KiB).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// Default read buffer size for text or binary frames (32 KiB).
pub const DEFAULT_MAX_MESSAGE_BUFFER_SIZE: usize = 32 * 1024;

// ============================================================================
// MessagePolicy
// ============================================================================

/// Size bounds for incoming messages.
///
/// Owned by the transport. The controller overrides individual bounds from
/// its configuration and leaves the rest at these defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagePolicy {
    /// Largest accepted text message, in bytes.
    pub max_text_message_size: usize,
    /// Read buffer size used for text frames.
    pub max_text_message_buffer_size: usize,
    /// Largest accepted binary message, in bytes.
    pub max_binary_message_size: usize,
    /// Read buffer size used for binary frames.
    pub max_binary_message_buffer_size: usize,
}

impl Default for MessagePolicy {
    fn default() -> Self {
        Self {
            max_text_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            max_text_message_buffer_size: DEFAULT_MAX_MESSAGE_BUFFER_SIZE,
            max_binary_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            max_binary_message_buffer_size: DEFAULT_MAX_MESSAGE_BUFFER_SIZE,
        }
    }
}

impl MessagePolicy {
    /// Checks an incoming text message against the policy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MessageTooLarge`] if `len` exceeds the text bound.
    #[inline]
    pub fn check_text(&self, len: usize) -> Result<()> {
        check("Text", len, self.max_text_message_size)
    }

    /// Checks an incoming binary message against the policy.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MessageTooLarge`] if `len` exceeds the binary bound.
    #[inline]
    pub fn check_binary(&self, len: usize) -> Result<()> {
        check("Binary", len, self.max_binary_message_size)
    }

    /// Returns the larger of the text and binary bounds.
    ///
    /// Messages above it are rejected by tungstenite before their kind is
    /// known.
    #[inline]
    #[must_use]
    pub fn max_message_size(&self) -> usize {
        self.max_text_message_size.max(self.max_binary_message_size)
    }

    /// Returns the error for a message tungstenite rejected at its cap.
    #[must_use]
    pub fn oversized(&self, size: usize) -> Error {
        Error::message_too_large("Incoming", size, self.max_message_size())
    }

    /// Builds the tungstenite configuration for a new connection.
    ///
    /// Tungstenite has a single message cap, so it gets the larger of the
    /// two bounds; the per-kind bound is checked on delivery.
    #[must_use]
    pub fn to_ws_config(&self) -> WebSocketConfig {
        let max_message = self.max_message_size();
        let read_buffer = self
            .max_text_message_buffer_size
            .max(self.max_binary_message_buffer_size);

        WebSocketConfig::default()
            .read_buffer_size(read_buffer)
            .max_message_size(Some(max_message))
            .max_frame_size(Some(max_message))
    }
}

fn check(kind: &'static str, len: usize, limit: usize) -> Result<()> {
    if len > limit {
        return Err(Error::message_too_large(kind, len, limit));
    }
    Ok(())
}

// ============================================================================
// Tests
// ============================================================================
