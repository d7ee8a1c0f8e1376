//! Message size limits configured by the host.
//!
//! Each limit is optional. Unset or zero keeps the transport's own default.
//!
//! # Example
//!
//! ```ignore
//! use websocket_adapter::MessageLimits;
//!
//! let limits = MessageLimits::new()
//!     .with_max_text_message_size(1024)
//!     .with_max_binary_message_size(1 << 20);
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::transport::MessagePolicy;

// ============================================================================
// MessageLimits
// ============================================================================

/// Host-requested overrides for the transport's [`MessagePolicy`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MessageLimits {
    /// Upper bound for binary messages.
    pub max_binary_message_size: Option<usize>,

    /// Read buffer size for binary frames.
    pub max_binary_message_buffer_size: Option<usize>,

    /// Upper bound for text messages.
    pub max_text_message_size: Option<usize>,

    /// Read buffer size for text frames.
    pub max_text_message_buffer_size: Option<usize>,
}

// ============================================================================
// Constructors
// ============================================================================

impl MessageLimits {
    /// Creates limits that keep every transport default.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_binary_message_size: None,
            max_binary_message_buffer_size: None,
            max_text_message_size: None,
            max_text_message_buffer_size: None,
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl MessageLimits {
    /// Sets the binary message bound.
    #[inline]
    #[must_use]
    pub fn with_max_binary_message_size(mut self, size: usize) -> Self {
        self.max_binary_message_size = Some(size);
        self
    }

    /// Sets the binary read buffer size.
    #[inline]
    #[must_use]
    pub fn with_max_binary_message_buffer_size(mut self, size: usize) -> Self {
        self.max_binary_message_buffer_size = Some(size);
        self
    }

    /// Sets the text message bound.
    #[inline]
    #[must_use]
    pub fn with_max_text_message_size(mut self, size: usize) -> Self {
        self.max_text_message_size = Some(size);
        self
    }

    /// Sets the text read buffer size.
    #[inline]
    #[must_use]
    pub fn with_max_text_message_buffer_size(mut self, size: usize) -> Self {
        self.max_text_message_buffer_size = Some(size);
        self
    }
}

// ============================================================================
// Conversion Methods
// ============================================================================

impl MessageLimits {
    /// Overwrites the bounds of `policy` that were set to a positive value.
    pub fn apply_to(&self, policy: &mut MessagePolicy) {
        if let Some(size) = positive(self.max_binary_message_size) {
            policy.max_binary_message_size = size;
        }
        if let Some(size) = positive(self.max_binary_message_buffer_size) {
            policy.max_binary_message_buffer_size = size;
        }
        if let Some(size) = positive(self.max_text_message_size) {
            policy.max_text_message_size = size;
        }
        if let Some(size) = positive(self.max_text_message_buffer_size) {
            policy.max_text_message_buffer_size = size;
        }
    }

    /// Returns `true` if no limit would change a policy.
    #[must_use]
    pub fn is_default(&self) -> bool {
        let mut policy = MessagePolicy::default();
        self.apply_to(&mut policy);
        policy == MessagePolicy::default()
    }
}

#[inline]
fn positive(size: Option<usize>) -> Option<usize> {
    size.filter(|&size| size > 0)
}

// ============================================================================
// Tests
// ============================================================================
