//! Session handles shared between the controller and its workers.
//!
//! The two handles have different visibility rules:
//!
//! | Handle | Written by | Visibility |
//! |--------|------------|------------|
//! | incoming | connect task, once per `connect()` | atomic, lock-free reads |
//! | outgoing | transport callbacks | transport callback order |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use parking_lot::Mutex;

use crate::transport::SessionHandle;

// ============================================================================
// SessionState
// ============================================================================

/// Incoming and outgoing session handles.
pub struct SessionState {
    /// Session resolved by the connect task.
    incoming: ArcSwapOption<SessionHandle>,
    /// Session reported by the transport's connect callback.
    outgoing: Mutex<Option<SessionHandle>>,
}

impl SessionState {
    /// Creates state with no sessions.
    #[must_use]
    pub fn new() -> Self {
        Self {
            incoming: ArcSwapOption::empty(),
            outgoing: Mutex::new(None),
        }
    }

    /// Returns the incoming session, if one has resolved.
    #[must_use]
    pub fn incoming(&self) -> Option<SessionHandle> {
        self.incoming
            .load_full()
            .map(|session| Arc::clone(&*session))
    }

    /// Returns `true` once a connect has resolved.
    #[inline]
    #[must_use]
    pub fn has_incoming(&self) -> bool {
        self.incoming.load().is_some()
    }

    /// Returns the outgoing session while the connection is open.
    #[must_use]
    pub fn outgoing(&self) -> Option<SessionHandle> {
        self.outgoing.lock().clone()
    }

    /// Returns `true` while the connection is open.
    #[inline]
    #[must_use]
    pub fn has_outgoing(&self) -> bool {
        self.outgoing.lock().is_some()
    }

    /// Publishes the resolved session, replacing any earlier one.
    pub(crate) fn set_incoming(&self, session: SessionHandle) {
        self.incoming.store(Some(Arc::new(session)));
    }

    pub(crate) fn set_outgoing(&self, session: SessionHandle) {
        *self.outgoing.lock() = Some(session);
    }

    /// Clears the outgoing session if it is still `session`.
    ///
    /// A newer connect may already have replaced it; that one stays.
    pub(crate) fn clear_outgoing_if(&self, session: &SessionHandle) -> bool {
        let mut outgoing = self.outgoing.lock();
        match outgoing.as_ref() {
            Some(current) if Arc::ptr_eq(current, session) => {
                *outgoing = None;
                true
            }
            _ => false,
        }
    }
}

impl Default for SessionState {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionState")
            .field("incoming", &self.has_incoming())
            .field("outgoing", &self.has_outgoing())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
