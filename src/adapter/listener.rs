//! Transport callback listener.
//!
//! One [`SessionListener`] is created per `connect()`. It records the
//! outgoing session on connect, clears it before any terminal event, and
//! forwards everything else to the host's dispatcher unchanged.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::protocol::EventDispatcher;
use crate::transport::{SessionHandle, TransportHandler};

use super::state::SessionState;

// ============================================================================
// SessionListener
// ============================================================================

/// Adapts transport callbacks into [`EventDispatcher`] calls.
pub(crate) struct SessionListener {
    /// Target of the connect, for logging.
    url: Url,
    /// Shared session handles.
    state: Arc<SessionState>,
    /// Host callbacks.
    dispatcher: Arc<dyn EventDispatcher>,
    /// Session this listener published as outgoing.
    session: Mutex<Option<SessionHandle>>,
}

impl SessionListener {
    pub(crate) fn new(
        url: Url,
        state: Arc<SessionState>,
        dispatcher: Arc<dyn EventDispatcher>,
    ) -> Self {
        Self {
            url,
            state,
            dispatcher,
            session: Mutex::new(None),
        }
    }

    /// Withdraws this listener's outgoing session.
    fn release_outgoing(&self) {
        if let Some(own) = self.session.lock().take() {
            self.state.clear_outgoing_if(&own);
        }
    }
}

impl TransportHandler for SessionListener {
    fn on_connect(&self, session: SessionHandle) {
        *self.session.lock() = Some(Arc::clone(&session));
        self.state.set_outgoing(session);

        debug!(url = %self.url, "Session connected");
        self.dispatcher.on_connect();
    }

    fn on_close(&self, code: u16, reason: &str) {
        self.release_outgoing();

        debug!(url = %self.url, code, reason, "Session closed");
        self.dispatcher.on_close(code, reason);
    }

    fn on_text(&self, message: &str) {
        trace!(url = %self.url, len = message.len(), "Text received");
        self.dispatcher.on_text(message);
    }

    fn on_binary(&self, data: &[u8], offset: usize, length: usize) {
        trace!(url = %self.url, len = length, "Binary received");
        self.dispatcher.on_binary(data, offset, length);
    }

    fn on_error(&self, cause: Error) {
        self.release_outgoing();

        debug!(url = %self.url, error = %cause, "Session error");
        self.dispatcher.on_error(cause);
    }
}
