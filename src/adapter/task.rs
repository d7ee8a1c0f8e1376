//! Asynchronous connect resolution.

// ============================================================================
// Imports
// ============================================================================

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures_util::FutureExt;
use tracing::{debug, warn};
use url::Url;

use crate::error::Error;
use crate::protocol::EventDispatcher;
use crate::transport::ConnectFuture;

use super::state::SessionState;

// ============================================================================
// AsyncConnectTask
// ============================================================================

/// Resolves one pending connect on the executor.
///
/// Emits `on_connecting` before awaiting, publishes the resolved session
/// as incoming, and turns any failure into `on_error`. Nothing is returned
/// to the caller of `connect()` and nothing is retried.
pub(crate) struct AsyncConnectTask {
    url: Url,
    future: ConnectFuture,
    state: Arc<SessionState>,
    dispatcher: Arc<dyn EventDispatcher>,
}

impl AsyncConnectTask {
    pub(crate) fn new(
        url: Url,
        future: ConnectFuture,
        state: Arc<SessionState>,
        dispatcher: Arc<dyn EventDispatcher>,
    ) -> Self {
        Self {
            url,
            future,
            state,
            dispatcher,
        }
    }

    pub(crate) async fn run(self) {
        self.dispatcher.on_connecting();

        let outcome = AssertUnwindSafe(self.future)
            .catch_unwind()
            .await
            .unwrap_or_else(|_| Err(Error::connect("transport panicked while connecting")));

        match outcome {
            Ok(session) => {
                self.state.set_incoming(session);
                debug!(url = %self.url, "Connect resolved");
            }
            Err(cause) => {
                warn!(url = %self.url, error = %cause, "Connect failed");
                self.dispatcher.on_error(cause);
            }
        }
    }
}
