//! Builder pattern for controller configuration.
//!
//! Provides a fluent API for configuring and creating
//! [`ConnectionController`] instances.
//!
//! # Example
//!
//! ```no_run
//! use websocket_adapter::{ConnectionController, EventChannel};
//!
//! # fn example(executor: tokio::runtime::Handle) -> websocket_adapter::Result<()> {
//! let (events, _rx) = EventChannel::new();
//! let controller = ConnectionController::builder()
//!     .executor(executor)
//!     .max_text_message_size(1024)
//!     .dispatcher(events)
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use tokio::runtime::Handle;
use tracing::debug;

use crate::error::{Error, Result};
use crate::protocol::EventDispatcher;
use crate::transport::{ClientOptions, CookieStore, Transport, WebSocketClient};

use super::controller::ConnectionController;
use super::options::MessageLimits;

// ============================================================================
// ControllerBuilder
// ============================================================================

/// Builder for configuring a [`ConnectionController`].
///
/// Use [`ConnectionController::builder()`] to create a new builder.
#[derive(Default)]
pub struct ControllerBuilder {
    /// Skip certificate validation.
    use_insecure_transport: bool,
    /// Worker runtime.
    executor: Option<Handle>,
    /// Message size overrides.
    limits: MessageLimits,
    /// Host cookie jar.
    cookie_store: Option<Arc<dyn CookieStore>>,
    /// Host callbacks.
    dispatcher: Option<Arc<dyn EventDispatcher>>,
    /// Replacement for the bundled client.
    transport: Option<Arc<dyn Transport>>,
}

impl fmt::Debug for ControllerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ControllerBuilder")
            .field("use_insecure_transport", &self.use_insecure_transport)
            .field("executor", &self.executor.is_some())
            .field("limits", &self.limits)
            .field("cookie_store", &self.cookie_store.is_some())
            .field("dispatcher", &self.dispatcher.is_some())
            .field("custom_transport", &self.transport.is_some())
            .finish()
    }
}

// ============================================================================
// ControllerBuilder Implementation
// ============================================================================

impl ControllerBuilder {
    /// Creates a new builder with no configuration.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept any TLS certificate and hostname for `wss://` URLs.
    #[inline]
    #[must_use]
    pub fn use_insecure_transport(mut self, insecure: bool) -> Self {
        self.use_insecure_transport = insecure;
        self
    }

    /// Sets the runtime that resolves connects and delivers callbacks.
    ///
    /// Defaults to the runtime `build()` is called from.
    #[inline]
    #[must_use]
    pub fn executor(mut self, executor: Handle) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Sets the binary message bound. Zero keeps the transport default.
    #[inline]
    #[must_use]
    pub fn max_binary_message_size(mut self, size: usize) -> Self {
        self.limits = self.limits.with_max_binary_message_size(size);
        self
    }

    /// Sets the binary read buffer size. Zero keeps the transport default.
    #[inline]
    #[must_use]
    pub fn max_binary_message_buffer_size(mut self, size: usize) -> Self {
        self.limits = self.limits.with_max_binary_message_buffer_size(size);
        self
    }

    /// Sets the text message bound. Zero keeps the transport default.
    #[inline]
    #[must_use]
    pub fn max_text_message_size(mut self, size: usize) -> Self {
        self.limits = self.limits.with_max_text_message_size(size);
        self
    }

    /// Sets the text read buffer size. Zero keeps the transport default.
    #[inline]
    #[must_use]
    pub fn max_text_message_buffer_size(mut self, size: usize) -> Self {
        self.limits = self.limits.with_max_text_message_buffer_size(size);
        self
    }

    /// Replaces all message limits at once.
    #[inline]
    #[must_use]
    pub fn limits(mut self, limits: MessageLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Sets the cookie jar consulted during the handshake.
    #[inline]
    #[must_use]
    pub fn cookie_store(mut self, store: impl CookieStore) -> Self {
        self.cookie_store = Some(Arc::new(store));
        self
    }

    /// Sets the host callbacks.
    #[inline]
    #[must_use]
    pub fn dispatcher(mut self, dispatcher: impl EventDispatcher) -> Self {
        self.dispatcher = Some(Arc::new(dispatcher));
        self
    }

    /// Sets shared host callbacks.
    #[inline]
    #[must_use]
    pub fn dispatcher_arc(mut self, dispatcher: Arc<dyn EventDispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Uses `transport` instead of the bundled [`WebSocketClient`].
    ///
    /// TLS and cookie settings belong to the custom transport and must not
    /// be set on the builder.
    #[inline]
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Builds the controller with validation.
    ///
    /// The configured limits are written into the transport's policy.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if no dispatcher is set
    /// - [`Error::Config`] if no executor is set and no runtime is current
    /// - [`Error::Config`] if TLS or cookie options accompany a custom transport
    /// - [`Error::Tls`] if the insecure TLS connector cannot be built
    pub fn build(self) -> Result<ConnectionController> {
        let dispatcher = self.validate_dispatcher()?;
        let executor = self.validate_executor()?;
        let transport = self.validate_transport(&executor)?;

        let mut policy = transport.policy();
        self.limits.apply_to(&mut policy);
        transport.set_policy(policy);

        debug!(
            ?policy,
            custom_limits = !self.limits.is_default(),
            insecure = self.use_insecure_transport,
            "Controller built"
        );

        Ok(ConnectionController::new(transport, dispatcher, executor))
    }
}

// ============================================================================
// Validation
// ============================================================================

impl ControllerBuilder {
    /// Validates the dispatcher configuration.
    fn validate_dispatcher(&self) -> Result<Arc<dyn EventDispatcher>> {
        self.dispatcher.clone().ok_or_else(|| {
            Error::config(
                "Event dispatcher is required. Use .dispatcher() to set it.\n\
                 Example: ConnectionController::builder().dispatcher(events)",
            )
        })
    }

    /// Validates the executor configuration.
    fn validate_executor(&self) -> Result<Handle> {
        if let Some(executor) = &self.executor {
            return Ok(executor.clone());
        }

        Handle::try_current().map_err(|_| {
            Error::config(
                "No executor set and no tokio runtime is running. \
                 Use .executor() to pass a runtime handle.",
            )
        })
    }

    /// Returns the custom transport, or builds the bundled client.
    fn validate_transport(&self, executor: &Handle) -> Result<Arc<dyn Transport>> {
        if let Some(transport) = &self.transport {
            if self.use_insecure_transport || self.cookie_store.is_some() {
                return Err(Error::config(
                    "TLS and cookie options cannot be combined with a custom transport. \
                     Configure them on the transport itself.",
                ));
            }
            return Ok(Arc::clone(transport));
        }

        let options = ClientOptions {
            use_insecure_transport: self.use_insecure_transport,
            executor: executor.clone(),
            cookie_store: self.cookie_store.clone(),
        };

        Ok(Arc::new(WebSocketClient::new(options)?))
    }
}

// ============================================================================
// Tests
// ============================================================================
