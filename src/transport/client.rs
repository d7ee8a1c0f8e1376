//! Tungstenite-backed WebSocket client.
//!
//! [`WebSocketClient`] implements [`Transport`] on top of
//! `tokio-tungstenite`. It tracks every connection it opens so `stop()`
//! can close them, and runs all connection work on the executor it was
//! built with.
//!
//! # Lifecycle
//!
//! ```text
//! new ──start()──► running ──stop()──► stopped ──release()──► released
//!                     ▲                   │
//!                     └─────start()───────┘
//! ```
//!
//! `connect()` futures fail with [`Error::NotStarted`] unless the client is
//! running when they are polled.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use native_tls::TlsConnector;
use parking_lot::RwLock;
use tokio::runtime::Handle;
use tokio_tungstenite::Connector;
use tokio_tungstenite::connect_async_tls_with_config;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::{COOKIE, SET_COOKIE};
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{Error, Result};

use super::connection::{Connection, ConnectionRegistry};
use super::cookie::CookieStore;
use super::policy::MessagePolicy;
use super::traits::{ConnectFuture, SessionHandle, Transport, TransportHandler, TransportSession};

// ============================================================================
// ClientOptions
// ============================================================================

/// Construction options for [`WebSocketClient`].
#[derive(Clone)]
pub struct ClientOptions {
    /// Skip certificate and hostname validation for `wss://` URLs.
    pub use_insecure_transport: bool,
    /// Runtime that runs handshakes and connection event loops.
    pub executor: Handle,
    /// Cookie jar consulted during the handshake.
    pub cookie_store: Option<Arc<dyn CookieStore>>,
}

impl ClientOptions {
    /// Creates options with certificate validation on and no cookie store.
    #[inline]
    #[must_use]
    pub fn new(executor: Handle) -> Self {
        Self {
            use_insecure_transport: false,
            executor,
            cookie_store: None,
        }
    }
}

impl fmt::Debug for ClientOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientOptions")
            .field("use_insecure_transport", &self.use_insecure_transport)
            .field("cookie_store", &self.cookie_store.is_some())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// WebSocketClient
// ============================================================================

/// Shared state between the client and its pending connect futures.
struct ClientInner {
    /// Whether connects are currently allowed.
    running: AtomicBool,
    /// Set by `release()`; terminal.
    released: AtomicBool,
    /// Policy applied to new connections.
    policy: RwLock<MessagePolicy>,
    /// TLS connector that accepts any certificate, when insecure.
    insecure_tls: Option<TlsConnector>,
    /// Runtime for connection work.
    executor: Handle,
    /// Host cookie jar.
    cookie_store: Option<Arc<dyn CookieStore>>,
    /// Live connections.
    connections: ConnectionRegistry,
}

/// WebSocket client built on `tokio-tungstenite`.
///
/// # Example
///
/// ```ignore
/// let client = WebSocketClient::new(ClientOptions::new(Handle::current()))?;
/// client.start()?;
///
/// let session = client.connect(handler, Url::parse("ws://127.0.0.1:8080/")?).await?;
/// session.send_text("hello")?;
/// ```
pub struct WebSocketClient {
    inner: Arc<ClientInner>,
}

impl fmt::Debug for WebSocketClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebSocketClient")
            .field("running", &self.is_running())
            .field("insecure", &self.inner.insecure_tls.is_some())
            .field("connection_count", &self.connection_count())
            .finish_non_exhaustive()
    }
}

impl WebSocketClient {
    /// Creates a stopped client.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Tls`] if the insecure TLS connector cannot be built.
    pub fn new(options: ClientOptions) -> Result<Self> {
        let insecure_tls = if options.use_insecure_transport {
            Some(
                TlsConnector::builder()
                    .danger_accept_invalid_certs(true)
                    .danger_accept_invalid_hostnames(true)
                    .build()?,
            )
        } else {
            None
        };

        Ok(Self {
            inner: Arc::new(ClientInner {
                running: AtomicBool::new(false),
                released: AtomicBool::new(false),
                policy: RwLock::new(MessagePolicy::default()),
                insecure_tls,
                executor: options.executor,
                cookie_store: options.cookie_store,
                connections: ConnectionRegistry::default(),
            }),
        })
    }

    /// Returns `true` between `start()` and `stop()`.
    #[inline]
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.inner.running.load(Ordering::Acquire)
    }

    /// Returns `true` if the client skips certificate validation.
    #[inline]
    #[must_use]
    pub fn is_insecure(&self) -> bool {
        self.inner.insecure_tls.is_some()
    }

    /// Returns the number of live connections.
    #[inline]
    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.inner.connections.lock().len()
    }
}

impl Transport for WebSocketClient {
    fn start(&self) -> Result<()> {
        if self.inner.released.load(Ordering::Acquire) {
            return Err(Error::lifecycle("client has been released"));
        }
        if !self.inner.running.swap(true, Ordering::AcqRel) {
            info!(insecure = self.is_insecure(), "WebSocket client started");
        }
        Ok(())
    }

    fn stop(&self) -> Result<()> {
        // Flipped under the registry lock so a finishing handshake either
        // registers before the drain or sees the client stopped
        let connections: Vec<_> = {
            let mut map = self.inner.connections.lock();
            if !self.inner.running.swap(false, Ordering::AcqRel) {
                return Ok(());
            }
            map.drain().map(|(_, connection)| connection).collect()
        };

        for connection in &connections {
            connection.close();
            debug!(
                id = %connection.id(),
                url = %connection.url(),
                "Connection closed during stop"
            );
        }

        info!(closed = connections.len(), "WebSocket client stopped");
        Ok(())
    }

    fn release(&self) {
        if !self.inner.released.swap(true, Ordering::AcqRel) {
            self.inner.connections.lock().clear();
            debug!("WebSocket client released");
        }
    }

    fn connect(&self, handler: Arc<dyn TransportHandler>, url: Url) -> ConnectFuture {
        let inner = Arc::clone(&self.inner);
        Box::pin(async move { inner.open(handler, url).await })
    }

    fn policy(&self) -> MessagePolicy {
        *self.inner.policy.read()
    }

    fn set_policy(&self, policy: MessagePolicy) {
        *self.inner.policy.write() = policy;
    }
}

// ============================================================================
// ClientInner - Handshake
// ============================================================================

impl ClientInner {
    /// Performs the handshake and hands the socket to a [`Connection`].
    async fn open(
        self: Arc<Self>,
        handler: Arc<dyn TransportHandler>,
        url: Url,
    ) -> Result<SessionHandle> {
        if !self.running.load(Ordering::Acquire) {
            return Err(Error::NotStarted);
        }

        let policy = *self.policy.read();
        let mut request = url.as_str().into_client_request()?;

        if let Some(store) = &self.cookie_store
            && let Some(cookie) = store.cookie_header(&url)
        {
            let value = HeaderValue::from_str(&cookie)
                .map_err(|e| Error::connect(format!("Invalid cookie header: {e}")))?;
            request.headers_mut().insert(COOKIE, value);
        }

        let connector = self.insecure_tls.clone().map(Connector::NativeTls);

        debug!(url = %url, "Starting WebSocket handshake");

        let (ws_stream, response) =
            connect_async_tls_with_config(request, Some(policy.to_ws_config()), false, connector)
                .await?;

        if let Some(store) = &self.cookie_store {
            for header in response.headers().get_all(SET_COOKIE) {
                match header.to_str() {
                    Ok(value) => store.store_set_cookie(&url, value),
                    Err(e) => warn!(error = %e, "Ignoring non-ASCII Set-Cookie header"),
                }
            }
        }

        let status = response.status();

        // Fails if stop() ran while the handshake was in flight
        let connection = Connection::open(
            ws_stream,
            url.clone(),
            handler,
            policy,
            &self.connections,
            &self.running,
            &self.executor,
        )?;

        info!(url = %url, status = %status, "WebSocket connected");

        Ok(connection as SessionHandle)
    }
}

// ============================================================================
// Tests
// ============================================================================
