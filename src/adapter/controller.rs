//! Connection controller.
//!
//! [`ConnectionController`] owns one transport client, starts and stops it,
//! schedules connects on the host's executor and routes sends to the open
//! session.
//!
//! # Example
//!
//! ```no_run
//! use websocket_adapter::{ConnectionController, ConnectionEvent, EventChannel};
//!
//! # async fn example() -> websocket_adapter::Result<()> {
//! let (events, mut rx) = EventChannel::new();
//! let controller = ConnectionController::builder().dispatcher(events).build()?;
//!
//! controller.start()?;
//! controller.connect("ws://127.0.0.1:9000/")?;
//!
//! while let Some(event) = rx.recv().await {
//!     if let ConnectionEvent::Connected = event {
//!         controller.send("hello")?;
//!     }
//!     if event.is_terminal() {
//!         break;
//!     }
//! }
//!
//! controller.close_client()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tokio::runtime::Handle;
use tracing::{debug, info, trace};
use url::Url;

use crate::error::{Error, Result};
use crate::protocol::{EventDispatcher, Message};
use crate::transport::{MessagePolicy, Transport};

use super::builder::ControllerBuilder;
use super::listener::SessionListener;
use super::state::SessionState;
use super::task::AsyncConnectTask;

// ============================================================================
// ConnectionController
// ============================================================================

/// Adapter between a host and a WebSocket transport client.
///
/// All methods take `&self`; share the controller with `Arc` to call it
/// from several threads.
pub struct ConnectionController {
    /// Serializes `start()` against `close_client()`.
    lifecycle: Mutex<()>,
    /// Transport client. `None` once `close_client()` has run.
    client: RwLock<Option<Arc<dyn Transport>>>,
    /// Incoming and outgoing session handles.
    state: Arc<SessionState>,
    /// Host callbacks.
    dispatcher: Arc<dyn EventDispatcher>,
    /// Runtime for connect tasks.
    executor: Handle,
}

impl fmt::Debug for ConnectionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionController")
            .field("client_closed", &self.is_client_closed())
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// ConnectionController - Construction
// ============================================================================

impl ConnectionController {
    /// Creates a configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> ControllerBuilder {
        ControllerBuilder::new()
    }

    pub(crate) fn new(
        client: Arc<dyn Transport>,
        dispatcher: Arc<dyn EventDispatcher>,
        executor: Handle,
    ) -> Self {
        Self {
            lifecycle: Mutex::new(()),
            client: RwLock::new(Some(client)),
            state: Arc::new(SessionState::new()),
            dispatcher,
            executor,
        }
    }
}

// ============================================================================
// ConnectionController - Lifecycle
// ============================================================================

impl ConnectionController {
    /// Starts the transport client, blocking until it is ready.
    ///
    /// # Errors
    ///
    /// - [`Error::ClientClosed`] after [`close_client()`](Self::close_client)
    /// - Any error the transport's start returns
    pub fn start(&self) -> Result<()> {
        let _guard = self.lifecycle.lock();
        let client = self.client()?;

        client.start()?;
        info!("Client started");
        Ok(())
    }

    /// Stops and releases the transport client.
    ///
    /// Calling this again after it succeeded is a no-op.
    ///
    /// # Errors
    ///
    /// Any error the transport's stop returns. The client is kept in that
    /// case and the call may be retried.
    pub fn close_client(&self) -> Result<()> {
        let _guard = self.lifecycle.lock();
        let Some(client) = self.client.read().clone() else {
            debug!("Client already closed");
            return Ok(());
        };

        client.stop()?;
        client.release();
        *self.client.write() = None;

        info!("Client closed");
        Ok(())
    }

    /// Returns `true` once [`close_client()`](Self::close_client) has run.
    #[inline]
    #[must_use]
    pub fn is_client_closed(&self) -> bool {
        self.client.read().is_none()
    }

    fn client(&self) -> Result<Arc<dyn Transport>> {
        self.client.read().clone().ok_or(Error::ClientClosed)
    }
}

// ============================================================================
// ConnectionController - Connect
// ============================================================================

impl ConnectionController {
    /// Opens a connection to `url` in the background.
    ///
    /// Returns as soon as the attempt is scheduled. Its outcome arrives
    /// through the dispatcher: `on_connecting`, then `on_connect` or
    /// `on_error`.
    ///
    /// # Errors
    ///
    /// - [`Error::Url`] if `url` does not parse
    /// - [`Error::ClientClosed`] after [`close_client()`](Self::close_client)
    pub fn connect(&self, url: &str) -> Result<()> {
        let url = Url::parse(url)?;
        let client = self.client()?;

        let listener = Arc::new(SessionListener::new(
            url.clone(),
            Arc::clone(&self.state),
            Arc::clone(&self.dispatcher),
        ));
        let future = client.connect(listener, url.clone());

        debug!(url = %url, "Connect scheduled");

        let task = AsyncConnectTask::new(
            url,
            future,
            Arc::clone(&self.state),
            Arc::clone(&self.dispatcher),
        );
        self.executor.spawn(task.run());
        Ok(())
    }
}

// ============================================================================
// ConnectionController - Sessions
// ============================================================================

impl ConnectionController {
    /// Sends a message on the outgoing session.
    ///
    /// Strings become text frames and byte buffers binary frames. A
    /// [`serde_json::Value`] is accepted if it is a string or an array of
    /// bytes.
    ///
    /// # Errors
    ///
    /// - [`Error::UnsupportedPayload`] if the payload is neither text nor binary
    /// - [`Error::NoSession`] if no connection is open
    /// - [`Error::ConnectionClosed`] if the session closed meanwhile
    pub fn send<M>(&self, message: M) -> Result<()>
    where
        M: TryInto<Message>,
        Error: From<M::Error>,
    {
        let message = message.try_into()?;
        let session = self.state.outgoing().ok_or(Error::NoSession)?;

        trace!(kind = message.kind(), len = message.len(), "Sending message");

        match &message {
            Message::Text(body) => session.send_text(body),
            Message::Binary(bytes) => session.send_binary(bytes),
        }
    }

    /// Closes the session the last connect resolved to, if any.
    pub fn close_incoming_session(&self) {
        if let Some(session) = self.state.incoming() {
            debug!("Closing incoming session");
            session.close();
        }
    }

    /// Closes the open connection, if any.
    pub fn close_outgoing_session(&self) {
        if let Some(session) = self.state.outgoing() {
            debug!("Closing outgoing session");
            session.close();
        }
    }

    /// Returns `true` while a connection is open.
    #[inline]
    #[must_use]
    pub fn has_outgoing_session(&self) -> bool {
        self.state.has_outgoing()
    }

    /// Returns `true` once any connect has resolved.
    #[inline]
    #[must_use]
    pub fn has_incoming_session(&self) -> bool {
        self.state.has_incoming()
    }

    /// Returns the shared session handles.
    #[inline]
    #[must_use]
    pub fn session_state(&self) -> &Arc<SessionState> {
        &self.state
    }

    /// Returns the transport's message policy, or `None` once closed.
    #[must_use]
    pub fn policy(&self) -> Option<MessagePolicy> {
        self.client.read().as_ref().map(|client| client.policy())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::OnceLock;
    use std::time::Duration;

    use serde_json::json;
    use tokio::sync::mpsc;

    use crate::protocol::{ConnectionEvent, EventChannel};
    use crate::transport::mock::{MockTransport, spawn_echo_server};

    /// Records whether an outgoing session existed when each event fired.
    struct Probe {
        state: OnceLock<Arc<SessionState>>,
        seen: Mutex<Vec<(&'static str, bool)>>,
        incoming_at_connect: Mutex<Option<bool>>,
        events: EventChannel,
    }

    impl Probe {
        fn new(events: EventChannel) -> Arc<Self> {
            Arc::new(Self {
                state: OnceLock::new(),
                seen: Mutex::new(Vec::new()),
                incoming_at_connect: Mutex::new(None),
                events,
            })
        }

        fn attach(&self, controller: &ConnectionController) {
            let _ = self.state.set(Arc::clone(controller.session_state()));
        }

        fn record(&self, event: ConnectionEvent) {
            let outgoing = self.state.get().is_some_and(|state| state.has_outgoing());
            if let ConnectionEvent::Connected = event {
                *self.incoming_at_connect.lock() =
                    self.state.get().map(|state| state.has_incoming());
            }
            self.seen.lock().push((event.name(), outgoing));
            match event {
                ConnectionEvent::Connecting => self.events.on_connecting(),
                ConnectionEvent::Connected => self.events.on_connect(),
                ConnectionEvent::Closed { code, reason } => self.events.on_close(code, &reason),
                ConnectionEvent::Text { body } => self.events.on_text(&body),
                ConnectionEvent::Binary {
                    bytes,
                    offset,
                    length,
                } => self.events.on_binary(&bytes, offset, length),
                ConnectionEvent::Error { cause } => self.events.on_error(cause),
            }
        }

        fn seen(&self) -> Vec<(&'static str, bool)> {
            self.seen.lock().clone()
        }
    }

    impl EventDispatcher for Probe {
        fn on_connecting(&self) {
            self.record(ConnectionEvent::Connecting);
        }

        fn on_connect(&self) {
            self.record(ConnectionEvent::Connected);
        }

        fn on_close(&self, code: u16, reason: &str) {
            self.record(ConnectionEvent::Closed {
                code,
                reason: reason.to_string(),
            });
        }

        fn on_text(&self, message: &str) {
            self.record(ConnectionEvent::Text {
                body: message.to_string(),
            });
        }

        fn on_binary(&self, data: &[u8], offset: usize, length: usize) {
            self.record(ConnectionEvent::Binary {
                bytes: data.to_vec(),
                offset,
                length,
            });
        }

        fn on_error(&self, cause: Error) {
            self.record(ConnectionEvent::Error { cause });
        }
    }

    struct Fixture {
        controller: ConnectionController,
        transport: Arc<MockTransport>,
        probe: Arc<Probe>,
        rx: mpsc::UnboundedReceiver<ConnectionEvent>,
    }

    fn fixture() -> Fixture {
        let transport = MockTransport::new();
        let (events, rx) = EventChannel::new();
        let probe = Probe::new(events);

        let controller = ConnectionController::builder()
            .transport(Arc::clone(&transport) as Arc<dyn Transport>)
            .dispatcher_arc(Arc::clone(&probe) as Arc<dyn EventDispatcher>)
            .build()
            .expect("build");
        probe.attach(&controller);

        Fixture {
            controller,
            transport,
            probe,
            rx,
        }
    }

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<ConnectionEvent>) -> ConnectionEvent {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("event timeout")
            .expect("channel closed")
    }

    /// Starts, connects and accepts the first attempt.
    async fn connected(fx: &mut Fixture) -> Arc<crate::transport::mock::MockSession> {
        fx.controller.start().expect("start");
        fx.controller.connect("ws://localhost/socket").expect("connect");
        assert!(matches!(next_event(&mut fx.rx).await, ConnectionEvent::Connecting));

        let session = fx.transport.accept(0);
        assert!(matches!(next_event(&mut fx.rx).await, ConnectionEvent::Connected));
        session
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_start_delegates_to_transport() {
        let fx = fixture();
        fx.controller.start().expect("start");
        assert!(fx.transport.is_running());
    }

    #[tokio::test]
    async fn test_start_failure_propagates() {
        let fx = fixture();
        fx.transport.fail_start();

        let err = fx.controller.start().unwrap_err();
        assert!(err.is_lifecycle_error());
        assert!(!fx.controller.is_client_closed());
    }

    #[tokio::test]
    async fn test_close_client_twice() {
        let fx = fixture();
        fx.controller.start().expect("start");

        fx.controller.close_client().expect("first close");
        fx.controller.close_client().expect("second close");

        assert!(fx.controller.is_client_closed());
        assert!(fx.transport.is_released());
        assert_eq!(
            fx.transport.stop_calls.load(std::sync::atomic::Ordering::SeqCst),
            1
        );
        assert!(fx.controller.policy().is_none());
    }

    #[tokio::test]
    async fn test_start_after_close_fails() {
        let fx = fixture();
        fx.controller.close_client().expect("close");

        let err = fx.controller.start().unwrap_err();
        assert!(matches!(err, Error::ClientClosed));
    }

    #[test]
    fn test_concurrent_start_and_close() {
        let runtime = tokio::runtime::Runtime::new().expect("runtime");
        let transport = MockTransport::new();
        let (events, _rx) = EventChannel::new();
        let controller = Arc::new(
            ConnectionController::builder()
                .executor(runtime.handle().clone())
                .transport(Arc::clone(&transport) as Arc<dyn Transport>)
                .dispatcher(events)
                .build()
                .expect("build"),
        );

        let workers: Vec<_> = (0..8)
            .map(|_| {
                let controller = Arc::clone(&controller);
                std::thread::spawn(move || {
                    for _ in 0..50 {
                        if let Err(e) = controller.start() {
                            assert!(e.is_lifecycle_error(), "unexpected: {e}");
                        }
                        if let Err(e) = controller.close_client() {
                            assert!(e.is_lifecycle_error(), "unexpected: {e}");
                        }
                    }
                })
            })
            .collect();

        for worker in workers {
            worker.join().expect("worker");
        }

        assert!(controller.is_client_closed());
        assert!(transport.is_released());
        assert!(!transport.is_running());
    }

    // ------------------------------------------------------------------------
    // Connect
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_connect_returns_before_outcome() {
        let mut fx = fixture();
        fx.controller.start().expect("start");
        fx.controller.connect("ws://localhost/socket").expect("connect");

        assert_eq!(fx.transport.attempt_count(), 1);
        assert!(fx.rx.try_recv().is_err());
        assert!(!fx.controller.has_outgoing_session());

        assert!(matches!(next_event(&mut fx.rx).await, ConnectionEvent::Connecting));
        fx.transport.accept(0);
        assert!(matches!(next_event(&mut fx.rx).await, ConnectionEvent::Connected));
    }

    #[tokio::test]
    async fn test_connect_publishes_both_sessions() {
        let mut fx = fixture();
        let _session = connected(&mut fx).await;

        assert!(fx.controller.has_outgoing_session());
        tokio::time::timeout(Duration::from_secs(5), async {
            while !fx.controller.has_incoming_session() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("incoming session");
    }

    #[tokio::test]
    async fn test_connect_failure_emits_error() {
        let mut fx = fixture();
        fx.controller.start().expect("start");
        fx.controller.connect("ws://localhost/socket").expect("connect");
        assert!(matches!(next_event(&mut fx.rx).await, ConnectionEvent::Connecting));

        fx.transport.reject(0, Error::connect("refused"));

        match next_event(&mut fx.rx).await {
            ConnectionEvent::Error { cause } => assert!(cause.is_connection_error()),
            other => panic!("expected error event, got {other:?}"),
        }
        assert!(!fx.controller.has_outgoing_session());
        assert!(!fx.controller.has_incoming_session());
    }

    #[tokio::test]
    async fn test_connect_invalid_url() {
        let fx = fixture();
        let err = fx.controller.connect("not a url").unwrap_err();
        assert!(matches!(err, Error::Url(_)));
        assert_eq!(fx.transport.attempt_count(), 0);
    }

    #[tokio::test]
    async fn test_connect_after_close_fails() {
        let fx = fixture();
        fx.controller.close_client().expect("close");

        let err = fx.controller.connect("ws://localhost/").unwrap_err();
        assert!(matches!(err, Error::ClientClosed));
        assert_eq!(fx.transport.attempt_count(), 0);
    }

    // ------------------------------------------------------------------------
    // Send
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_send_before_connect_fails() {
        let fx = fixture();
        fx.controller.start().expect("start");

        let err = fx.controller.send("hi").unwrap_err();
        assert!(matches!(err, Error::NoSession));
        assert!(err.is_send_error());
    }

    #[tokio::test]
    async fn test_send_routes_by_payload() {
        let mut fx = fixture();
        let session = connected(&mut fx).await;

        fx.controller.send("hi").expect("text");
        fx.controller.send(vec![1u8, 2, 3]).expect("binary");
        fx.controller.send(json!("from json")).expect("json text");

        assert_eq!(
            session.sent(),
            vec![
                Message::text("hi"),
                Message::binary(vec![1, 2, 3]),
                Message::text("from json"),
            ]
        );
    }

    #[tokio::test]
    async fn test_send_unsupported_payload() {
        let mut fx = fixture();
        let session = connected(&mut fx).await;

        let err = fx.controller.send(json!(42)).unwrap_err();
        assert!(matches!(err, Error::UnsupportedPayload { .. }));
        assert!(session.sent().is_empty());
    }

    // ------------------------------------------------------------------------
    // Callbacks
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_messages_forwarded() {
        let mut fx = fixture();
        let _session = connected(&mut fx).await;
        let handler = fx.transport.handler(0);

        handler.on_text("hello");
        handler.on_binary(&[0, 1, 2, 3], 1, 2);

        match next_event(&mut fx.rx).await {
            ConnectionEvent::Text { body } => assert_eq!(body, "hello"),
            other => panic!("expected text, got {other:?}"),
        }
        let binary = next_event(&mut fx.rx).await;
        assert_eq!(binary.payload(), Some(&[1u8, 2][..]));
    }

    #[tokio::test]
    async fn test_outgoing_cleared_before_close() {
        let mut fx = fixture();
        let _session = connected(&mut fx).await;

        fx.transport.handler(0).on_close(1000, "bye");
        assert!(matches!(
            next_event(&mut fx.rx).await,
            ConnectionEvent::Closed { code: 1000, .. }
        ));

        assert_eq!(
            fx.probe.seen(),
            vec![("connecting", false), ("connected", true), ("closed", false)]
        );
        assert!(matches!(fx.controller.send("late"), Err(Error::NoSession)));
    }

    #[tokio::test]
    async fn test_outgoing_cleared_before_error() {
        let mut fx = fixture();
        let _session = connected(&mut fx).await;

        fx.transport.handler(0).on_error(Error::ConnectionClosed);
        assert!(matches!(
            next_event(&mut fx.rx).await,
            ConnectionEvent::Error { .. }
        ));

        assert_eq!(fx.probe.seen().last(), Some(&("error", false)));
        assert!(!fx.controller.has_outgoing_session());
    }

    #[tokio::test]
    async fn test_stale_close_keeps_newer_outgoing() {
        let mut fx = fixture();
        let _first = connected(&mut fx).await;

        fx.controller.connect("ws://localhost/second").expect("connect");
        assert!(matches!(next_event(&mut fx.rx).await, ConnectionEvent::Connecting));
        let second = fx.transport.accept(1);
        assert!(matches!(next_event(&mut fx.rx).await, ConnectionEvent::Connected));

        fx.transport.handler(0).on_close(1000, "");
        let _ = next_event(&mut fx.rx).await;

        assert!(fx.controller.has_outgoing_session());
        fx.controller.send("still open").expect("send");
        assert_eq!(second.sent(), vec![Message::text("still open")]);
    }

    // ------------------------------------------------------------------------
    // Session close
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_close_outgoing_session() {
        let mut fx = fixture();
        let session = connected(&mut fx).await;

        fx.controller.close_outgoing_session();
        assert!(session.is_closed());
    }

    #[tokio::test]
    async fn test_close_sessions_without_connect_is_noop() {
        let fx = fixture();
        fx.controller.close_incoming_session();
        fx.controller.close_outgoing_session();
        assert!(!fx.controller.has_outgoing_session());
    }

    #[tokio::test]
    async fn test_close_incoming_leaves_outgoing() {
        let mut fx = fixture();
        let session = connected(&mut fx).await;

        tokio::time::timeout(Duration::from_secs(5), async {
            while !fx.controller.has_incoming_session() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("incoming session");

        fx.controller.close_incoming_session();
        assert!(session.is_closed());
        assert!(fx.controller.has_outgoing_session());
    }

    // ------------------------------------------------------------------------
    // Policy
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_policy_reports_limits() {
        let transport = MockTransport::new();
        let (events, _rx) = EventChannel::new();
        let controller = ConnectionController::builder()
            .transport(Arc::clone(&transport) as Arc<dyn Transport>)
            .max_binary_message_size(4096)
            .max_text_message_size(0)
            .dispatcher(events)
            .build()
            .expect("build");

        let policy = controller.policy().expect("policy");
        assert_eq!(policy.max_binary_message_size, 4096);
        assert_eq!(
            policy.max_text_message_size,
            MessagePolicy::default().max_text_message_size
        );
    }

    // ------------------------------------------------------------------------
    // Loopback
    // ------------------------------------------------------------------------

    /// Controller on the bundled client, connected to a local echo server.
    async fn loopback() -> (
        ConnectionController,
        Arc<Probe>,
        mpsc::UnboundedReceiver<ConnectionEvent>,
    ) {
        let url = spawn_echo_server().await;
        let (events, mut rx) = EventChannel::new();
        let probe = Probe::new(events);

        let controller = ConnectionController::builder()
            .dispatcher_arc(Arc::clone(&probe) as Arc<dyn EventDispatcher>)
            .build()
            .expect("build");
        probe.attach(&controller);

        controller.start().expect("start");
        controller.connect(url.as_str()).expect("connect");
        assert!(matches!(next_event(&mut rx).await, ConnectionEvent::Connecting));
        assert!(matches!(next_event(&mut rx).await, ConnectionEvent::Connected));

        (controller, probe, rx)
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_loopback_connect_then_close_outgoing() {
        let (controller, probe, mut rx) = loopback().await;

        assert_eq!(*probe.incoming_at_connect.lock(), Some(false));
        assert!(controller.has_outgoing_session());

        controller.send("echo me").expect("send");
        match next_event(&mut rx).await {
            ConnectionEvent::Text { body } => assert_eq!(body, "echo me"),
            other => panic!("expected text, got {other:?}"),
        }
        tokio::time::timeout(Duration::from_secs(5), async {
            while !controller.has_incoming_session() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("incoming session");

        controller.close_outgoing_session();
        assert!(matches!(
            next_event(&mut rx).await,
            ConnectionEvent::Closed { code: 1000, .. }
        ));

        assert_eq!(
            probe.seen(),
            vec![
                ("connecting", false),
                ("connected", true),
                ("text", true),
                ("closed", false),
            ]
        );
        assert!(matches!(controller.send("late"), Err(Error::NoSession)));

        controller.close_client().expect("close client");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_loopback_close_client_ends_open_connection() {
        let (controller, probe, mut rx) = loopback().await;

        controller.close_client().expect("close client");

        assert!(next_event(&mut rx).await.is_terminal());
        assert!(controller.is_client_closed());
        assert!(!controller.has_outgoing_session());
        assert_eq!(probe.seen().last().map(|(_, outgoing)| *outgoing), Some(false));
    }
}
