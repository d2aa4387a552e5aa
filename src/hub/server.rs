//! The hub server: accept loop, supervisor and teardown.

use std::net::SocketAddr;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::admission::AdmissionController;
use crate::codec::TransformChain;
use crate::config::{AcceptConfig, DispatcherConfig, HubOptions, MonitorConfig};
use crate::error::HubError;
use crate::events::EventSink;
use crate::net::listener::{bind, configure_stream};
use crate::net::Endpoint;
use crate::observability::metrics;
use crate::resilience::backoff::calculate_backoff;
use crate::session::dispatcher::DispatchError;
use crate::session::signal::{self, SessionSignal, SignalReceiver, SignalSender};
use crate::session::{
    ConnectionMonitor, ConnectionRegistry, MessageDispatcher, Session, SessionId,
};

/// State shared by the accept task, the supervisor task and the public API.
pub(crate) struct HubShared {
    registry: ConnectionRegistry,
    admission: AdmissionController,
    events: Arc<dyn EventSink>,
    chain: Arc<TransformChain>,
    monitor: MonitorConfig,
    dispatcher: DispatcherConfig,
    accept: AcceptConfig,
    signals: SignalSender,
}

impl HubShared {
    pub(crate) fn new(
        chain: TransformChain,
        events: Arc<dyn EventSink>,
        options: HubOptions,
        monitor: MonitorConfig,
        dispatcher: DispatcherConfig,
        accept: AcceptConfig,
    ) -> (Arc<Self>, SignalReceiver) {
        let (signals, receiver) = signal::channel(dispatcher.signal_capacity);
        let shared = Arc::new(Self {
            registry: ConnectionRegistry::new(),
            admission: AdmissionController::new(options.allowed_connections),
            events,
            chain: Arc::new(chain),
            monitor,
            dispatcher,
            accept,
            signals,
        });
        (shared, receiver)
    }

    /// Run one accepted socket through admission and registration.
    fn handle_accepted(&self, stream: TcpStream, endpoint: Endpoint) -> Result<(), HubError> {
        self.emit("client_connected", |events| events.client_connected(endpoint));

        if !self.admission.try_admit() {
            metrics::record_connection("rejected");
            tracing::debug!(
                endpoint = %endpoint,
                ceiling = self.admission.ceiling(),
                "Connection rejected, hub is full"
            );
            drop(stream);
            self.emit("client_rejected", |events| events.client_rejected(endpoint));
            return Ok(());
        }

        if let Err(e) = configure_stream(&stream) {
            self.admission.release();
            return Err(e);
        }

        let id = SessionId::new();
        let (reader, writer) = stream.into_split();
        let monitor =
            ConnectionMonitor::new(endpoint, id, writer, &self.monitor, self.signals.clone());
        let dispatcher = MessageDispatcher::new(
            endpoint,
            id,
            reader,
            Arc::clone(&self.chain),
            &self.dispatcher,
            self.signals.clone(),
        );
        let session = Session::new(id, monitor.handle(), dispatcher.handle());

        if !self.registry.try_add(endpoint, session) {
            // The new workers are dropped unstarted, which closes only the new
            // socket. The registered session keeps running.
            self.admission.release();
            metrics::record_connection("duplicate");
            tracing::warn!(endpoint = %endpoint, "Endpoint already registered, connection dropped");
            return Ok(());
        }

        metrics::record_connection("accepted");
        metrics::record_active_connections(self.admission.count());
        tracing::info!(endpoint = %endpoint, session = %id, "Session registered");
        self.emit("client_accepted", |events| events.client_accepted(endpoint));

        monitor.start();
        dispatcher.start();
        Ok(())
    }

    fn handle_signal(&self, signal: SessionSignal) {
        match signal {
            SessionSignal::StatusChanged {
                endpoint,
                session,
                state,
            } => {
                tracing::trace!(endpoint = %endpoint, session = %session, state = %state, "Status changed");
                if state.is_terminal() {
                    self.teardown(endpoint, Some(session), "monitor_closed");
                }
            }
            SessionSignal::Message { session, message } => {
                if !self.registry.is_current(&message.sender, session) {
                    tracing::trace!(endpoint = %message.sender, "Message from ended session dropped");
                    return;
                }
                metrics::record_message(message.payload.len());
                self.emit("message_received", |events| events.message_received(message));
            }
            SessionSignal::DispatchFailed {
                endpoint,
                session,
                error,
            } => {
                match &error {
                    DispatchError::PeerClosed => {
                        tracing::debug!(endpoint = %endpoint, "Peer closed the connection")
                    }
                    other => tracing::warn!(endpoint = %endpoint, error = %other, "Dispatch failed"),
                }
                self.teardown(endpoint, Some(session), error.cause());
            }
        }
    }

    /// Remove a session and stop its workers.
    ///
    /// With `Some(id)` only that session is removed; with `None` whatever is
    /// registered under `endpoint`. Returns false when there was nothing to
    /// remove, so every path may call this freely.
    pub(crate) fn teardown(
        &self,
        endpoint: Endpoint,
        session: Option<SessionId>,
        cause: &'static str,
    ) -> bool {
        let removed = match session {
            Some(id) => self.registry.try_remove_session(&endpoint, id),
            None => self.registry.try_remove(&endpoint),
        };
        let Some(session) = removed else {
            return false;
        };

        session.cancel();
        let live = self.admission.release();

        metrics::record_disconnect(cause);
        metrics::record_active_connections(live);
        tracing::info!(endpoint = %endpoint, session = %session.id(), cause, "Session ended");
        self.emit("client_disconnected", |events| events.client_disconnected(endpoint));
        true
    }

    fn report_fault(&self, endpoint: Option<Endpoint>, error: HubError) {
        metrics::record_fault(error.kind());
        match endpoint {
            Some(endpoint) => tracing::warn!(endpoint = %endpoint, error = %error, "Connection fault"),
            None => tracing::warn!(error = %error, "Connection fault"),
        }
        self.emit("connection_fault", |events| {
            events.connection_fault(endpoint, &error)
        });
    }

    /// Call the event sink, containing any panic it raises.
    fn emit(&self, event: &'static str, call: impl FnOnce(&dyn EventSink)) {
        let events = self.events.as_ref();
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| call(events))) {
            tracing::error!(event, panic = %panic_message(payload.as_ref()), "Event sink panicked");
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

async fn accept_loop(shared: Arc<HubShared>, listener: TcpListener, cancel: CancellationToken) {
    let mut failures: u32 = 0;

    loop {
        let accepted = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            accepted = listener.accept() => accepted,
        };

        match accepted {
            Ok((stream, addr)) => {
                failures = 0;
                let endpoint = Endpoint::from(addr);
                let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                    shared.handle_accepted(stream, endpoint)
                }));
                match outcome {
                    Ok(Ok(())) => {}
                    Ok(Err(error)) => shared.report_fault(Some(endpoint), error),
                    Err(payload) => shared.report_fault(
                        Some(endpoint),
                        HubError::Panicked(panic_message(payload.as_ref())),
                    ),
                }
            }
            Err(e) => {
                failures = failures.saturating_add(1);
                shared.report_fault(None, HubError::Accept(e));

                let delay = calculate_backoff(
                    failures,
                    shared.accept.error_backoff_base_ms,
                    shared.accept.error_backoff_max_ms,
                );
                tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
        }
    }

    tracing::info!("Accept loop stopped");
}

async fn supervise(shared: Arc<HubShared>, mut signals: SignalReceiver, cancel: CancellationToken) {
    loop {
        let signal = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            signal = signals.recv() => match signal {
                Some(signal) => signal,
                None => break,
            },
        };
        shared.handle_signal(signal);
    }
    tracing::debug!("Supervisor stopped");
}

enum ServerState {
    Stopped,
    Listening {
        local_addr: SocketAddr,
        cancel: CancellationToken,
        task: JoinHandle<()>,
    },
}

/// A TCP hub: admits clients up to a ceiling and surfaces their messages.
///
/// ```text
/// Stopped ──start()──▶ Listening ──stop()──▶ Stopped
/// ```
///
/// `stop` only closes the listener. Established sessions keep running until
/// they end on their own or are removed with [`HubServer::disconnect`],
/// [`HubServer::disconnect_all`] or [`HubServer::shutdown`].
pub struct HubServer {
    bind_address: String,
    shared: Arc<HubShared>,
    state: Mutex<ServerState>,
    pending_signals: Mutex<Option<SignalReceiver>>,
    supervisor: CancellationToken,
}

impl HubServer {
    pub(crate) fn new(
        bind_address: String,
        shared: Arc<HubShared>,
        signals: SignalReceiver,
    ) -> Self {
        Self {
            bind_address,
            shared,
            state: Mutex::new(ServerState::Stopped),
            pending_signals: Mutex::new(Some(signals)),
            supervisor: CancellationToken::new(),
        }
    }

    /// Bind the listener and start accepting. Returns the bound address.
    pub async fn start(&self) -> Result<SocketAddr, HubError> {
        if let Some(addr) = self.local_addr() {
            return Err(HubError::AlreadyRunning(addr));
        }

        let listener = bind(&self.bind_address).await?;
        let local_addr = listener.local_addr().map_err(HubError::Socket)?;

        let mut state = self.state.lock();
        if let ServerState::Listening { local_addr, .. } = &*state {
            return Err(HubError::AlreadyRunning(*local_addr));
        }

        if let Some(signals) = self.pending_signals.lock().take() {
            tokio::spawn(
                supervise(Arc::clone(&self.shared), signals, self.supervisor.clone())
                    .instrument(tracing::info_span!("supervisor")),
            );
        }

        let cancel = CancellationToken::new();
        let task = tokio::spawn(
            accept_loop(Arc::clone(&self.shared), listener, cancel.clone())
                .instrument(tracing::info_span!("accept", address = %local_addr)),
        );
        *state = ServerState::Listening {
            local_addr,
            cancel,
            task,
        };

        tracing::info!(address = %local_addr, "Hub server listening");
        Ok(local_addr)
    }

    /// Close the listener and wait for the accept loop to exit. Sessions are
    /// left running. No-op when not listening.
    pub async fn stop(&self) {
        let previous = std::mem::replace(&mut *self.state.lock(), ServerState::Stopped);
        let ServerState::Listening {
            local_addr,
            cancel,
            task,
        } = previous
        else {
            return;
        };

        cancel.cancel();
        if let Err(e) = task.await {
            tracing::error!(error = %e, "Accept loop ended abnormally");
        }
        tracing::info!(address = %local_addr, "Hub server stopped");
    }

    /// Tear down the session registered under `endpoint`, if any.
    pub fn disconnect(&self, endpoint: Endpoint) -> bool {
        self.shared.teardown(endpoint, None, "disconnect")
    }

    /// Tear down every session. Returns how many were removed.
    pub fn disconnect_all(&self) -> usize {
        self.shared
            .registry
            .endpoints()
            .into_iter()
            .filter(|endpoint| self.disconnect(*endpoint))
            .count()
    }

    /// Stop listening, then disconnect every session.
    pub async fn shutdown(&self) {
        self.stop().await;
        let removed = self.disconnect_all();
        tracing::info!(sessions = removed, "Hub server shut down");
    }

    /// Number of admitted connections.
    pub fn count(&self) -> usize {
        self.shared.admission.count()
    }

    pub fn allowed_connections(&self) -> usize {
        self.shared.admission.ceiling()
    }

    /// Change the admission ceiling. Existing sessions are never evicted.
    pub fn set_allowed_connections(&self, allowed_connections: usize) {
        self.shared.admission.set_ceiling(allowed_connections);
    }

    /// Address the listener is bound to, while listening.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &*self.state.lock() {
            ServerState::Listening { local_addr, .. } => Some(*local_addr),
            ServerState::Stopped => None,
        }
    }

    pub fn is_listening(&self) -> bool {
        self.local_addr().is_some()
    }

    /// Endpoints with a registered session.
    pub fn endpoints(&self) -> Vec<Endpoint> {
        self.shared.registry.endpoints()
    }
}

impl std::fmt::Debug for HubServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubServer")
            .field("bind_address", &self.bind_address)
            .field("local_addr", &self.local_addr())
            .field("count", &self.count())
            .field("allowed_connections", &self.allowed_connections())
            .finish()
    }
}

impl Drop for HubServer {
    fn drop(&mut self) {
        if let ServerState::Listening { cancel, .. } = &*self.state.lock() {
            cancel.cancel();
        }
        self.supervisor.cancel();
        self.disconnect_all();
    }
}
