//! Per-connection liveness monitor.
//!
//! # Responsibilities
//! - Own the write half of the connection
//! - Probe the peer with heartbeat frames on a fixed interval
//! - Drive the connection state machine and report every transition
//!
//! # Design Decisions
//! - Active probing: a failed or stalled heartbeat write means the peer is gone
//! - A zero probe interval turns the monitor passive; it then only ends on
//!   cancellation (the dispatcher notices EOF on its own)
//! - Exactly one `Closed` is reported per started monitor, whatever ends it

use std::time::Duration;

use bytes::Bytes;
use futures_util::SinkExt;
use tokio::io::AsyncWrite;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::codec::{FramedWrite, LengthDelimitedCodec};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::signal::{SessionSignal, SignalSender};
use super::state::ConnectionState;
use super::SessionId;
use crate::codec::frame::{frame_codec, heartbeat, DEFAULT_MAX_FRAME_LENGTH};
use crate::config::MonitorConfig;
use crate::net::Endpoint;

/// Upper bound on flushing and shutting down the write half at close.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// Why the watch loop ended.
#[derive(Debug)]
enum CloseCause {
    Cancelled,
    ProbeFailed(std::io::Error),
    ProbeTimedOut,
}

/// Cancellation and state view of a monitor, kept in the registry.
#[derive(Debug, Clone)]
pub struct MonitorHandle {
    cancel: CancellationToken,
    state: watch::Receiver<ConnectionState>,
}

impl MonitorHandle {
    /// Ask the monitor to stop. Idempotent; safe before `start`.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Latest state published by the monitor.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    #[cfg(test)]
    pub(crate) fn detached() -> Self {
        let (_tx, state) = watch::channel(ConnectionState::Connecting);
        Self {
            cancel: CancellationToken::new(),
            state,
        }
    }
}

/// Liveness monitor for one connection.
pub struct ConnectionMonitor<W> {
    endpoint: Endpoint,
    session: SessionId,
    writer: FramedWrite<W, LengthDelimitedCodec>,
    probe_interval: Option<Duration>,
    probe_timeout: Duration,
    state: watch::Sender<ConnectionState>,
    cancel: CancellationToken,
    signals: SignalSender,
}

impl<W> ConnectionMonitor<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(
        endpoint: Endpoint,
        session: SessionId,
        writer: W,
        config: &MonitorConfig,
        signals: SignalSender,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Connecting);
        Self {
            endpoint,
            session,
            writer: FramedWrite::new(writer, frame_codec(DEFAULT_MAX_FRAME_LENGTH)),
            probe_interval: config.probe_interval(),
            probe_timeout: config.probe_timeout(),
            state,
            cancel: CancellationToken::new(),
            signals,
        }
    }

    pub fn handle(&self) -> MonitorHandle {
        MonitorHandle {
            cancel: self.cancel.clone(),
            state: self.state.subscribe(),
        }
    }

    /// Spawn the monitor loop.
    pub fn start(self) -> JoinHandle<()> {
        let span = tracing::info_span!(
            "monitor",
            endpoint = %self.endpoint,
            session = %self.session
        );
        tokio::spawn(self.run().instrument(span))
    }

    async fn run(mut self) {
        self.transition(ConnectionState::Open).await;

        match self.watch().await {
            CloseCause::Cancelled => tracing::debug!("Monitor cancelled"),
            CloseCause::ProbeFailed(e) => tracing::debug!(error = %e, "Heartbeat probe failed"),
            CloseCause::ProbeTimedOut => tracing::debug!(
                timeout_ms = self.probe_timeout.as_millis() as u64,
                "Heartbeat probe timed out"
            ),
        }

        self.transition(ConnectionState::Closing).await;
        // The peer may already be gone; closing is best effort.
        let _ = time::timeout(SHUTDOWN_GRACE, SinkExt::<Bytes>::close(&mut self.writer)).await;
        self.transition(ConnectionState::Closed).await;
    }

    async fn watch(&mut self) -> CloseCause {
        let Some(period) = self.probe_interval else {
            self.cancel.cancelled().await;
            return CloseCause::Cancelled;
        };

        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return CloseCause::Cancelled,
                _ = ticker.tick() => {}
            }

            match time::timeout(self.probe_timeout, self.writer.send(heartbeat())).await {
                Ok(Ok(())) => tracing::trace!("Heartbeat sent"),
                Ok(Err(e)) => return CloseCause::ProbeFailed(e),
                Err(_) => return CloseCause::ProbeTimedOut,
            }
        }
    }

    async fn transition(&mut self, next: ConnectionState) {
        let current = *self.state.borrow();
        if !current.can_transition_to(next) {
            return;
        }
        self.state.send_replace(next);
        tracing::debug!(from = %current, to = %next, "Connection state changed");

        let signal = SessionSignal::StatusChanged {
            endpoint: self.endpoint,
            session: self.session,
            state: next,
        };
        if self.signals.send(signal).await.is_err() {
            tracing::trace!("Hub is gone, status change dropped");
        }
    }
}
