//! Per-connection message dispatcher.
//!
//! # Responsibilities
//! - Own the read half of the connection
//! - Split the byte stream into length-delimited frames
//! - Undo the transform chain and surface each message
//!
//! # Design Decisions
//! - Heartbeat (empty) frames are skipped; data frames carry a kind tag, so an
//!   empty message is still delivered
//! - The first failure of any kind ends the loop; nothing is emitted after it
//! - A failure is reported once; the hub turns it into the same teardown a
//!   monitor `Closed` would

use std::sync::Arc;
use std::time::Duration;

use bytes::BytesMut;
use futures_util::StreamExt;
use thiserror::Error;
use tokio::io::AsyncRead;
use tokio::task::JoinHandle;
use tokio_util::codec::{FramedRead, LengthDelimitedCodec};
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::signal::{SessionSignal, SignalSender};
use super::SessionId;
use crate::capability::CapabilityError;
use crate::codec::frame::{frame_codec, parse_frame, Frame, UnknownFrameKind};
use crate::codec::TransformChain;
use crate::config::DispatcherConfig;
use crate::events::Message;
use crate::net::Endpoint;

/// Why a dispatcher stopped reading.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The peer closed its side of the connection.
    #[error("peer closed the connection")]
    PeerClosed,

    /// No frame arrived within the idle timeout.
    #[error("no frame received for {0:?}")]
    IdleTimeout(Duration),

    /// Reading or framing failed (includes oversized frames).
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),

    /// A frame carried an unknown kind tag.
    #[error("malformed frame: {0}")]
    Frame(#[from] UnknownFrameKind),

    /// A frame could not be decrypted or decompressed.
    #[error("failed to decode frame: {0}")]
    Transform(#[from] CapabilityError),
}

impl DispatchError {
    /// Short label used for metrics and logs.
    pub fn cause(&self) -> &'static str {
        match self {
            DispatchError::PeerClosed => "peer_closed",
            DispatchError::IdleTimeout(_) => "idle_timeout",
            DispatchError::Io(_) => "io",
            DispatchError::Frame(_) | DispatchError::Transform(_) => "malformed_frame",
        }
    }
}

/// Cancellation handle for a dispatcher, kept in the registry.
#[derive(Debug, Clone)]
pub struct DispatcherHandle {
    cancel: CancellationToken,
}

impl DispatcherHandle {
    /// Ask the dispatcher to stop. Idempotent; safe before `start`.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    #[cfg(test)]
    pub(crate) fn detached() -> Self {
        Self {
            cancel: CancellationToken::new(),
        }
    }
}

/// Frame reader and decoder for one connection.
pub struct MessageDispatcher<R> {
    endpoint: Endpoint,
    session: SessionId,
    frames: FramedRead<R, LengthDelimitedCodec>,
    chain: Arc<TransformChain>,
    idle_timeout: Option<Duration>,
    cancel: CancellationToken,
    signals: SignalSender,
}

impl<R> MessageDispatcher<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    pub fn new(
        endpoint: Endpoint,
        session: SessionId,
        reader: R,
        chain: Arc<TransformChain>,
        config: &DispatcherConfig,
        signals: SignalSender,
    ) -> Self {
        Self {
            endpoint,
            session,
            frames: FramedRead::new(reader, frame_codec(config.max_frame_length)),
            chain,
            idle_timeout: config.idle_timeout(),
            cancel: CancellationToken::new(),
            signals,
        }
    }

    pub fn handle(&self) -> DispatcherHandle {
        DispatcherHandle {
            cancel: self.cancel.clone(),
        }
    }

    /// Spawn the read loop.
    pub fn start(self) -> JoinHandle<()> {
        let span = tracing::info_span!(
            "dispatcher",
            endpoint = %self.endpoint,
            session = %self.session
        );
        tokio::spawn(self.run().instrument(span))
    }

    async fn run(mut self) {
        match self.pump().await {
            Ok(()) => tracing::debug!("Dispatcher stopped"),
            Err(error) => {
                let signal = SessionSignal::DispatchFailed {
                    endpoint: self.endpoint,
                    session: self.session,
                    error,
                };
                if self.signals.send(signal).await.is_err() {
                    tracing::trace!("Hub is gone, dispatch failure dropped");
                }
            }
        }
    }

    /// Read until cancelled (`Ok`) or the connection fails (`Err`).
    async fn pump(&mut self) -> Result<(), DispatchError> {
        let cancel = self.cancel.clone();
        loop {
            let frame = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                frame = next_frame(&mut self.frames, self.idle_timeout) => frame?,
            };

            let body = match parse_frame(&frame)? {
                Frame::Heartbeat => {
                    tracing::trace!("Heartbeat received");
                    continue;
                }
                Frame::Data(body) => body,
            };

            let payload = self.chain.decode(body)?;
            let signal = SessionSignal::Message {
                session: self.session,
                message: Message::new(self.endpoint, payload),
            };
            if self.signals.send(signal).await.is_err() {
                return Ok(());
            }
        }
    }
}

async fn next_frame<R>(
    frames: &mut FramedRead<R, LengthDelimitedCodec>,
    idle_timeout: Option<Duration>,
) -> Result<BytesMut, DispatchError>
where
    R: AsyncRead + Unpin,
{
    let next = match idle_timeout {
        Some(limit) => tokio::time::timeout(limit, frames.next())
            .await
            .map_err(|_| DispatchError::IdleTimeout(limit))?,
        None => frames.next().await,
    };

    match next {
        Some(Ok(frame)) => Ok(frame),
        Some(Err(e)) => Err(DispatchError::Io(e)),
        None => Err(DispatchError::PeerClosed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{PlaintextCipher, ZlibCompression};
    use crate::codec::frame::data_frame;
    use crate::codec::TransformOrder;
    use crate::session::signal;
    use bytes::Bytes;
    use futures_util::SinkExt;
    use tokio::io::{AsyncWriteExt, DuplexStream};
    use tokio_util::codec::FramedWrite;

    fn endpoint() -> Endpoint {
        Endpoint::from("127.0.0.1:6200".parse::<std::net::SocketAddr>().unwrap())
    }

    fn chain() -> Arc<TransformChain> {
        Arc::new(TransformChain::new(
            Arc::new(PlaintextCipher),
            Some(Arc::new(ZlibCompression::new(6, 1 << 20).unwrap())),
            TransformOrder::CompressThenEncrypt,
        ))
    }

    fn plain_chain() -> Arc<TransformChain> {
        Arc::new(TransformChain::new(
            Arc::new(PlaintextCipher),
            None,
            TransformOrder::CompressThenEncrypt,
        ))
    }

    fn dispatcher(
        reader: DuplexStream,
        config: &DispatcherConfig,
    ) -> (MessageDispatcher<DuplexStream>, signal::SignalReceiver) {
        dispatcher_with(reader, config, chain())
    }

    fn dispatcher_with(
        reader: DuplexStream,
        config: &DispatcherConfig,
        chain: Arc<TransformChain>,
    ) -> (MessageDispatcher<DuplexStream>, signal::SignalReceiver) {
        let (tx, rx) = signal::channel(16);
        let dispatcher =
            MessageDispatcher::new(endpoint(), SessionId::new(), reader, chain, config, tx);
        (dispatcher, rx)
    }

    fn sender(writer: DuplexStream) -> FramedWrite<DuplexStream, LengthDelimitedCodec> {
        FramedWrite::new(writer, frame_codec(1 << 20))
    }

    async fn frame(out: &mut FramedWrite<DuplexStream, LengthDelimitedCodec>, payload: &[u8]) {
        let body = chain().encode(payload).unwrap();
        out.send(data_frame(&body)).await.unwrap();
    }

    #[tokio::test]
    async fn decodes_frames_and_skips_heartbeats() {
        let (ours, theirs) = tokio::io::duplex(4096);
        let (dispatcher, mut rx) = dispatcher(ours, &DispatcherConfig::default());
        let _task = dispatcher.start();

        let mut out = sender(theirs);
        frame(&mut out, b"first").await;
        out.send(Bytes::new()).await.unwrap();
        frame(&mut out, b"second").await;

        for expected in [&b"first"[..], &b"second"[..]] {
            match rx.recv().await.unwrap() {
                SessionSignal::Message { message, .. } => {
                    assert_eq!(message.sender, endpoint());
                    assert_eq!(&message.payload[..], expected);
                }
                other => panic!("unexpected signal {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn malformed_frame_stops_dispatch() {
        let (ours, theirs) = tokio::io::duplex(4096);
        let (dispatcher, mut rx) = dispatcher(ours, &DispatcherConfig::default());
        let task = dispatcher.start();

        let mut out = sender(theirs);
        frame(&mut out, b"good").await;
        out.send(data_frame(b"not zlib at all")).await.unwrap();
        frame(&mut out, b"never delivered").await;
        task.await.unwrap();

        assert!(matches!(rx.recv().await, Some(SessionSignal::Message { .. })));
        match rx.recv().await {
            Some(SessionSignal::DispatchFailed { error, .. }) => {
                assert_eq!(error.cause(), "malformed_frame");
            }
            other => panic!("expected dispatch failure, got {:?}", other),
        }
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn empty_message_is_delivered_through_identity_chain() {
        let (ours, theirs) = tokio::io::duplex(4096);
        let (dispatcher, mut rx) =
            dispatcher_with(ours, &DispatcherConfig::default(), plain_chain());
        let _task = dispatcher.start();

        let mut out = sender(theirs);
        let empty = plain_chain().encode(b"").unwrap();
        assert!(empty.is_empty());
        out.send(data_frame(&empty)).await.unwrap();
        out.send(Bytes::new()).await.unwrap();
        out.send(data_frame(b"after")).await.unwrap();

        for expected in [&b""[..], &b"after"[..]] {
            match rx.recv().await.unwrap() {
                SessionSignal::Message { message, .. } => {
                    assert_eq!(&message.payload[..], expected);
                }
                other => panic!("unexpected signal {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn unknown_frame_kind_stops_dispatch() {
        let (ours, theirs) = tokio::io::duplex(4096);
        let (dispatcher, mut rx) =
            dispatcher_with(ours, &DispatcherConfig::default(), plain_chain());
        let task = dispatcher.start();

        let mut out = sender(theirs);
        out.send(Bytes::from_static(b"\x09raw")).await.unwrap();
        task.await.unwrap();

        match rx.recv().await {
            Some(SessionSignal::DispatchFailed { error, .. }) => {
                assert!(matches!(error, DispatchError::Frame(UnknownFrameKind(0x09))));
                assert_eq!(error.cause(), "malformed_frame");
            }
            other => panic!("expected dispatch failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn oversized_frame_is_an_io_failure() {
        let (ours, mut theirs) = tokio::io::duplex(4096);
        let config = DispatcherConfig {
            max_frame_length: 8,
            ..DispatcherConfig::default()
        };
        let (dispatcher, mut rx) = dispatcher(ours, &config);
        let task = dispatcher.start();

        theirs.write_all(&[0, 0, 0, 64]).await.unwrap();
        task.await.unwrap();

        assert!(matches!(
            rx.recv().await,
            Some(SessionSignal::DispatchFailed {
                error: DispatchError::Io(_),
                ..
            })
        ));
    }

    #[tokio::test]
    async fn peer_eof_is_reported() {
        let (ours, theirs) = tokio::io::duplex(64);
        let (dispatcher, mut rx) = dispatcher(ours, &DispatcherConfig::default());
        let task = dispatcher.start();

        drop(theirs);
        task.await.unwrap();

        assert!(matches!(
            rx.recv().await,
            Some(SessionSignal::DispatchFailed {
                error: DispatchError::PeerClosed,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn idle_timeout_ends_dispatch() {
        let (ours, _theirs) = tokio::io::duplex(64);
        let config = DispatcherConfig {
            idle_timeout_secs: Some(1),
            ..DispatcherConfig::default()
        };
        let (dispatcher, mut rx) = dispatcher(ours, &config);
        dispatcher.start().await.unwrap();

        assert!(matches!(
            rx.recv().await,
            Some(SessionSignal::DispatchFailed {
                error: DispatchError::IdleTimeout(_),
                ..
            })
        ));
    }

    #[tokio::test]
    async fn cancel_is_silent_and_idempotent() {
        let (ours, _theirs) = tokio::io::duplex(64);
        let (dispatcher, mut rx) = dispatcher(ours, &DispatcherConfig::default());
        let handle = dispatcher.handle();

        handle.cancel();
        handle.cancel();
        dispatcher.start().await.unwrap();

        assert!(handle.is_cancelled());
        assert!(rx.recv().await.is_none());
    }
}
