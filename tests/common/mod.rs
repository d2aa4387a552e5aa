//! Shared utilities for integration and load testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures_util::SinkExt;
use tokio::net::TcpStream;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use tcp_hub::capability::{PlaintextCipher, ZlibCompression};
use tcp_hub::codec::{data_frame, frame_codec, TransformChain, TransformOrder};
use tcp_hub::config::{DispatcherConfig, HubOptions, MonitorConfig};
use tcp_hub::events::ChannelEventSink;
use tcp_hub::{Endpoint, HubEvent, HubServer};

pub const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Max frame length used by the test hubs.
pub const MAX_FRAME: usize = 64 * 1024;

/// A running hub plus the receiving end of its event sink.
pub struct TestHub {
    pub server: HubServer,
    pub addr: SocketAddr,
    pub events: UnboundedReceiver<HubEvent>,
}

/// Knobs the integration tests vary.
pub struct HubSetup {
    pub allowed_connections: usize,
    pub probe_interval_ms: u64,
    pub compression: bool,
}

impl Default for HubSetup {
    fn default() -> Self {
        Self {
            allowed_connections: 16,
            probe_interval_ms: 50,
            compression: true,
        }
    }
}

pub fn zlib() -> Arc<ZlibCompression> {
    Arc::new(ZlibCompression::new(6, MAX_FRAME).unwrap())
}

/// Start a hub on an ephemeral loopback port.
pub async fn start_hub(setup: HubSetup) -> TestHub {
    let (sink, events) = ChannelEventSink::new();
    let mut builder = HubServer::builder("127.0.0.1:0")
        .encryption(Arc::new(PlaintextCipher))
        .events(Arc::new(sink))
        .options(HubOptions {
            allowed_connections: setup.allowed_connections,
        })
        .monitor(MonitorConfig {
            probe_interval_ms: setup.probe_interval_ms,
            probe_timeout_ms: 500,
        })
        .dispatcher(DispatcherConfig {
            max_frame_length: MAX_FRAME,
            ..DispatcherConfig::default()
        });
    if setup.compression {
        builder = builder.compression(zlib());
    }

    let server = builder.build().unwrap();
    let addr = server.start().await.unwrap();
    TestHub {
        server,
        addr,
        events,
    }
}

/// A client speaking the hub's framing.
pub struct Client {
    pub framed: Framed<TcpStream, LengthDelimitedCodec>,
    pub endpoint: Endpoint,
    chain: TransformChain,
}

impl Client {
    pub async fn connect(addr: SocketAddr, compression: bool) -> Client {
        let stream = TcpStream::connect(addr).await.unwrap();
        let endpoint = Endpoint::from(stream.local_addr().unwrap());
        let compression = if compression {
            Some(zlib() as Arc<dyn tcp_hub::Compression>)
        } else {
            None
        };
        Client {
            framed: Framed::new(stream, frame_codec(MAX_FRAME)),
            endpoint,
            chain: TransformChain::new(
                Arc::new(PlaintextCipher),
                compression,
                TransformOrder::CompressThenEncrypt,
            ),
        }
    }

    /// Encode `payload` through the client's chain and send it.
    pub async fn send(&mut self, payload: &[u8]) {
        let body = self.chain.encode(payload).unwrap();
        self.framed.send(data_frame(&body)).await.unwrap();
    }

    /// Send a body in a data frame, bypassing the transform chain.
    pub async fn send_raw(&mut self, body: &[u8]) {
        self.framed.send(data_frame(body)).await.unwrap();
    }

    /// Send a frame exactly as given, without a kind tag.
    pub async fn send_frame(&mut self, frame: &'static [u8]) {
        self.framed.send(Bytes::from_static(frame)).await.unwrap();
    }
}

/// Next event, failing the test if none arrives in time.
pub async fn next_event(events: &mut UnboundedReceiver<HubEvent>) -> HubEvent {
    tokio::time::timeout(EVENT_TIMEOUT, events.recv())
        .await
        .expect("timed out waiting for hub event")
        .expect("event channel closed")
}

/// Skip events until one matches, returning it.
pub async fn wait_for(
    events: &mut UnboundedReceiver<HubEvent>,
    mut matches: impl FnMut(&HubEvent) -> bool,
) -> HubEvent {
    loop {
        let event = next_event(events).await;
        if matches(&event) {
            return event;
        }
    }
}

/// Poll `condition` until it holds or the timeout elapses.
pub async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + EVENT_TIMEOUT;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// Read until the hub closes the connection, skipping its heartbeats.
/// Returns false if the connection is still open after the timeout.
pub async fn closed_by_hub(client: &mut Client) -> bool {
    use futures_util::StreamExt;

    let drain = async {
        loop {
            match client.framed.next().await {
                Some(Ok(frame)) if frame.is_empty() => continue,
                Some(Ok(_)) => continue,
                Some(Err(_)) | None => return,
            }
        }
    };
    tokio::time::timeout(EVENT_TIMEOUT, drain).await.is_ok()
}
