//! Construction of [`HubServer`].

use std::sync::Arc;

use crate::capability::{Compression, Encryption, ZlibCompression};
use crate::codec::TransformChain;
use crate::config::{AcceptConfig, DispatcherConfig, HubConfig, HubOptions, MonitorConfig};
use crate::error::HubError;
use crate::events::{EventSink, NullEventSink};

use super::server::{HubServer, HubShared};

/// Builder for [`HubServer`]. An encryption capability is mandatory.
pub struct HubServerBuilder {
    bind_address: String,
    encryption: Option<Arc<dyn Encryption>>,
    compression: Option<Arc<dyn Compression>>,
    events: Option<Arc<dyn EventSink>>,
    options: HubOptions,
    monitor: MonitorConfig,
    dispatcher: DispatcherConfig,
    accept: AcceptConfig,
}

impl HubServerBuilder {
    pub(crate) fn new(bind_address: impl Into<String>) -> Self {
        Self {
            bind_address: bind_address.into(),
            encryption: None,
            compression: None,
            events: None,
            options: HubOptions::default(),
            monitor: MonitorConfig::default(),
            dispatcher: DispatcherConfig::default(),
            accept: AcceptConfig::default(),
        }
    }

    pub fn encryption(mut self, encryption: Arc<dyn Encryption>) -> Self {
        self.encryption = Some(encryption);
        self
    }

    pub fn compression(mut self, compression: Arc<dyn Compression>) -> Self {
        self.compression = Some(compression);
        self
    }

    /// Where lifecycle and message events go. Defaults to [`NullEventSink`].
    pub fn events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn options(mut self, options: HubOptions) -> Self {
        self.options = options;
        self
    }

    pub fn monitor(mut self, monitor: MonitorConfig) -> Self {
        self.monitor = monitor;
        self
    }

    pub fn dispatcher(mut self, dispatcher: DispatcherConfig) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    pub fn accept(mut self, accept: AcceptConfig) -> Self {
        self.accept = accept;
        self
    }

    /// Build the server. Fails with [`HubError::MissingEncryption`] when no
    /// encryption capability was supplied.
    pub fn build(self) -> Result<HubServer, HubError> {
        let encryption = self.encryption.ok_or(HubError::MissingEncryption)?;
        let chain = TransformChain::new(encryption, self.compression, self.dispatcher.transform_order);
        let events = self
            .events
            .unwrap_or_else(|| Arc::new(NullEventSink) as Arc<dyn EventSink>);

        tracing::debug!(
            bind_address = %self.bind_address,
            allowed_connections = self.options.allowed_connections,
            transform = ?chain,
            "Hub server built"
        );

        let (shared, signals) = HubShared::new(
            chain,
            events,
            self.options,
            self.monitor,
            self.dispatcher,
            self.accept,
        );
        Ok(HubServer::new(self.bind_address, shared, signals))
    }
}

impl HubServer {
    /// Start building a server that will listen on `bind_address`.
    pub fn builder(bind_address: impl Into<String>) -> HubServerBuilder {
        HubServerBuilder::new(bind_address)
    }

    /// Build a server from a loaded configuration.
    ///
    /// Compression is taken from `[compression]`; encryption and the event
    /// sink are supplied by the caller.
    pub fn from_config(
        config: &HubConfig,
        encryption: Arc<dyn Encryption>,
        events: Arc<dyn EventSink>,
    ) -> Result<HubServer, HubError> {
        let mut builder = HubServer::builder(config.listener.bind_address.clone())
            .encryption(encryption)
            .events(events)
            .options(config.hub)
            .monitor(config.monitor.clone())
            .dispatcher(config.dispatcher.clone())
            .accept(config.accept.clone());

        if config.compression.enabled {
            builder = builder.compression(Arc::new(ZlibCompression::from_config(&config.compression)?));
        }

        builder.build()
    }
}
