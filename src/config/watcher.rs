//! Hot reload of the live-tunable part of the configuration.
//!
//! Only [`HubOptions`] is published. A reload that fails to parse or validate
//! is logged and the previous options stay in effect.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::watch;

use crate::config::loader::load_config;
use crate::config::schema::HubOptions;

const POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Watches a config file and publishes changed [`HubOptions`].
pub struct ConfigWatcher {
    path: PathBuf,
    options: watch::Sender<HubOptions>,
}

impl ConfigWatcher {
    /// Create a watcher seeded with the options currently in effect.
    pub fn new(path: &Path, current: HubOptions) -> (Self, watch::Receiver<HubOptions>) {
        let (options, rx) = watch::channel(current);
        (
            Self {
                path: path.to_path_buf(),
                options,
            },
            rx,
        )
    }

    /// Start watching. The returned watcher must be kept alive for updates to
    /// keep flowing.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let Self { path, options } = self;
        let watched = path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if is_content_change(&event.kind) => reload(&path, &options),
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "Config watch error"),
            },
            Config::default().with_poll_interval(POLL_INTERVAL),
        )?;

        watcher.watch(&watched, RecursiveMode::NonRecursive)?;
        tracing::info!(path = %watched.display(), "Config watcher started");
        Ok(watcher)
    }
}

fn is_content_change(kind: &EventKind) -> bool {
    kind.is_modify() || kind.is_create()
}

fn reload(path: &Path, options: &watch::Sender<HubOptions>) {
    let config = match load_config(path) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Config reload failed, keeping current options");
            return;
        }
    };

    let changed = options.send_if_modified(|current| {
        if *current == config.hub {
            return false;
        }
        *current = config.hub;
        true
    });
    if changed {
        tracing::info!(
            allowed_connections = config.hub.allowed_connections,
            "Config reloaded"
        );
    }
}
