//! Cache/network arbitration for intercepted requests.
//!
//! A [`CacheArbiter`] owns the version registry, the static manifest and
//! handles to the cache store and the network. The host calls
//! [`CacheArbiter::handle`] once per outbound request and the lifecycle
//! methods once per deployment.
//!
//! ### Routing
//! - Non-http(s) schemes are not intercepted.
//! - Non-GET requests always take the network-first path, which never
//!   touches the cache and propagates network failures.
//! - GET requests matching the manifest go cache-first (static partition);
//!   everything else goes network-first (dynamic partition).
//!
//! ### Generations
//! Requests read and write the *serving* generation. It starts as the
//! configured version, is taken over from partitions left by an earlier
//! deployment on the first install, and moves to the configured version
//! only when activation succeeds.

pub mod lifecycle;
pub mod observer;
pub mod strategy;

#[cfg(test)]
mod testing;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::{Mutex, RwLock};
use url::Url;
use waystation_core::{AppConfig, CacheStore, Error, Partition, ProxyRequest, StaticManifest, VersionRegistry};

use crate::fetch::{Network, resolve};

pub use lifecycle::{ActivationReport, ControlMessage, ControlOutcome, InstallReport, LifecycleState};
pub use observer::{ArbiterEvent, ArbiterObserver, TracingObserver};
pub use strategy::{OFFLINE_BODY, RESOURCE_ERROR_BODY, ResponseSource, Served, Strategy};

/// Result of offering a request to the arbiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interception {
    /// Not intercepted; the host handles the request itself.
    Passthrough,
    Handled(Served),
}

impl Interception {
    pub fn served(self) -> Option<Served> {
        match self {
            Interception::Passthrough => None,
            Interception::Handled(served) => Some(served),
        }
    }
}

/// Deployment settings that are not part of the version or manifest.
#[derive(Debug, Clone)]
pub struct ArbiterSettings {
    /// Origin that manifest paths and the default document resolve against.
    pub origin: Url,
    /// Path of the page served to offline navigations.
    pub default_document: String,
    /// Activate straight after a successful install.
    pub skip_waiting: bool,
}

impl ArbiterSettings {
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let origin = Url::parse(&config.origin).map_err(|e| Error::InvalidUrl(format!("{}: {e}", config.origin)))?;
        Ok(Self { origin, default_document: config.default_document.clone(), skip_waiting: config.skip_waiting })
    }
}

/// The caching proxy: strategy router plus lifecycle controller.
pub struct CacheArbiter {
    version: VersionRegistry,
    serving: RwLock<VersionRegistry>,
    manifest: StaticManifest,
    origin: Url,
    default_document_url: Url,
    skip_waiting: bool,
    store: Arc<dyn CacheStore>,
    network: Arc<dyn Network>,
    observer: Arc<dyn ArbiterObserver>,
    state: RwLock<LifecycleState>,
    lifecycle: Mutex<()>,
    clients_claimed: AtomicBool,
}

impl CacheArbiter {
    /// Build an arbiter. Events go to [`TracingObserver`] until replaced.
    pub fn new(
        version: VersionRegistry, manifest: StaticManifest, settings: ArbiterSettings, store: Arc<dyn CacheStore>,
        network: Arc<dyn Network>,
    ) -> Result<Self, Error> {
        let default_document_url = resolve(&settings.origin, &settings.default_document)
            .map_err(|e| Error::InvalidUrl(format!("default document {}: {e}", settings.default_document)))?;

        Ok(Self {
            serving: RwLock::new(version.clone()),
            version,
            manifest,
            origin: settings.origin,
            default_document_url,
            skip_waiting: settings.skip_waiting,
            store,
            network,
            observer: Arc::new(TracingObserver),
            state: RwLock::new(LifecycleState::Idle),
            lifecycle: Mutex::new(()),
            clients_claimed: AtomicBool::new(false),
        })
    }

    /// Build an arbiter from loaded application configuration.
    pub fn from_config(
        config: &AppConfig, store: Arc<dyn CacheStore>, network: Arc<dyn Network>,
    ) -> Result<Self, Error> {
        let settings = ArbiterSettings::from_config(config)?;
        Self::new(config.version_registry(), config.manifest(), settings, store, network)
    }

    /// Replace the observability hook.
    pub fn with_observer(mut self, observer: Arc<dyn ArbiterObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Route one request.
    ///
    /// Errors only for non-GET requests whose network fetch failed; every
    /// other failure resolves to a cached, default or synthetic response.
    pub async fn handle(&self, request: &ProxyRequest) -> Result<Interception, Error> {
        if !request.is_http() {
            self.observer.observe(&ArbiterEvent::Passthrough { url: request.url.to_string() });
            return Ok(Interception::Passthrough);
        }

        let served = match self.route(request) {
            Strategy::CacheFirst => self.cache_first(request).await,
            Strategy::NetworkFirst => self.network_first(request).await?,
        };

        self.observer.observe(&ArbiterEvent::Served {
            url: request.url.to_string(),
            strategy: served.strategy,
            source: served.source,
            status: served.response.status.as_u16(),
        });

        Ok(Interception::Handled(served))
    }

    /// Pick the strategy for an intercepted request.
    pub fn route(&self, request: &ProxyRequest) -> Strategy {
        if request.is_get() && self.manifest.is_static(&request.url) {
            Strategy::CacheFirst
        } else {
            Strategy::NetworkFirst
        }
    }

    /// The configured version, the one `on_install` populates.
    pub fn version(&self) -> &VersionRegistry {
        &self.version
    }

    /// The generation requests are currently served from.
    pub async fn serving_version(&self) -> VersionRegistry {
        self.serving.read().await.clone()
    }

    pub(crate) async fn serving_partition(&self, partition: Partition) -> String {
        self.serving.read().await.partition_name(partition)
    }

    pub fn manifest(&self) -> &StaticManifest {
        &self.manifest
    }

    pub fn origin(&self) -> &Url {
        &self.origin
    }

    pub fn store(&self) -> &Arc<dyn CacheStore> {
        &self.store
    }

    pub async fn state(&self) -> LifecycleState {
        *self.state.read().await
    }

    /// Whether open pages are controlled by this arbiter without reloading.
    pub fn clients_claimed(&self) -> bool {
        self.clients_claimed.load(Ordering::Acquire)
    }

    fn claim_clients(&self) {
        self.clients_claimed.store(true, Ordering::Release);
        self.observer.observe(&ArbiterEvent::ClientsClaimed { version: self.version.tag().to_string() });
    }
}
