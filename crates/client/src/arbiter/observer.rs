//! Observability hook for the arbiter.
//!
//! Failures the arbiter swallows (cache writes, cache reads) and lifecycle
//! transitions are reported here instead of being printed directly.

use super::strategy::{ResponseSource, Strategy};

/// Something worth knowing about that does not change the response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArbiterEvent {
    Served { url: String, strategy: Strategy, source: ResponseSource, status: u16 },
    Passthrough { url: String },
    CacheReadFailed { partition: String, url: String, error: String },
    CacheWriteFailed { partition: String, url: String, error: String },
    InstallStarted { version: String, assets: usize },
    Installed { version: String, entries: usize },
    InstallFailed { version: String, error: String },
    GenerationEvicted { name: String },
    ClientsClaimed { version: String },
    CachesCleared { deleted: usize },
    ControlIgnored { kind: String },
}

/// Receives arbiter events. Implementations must not block.
pub trait ArbiterObserver: Send + Sync {
    fn observe(&self, event: &ArbiterEvent);
}

/// Default observer: forwards every event to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl ArbiterObserver for TracingObserver {
    fn observe(&self, event: &ArbiterEvent) {
        match event {
            ArbiterEvent::Served { url, strategy, source, status } => {
                tracing::debug!(%url, %strategy, %source, status, "request served");
            }
            ArbiterEvent::Passthrough { url } => {
                tracing::trace!(%url, "request not intercepted");
            }
            ArbiterEvent::CacheReadFailed { partition, url, error } => {
                tracing::warn!(%partition, %url, %error, "cache read failed; treating as miss");
            }
            ArbiterEvent::CacheWriteFailed { partition, url, error } => {
                tracing::warn!(%partition, %url, %error, "cache write failed; response still delivered");
            }
            ArbiterEvent::InstallStarted { version, assets } => {
                tracing::info!(%version, assets, "installing static assets");
            }
            ArbiterEvent::Installed { version, entries } => {
                tracing::info!(%version, entries, "static assets cached");
            }
            ArbiterEvent::InstallFailed { version, error } => {
                tracing::error!(%version, %error, "install failed; previous generation stays live");
            }
            ArbiterEvent::GenerationEvicted { name } => {
                tracing::info!(cache = %name, "evicted stale cache");
            }
            ArbiterEvent::ClientsClaimed { version } => {
                tracing::info!(%version, "clients claimed");
            }
            ArbiterEvent::CachesCleared { deleted } => {
                tracing::info!(deleted, "all caches cleared");
            }
            ArbiterEvent::ControlIgnored { kind } => {
                tracing::debug!(%kind, "ignoring control message");
            }
        }
    }
}
