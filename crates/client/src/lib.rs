//! Client side of waystation.
//!
//! This crate provides the network fetch pipeline and the cache arbiter
//! that decides, per request, whether to answer from the network, the
//! cache, or a synthetic fallback.

pub mod arbiter;
pub mod fetch;

pub use arbiter::{
    ActivationReport, ArbiterEvent, ArbiterObserver, ArbiterSettings, CacheArbiter, ControlMessage, ControlOutcome,
    InstallReport, Interception, LifecycleState, OFFLINE_BODY, RESOURCE_ERROR_BODY, ResponseSource, Served, Strategy,
    TracingObserver,
};

pub use fetch::{FetchClient, FetchConfig, Network, UrlError, resolve};
