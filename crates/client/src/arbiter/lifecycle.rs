//! Install, activate and control-message handling.
//!
//! Lifecycle events are serialised through the arbiter's lifecycle mutex.
//! Fetches do not take that lock, so a request in flight during activation
//! may see either generation.

use std::fmt;

use futures_util::future::join_all;
use serde::Serialize;
use waystation_core::{Error, Partition, ProxyRequest, ProxyResponse, VersionRegistry};

use super::CacheArbiter;
use super::observer::ArbiterEvent;
use crate::fetch::resolve;

/// Per-deployment lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    /// Constructed; nothing installed yet.
    Idle,
    Installing,
    /// Installed and waiting to activate.
    Installed,
    Activating,
    Active,
    /// The last install attempt failed; it may be retried.
    Failed,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LifecycleState::Idle => "idle",
            LifecycleState::Installing => "installing",
            LifecycleState::Installed => "installed",
            LifecycleState::Activating => "activating",
            LifecycleState::Active => "active",
            LifecycleState::Failed => "failed",
        })
    }
}

/// Messages a page can post to the arbiter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlMessage {
    /// `SKIP_WAITING`: activate a waiting installation now.
    SkipWaiting,
    /// `CLEAR_CACHE`: delete every partition and claim clients.
    ClearCache,
    /// Anything else; ignored.
    Unknown(String),
}

impl ControlMessage {
    /// Parse the message's `type` field.
    pub fn from_type(kind: &str) -> Self {
        match kind {
            "SKIP_WAITING" => ControlMessage::SkipWaiting,
            "CLEAR_CACHE" => ControlMessage::ClearCache,
            other => ControlMessage::Unknown(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct ActivationReport {
    pub version: String,
    /// Partitions deleted because they belong to another generation.
    pub evicted: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct InstallReport {
    pub version: String,
    pub cached: usize,
    /// Present when the installation skipped waiting and activated at once.
    pub activation: Option<ActivationReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ControlOutcome {
    Activated(ActivationReport),
    Cleared { deleted: Vec<String> },
    Ignored { reason: String },
}

impl CacheArbiter {
    /// Pre-cache the manifest into the static partition.
    ///
    /// All-or-nothing: if any asset fails to fetch or is not ok, nothing is
    /// stored, the state becomes [`LifecycleState::Failed`] and
    /// [`Error::InstallFailed`] is returned. Stale generations are untouched.
    /// With `skip_waiting` set, a successful install activates immediately.
    ///
    /// The first install after construction keeps serving whatever generation
    /// an earlier deployment left in the store until activation.
    pub async fn on_install(&self) -> Result<InstallReport, Error> {
        let _lifecycle = self.lifecycle.lock().await;
        if self.state().await == LifecycleState::Idle {
            self.adopt_previous_generation().await;
        }
        self.set_state(LifecycleState::Installing).await;
        self.observer.observe(&ArbiterEvent::InstallStarted {
            version: self.version.tag().to_string(),
            assets: self.manifest.paths().len(),
        });

        let cached = match self.precache().await {
            Ok(cached) => cached,
            Err(e) => {
                let err = match e {
                    Error::InstallFailed(_) => e,
                    other => Error::InstallFailed(other.to_string()),
                };
                self.set_state(LifecycleState::Failed).await;
                self.observer.observe(&ArbiterEvent::InstallFailed {
                    version: self.version.tag().to_string(),
                    error: err.to_string(),
                });
                return Err(err);
            }
        };

        self.set_state(LifecycleState::Installed).await;
        self.observer.observe(&ArbiterEvent::Installed { version: self.version.tag().to_string(), entries: cached });

        let activation = if self.skip_waiting { Some(self.activate_locked().await?) } else { None };

        Ok(InstallReport { version: self.version.tag().to_string(), cached, activation })
    }

    /// Evict every partition outside the current generation, then claim clients.
    ///
    /// Only an installed or already active generation can be activated.
    /// From any other state this returns [`Error::InvalidState`] and the
    /// store is left alone.
    pub async fn on_activate(&self) -> Result<ActivationReport, Error> {
        let _lifecycle = self.lifecycle.lock().await;
        let state = self.state().await;
        if !matches!(state, LifecycleState::Installed | LifecycleState::Active) {
            return Err(Error::InvalidState(format!(
                "cannot activate {} while {state}; install it first",
                self.version.tag()
            )));
        }
        self.activate_locked().await
    }

    /// Handle a control message from a page. Unknown messages are ignored.
    pub async fn on_control_message(&self, message: ControlMessage) -> Result<ControlOutcome, Error> {
        match message {
            ControlMessage::SkipWaiting => {
                let _lifecycle = self.lifecycle.lock().await;
                let state = self.state().await;
                if state != LifecycleState::Installed {
                    tracing::debug!(%state, "SKIP_WAITING with no waiting installation");
                    return Ok(ControlOutcome::Ignored { reason: format!("no waiting installation (state: {state})") });
                }
                Ok(ControlOutcome::Activated(self.activate_locked().await?))
            }
            ControlMessage::ClearCache => {
                let _lifecycle = self.lifecycle.lock().await;
                let mut deleted = Vec::new();
                for name in self.store.keys().await? {
                    if self.store.delete(&name).await? {
                        deleted.push(name);
                    }
                }
                self.observer.observe(&ArbiterEvent::CachesCleared { deleted: deleted.len() });
                *self.serving.write().await = self.version.clone();
                self.claim_clients();
                Ok(ControlOutcome::Cleared { deleted })
            }
            ControlMessage::Unknown(kind) => {
                self.observer.observe(&ArbiterEvent::ControlIgnored { kind: kind.clone() });
                Ok(ControlOutcome::Ignored { reason: format!("unrecognised message type: {kind}") })
            }
        }
    }

    /// Fetch every manifest asset, then store them in one atomic write.
    async fn precache(&self) -> Result<usize, Error> {
        let partition = self.version.partition_name(Partition::Static);
        self.store.open(&partition).await?;

        let requests = self
            .manifest
            .paths()
            .iter()
            .map(|path| {
                resolve(&self.origin, path)
                    .map(ProxyRequest::get)
                    .map_err(|e| Error::InstallFailed(format!("{path}: {e}")))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let results = join_all(requests.iter().map(|request| self.network.fetch(request))).await;

        let mut entries: Vec<(ProxyRequest, ProxyResponse)> = Vec::with_capacity(requests.len());
        for (request, result) in requests.into_iter().zip(results) {
            let response = result.map_err(|e| Error::InstallFailed(format!("{}: {e}", request.url)))?;
            if !response.is_ok() {
                return Err(Error::InstallFailed(format!("{}: status {}", request.url, response.status.as_u16())));
            }
            entries.push((request, response));
        }

        self.store.put_all(&partition, &entries).await?;
        Ok(entries.len())
    }

    /// Activation body; caller holds the lifecycle lock.
    async fn activate_locked(&self) -> Result<ActivationReport, Error> {
        let previous = self.state().await;
        self.set_state(LifecycleState::Activating).await;

        let evicted = match self.evict_stale().await {
            Ok(evicted) => evicted,
            Err(e) => {
                self.set_state(previous).await;
                return Err(e);
            }
        };

        *self.serving.write().await = self.version.clone();
        self.claim_clients();
        self.set_state(LifecycleState::Active).await;

        Ok(ActivationReport { version: self.version.tag().to_string(), evicted })
    }

    /// Serve from the most recently created generation other than the
    /// configured one, if the store holds any.
    async fn adopt_previous_generation(&self) {
        let names = match self.store.keys().await {
            Ok(names) => names,
            Err(e) => {
                tracing::warn!(error = %e, "could not list partitions, serving the configured version");
                return;
            }
        };

        let previous = names
            .iter()
            .rev()
            .filter_map(|name| VersionRegistry::from_partition_name(name))
            .find(|registry| *registry != self.version);

        if let Some(previous) = previous {
            tracing::info!(serving = previous.tag(), installing = self.version.tag(), "serving previous generation");
            *self.serving.write().await = previous;
        }
    }

    async fn evict_stale(&self) -> Result<Vec<String>, Error> {
        let mut evicted = Vec::new();
        for name in self.store.keys().await? {
            if self.version.is_live(&name) {
                continue;
            }
            if self.store.delete(&name).await? {
                self.observer.observe(&ArbiterEvent::GenerationEvicted { name: name.clone() });
                evicted.push(name);
            }
        }
        Ok(evicted)
    }

    async fn set_state(&self, next: LifecycleState) {
        let mut state = self.state.write().await;
        tracing::debug!(from = %*state, to = %next, version = self.version.tag(), "lifecycle transition");
        *state = next;
    }
}
