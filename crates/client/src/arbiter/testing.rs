//! Fakes shared by the arbiter's unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use http::{Method, StatusCode};
use url::Url;
use waystation_core::{
    CacheStore, Destination, Error, MemoryStore, ProxyRequest, ProxyResponse, StaticManifest, VersionRegistry,
};

use super::{ArbiterEvent, ArbiterObserver, ArbiterSettings, CacheArbiter};
use crate::fetch::Network;

pub const ORIGIN: &str = "https://shop.example.com";

/// Network with canned responses; unknown URLs answer 404.
#[derive(Default)]
pub struct ScriptedNetwork {
    responses: Mutex<HashMap<String, ProxyResponse>>,
    offline: AtomicBool,
    requests: Mutex<Vec<(Method, String)>>,
}

impl ScriptedNetwork {
    pub fn respond(&self, path: &str, status: StatusCode, body: &str) {
        let url = Url::parse(ORIGIN).unwrap().join(path).unwrap();
        let response = ProxyResponse::new(status, body.to_string()).with_header("Content-Type", "text/plain");
        self.responses.lock().unwrap().insert(url.to_string(), response);
    }

    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<(Method, String)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Network for ScriptedNetwork {
    async fn fetch(&self, request: &ProxyRequest) -> Result<ProxyResponse, Error> {
        self.requests
            .lock()
            .unwrap()
            .push((request.method.clone(), request.url.to_string()));
        if self.offline.load(Ordering::SeqCst) {
            return Err(Error::Network(format!("{}: connection refused", request.url)));
        }
        let canned = self.responses.lock().unwrap().get(request.url.as_str()).cloned();
        Ok(canned.unwrap_or_else(|| ProxyResponse::new(StatusCode::NOT_FOUND, "not found")))
    }
}

#[derive(Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<ArbiterEvent>>,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<ArbiterEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ArbiterObserver for RecordingObserver {
    fn observe(&self, event: &ArbiterEvent) {
        self.events.lock().unwrap().push(event.clone());
    }
}

/// Memory store whose reads always fail.
pub struct UnreadableStore(pub MemoryStore);

#[async_trait]
impl CacheStore for UnreadableStore {
    async fn open(&self, name: &str) -> Result<(), Error> {
        self.0.open(name).await
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        self.0.keys().await
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        self.0.delete(name).await
    }

    async fn match_request(&self, _name: &str, request: &ProxyRequest) -> Result<Option<ProxyResponse>, Error> {
        Err(Error::CorruptEntry(format!("{}: unreadable", request.url)))
    }

    async fn put(&self, name: &str, request: &ProxyRequest, response: &ProxyResponse) -> Result<(), Error> {
        self.0.put(name, request, response).await
    }

    async fn put_all(&self, name: &str, entries: &[(ProxyRequest, ProxyResponse)]) -> Result<(), Error> {
        self.0.put_all(name, entries).await
    }

    async fn entry_count(&self, name: &str) -> Result<u64, Error> {
        self.0.entry_count(name).await
    }
}

pub struct Harness {
    pub arbiter: CacheArbiter,
    pub network: Arc<ScriptedNetwork>,
    pub store: MemoryStore,
    pub observer: Arc<RecordingObserver>,
}

impl Harness {
    pub fn new(paths: &[&str]) -> Self {
        Self::with_manifest(StaticManifest::new(paths.iter().map(|p| p.to_string()).collect()))
    }

    pub fn with_manifest(manifest: StaticManifest) -> Self {
        Self::build("v1", manifest, MemoryStore::new(), true)
    }

    pub fn build(version: &str, manifest: StaticManifest, store: MemoryStore, skip_waiting: bool) -> Self {
        Self::build_with_store(version, manifest, store.clone(), Arc::new(store), skip_waiting)
    }

    pub fn build_with_store(
        version: &str, manifest: StaticManifest, store: MemoryStore, handle: Arc<dyn CacheStore>, skip_waiting: bool,
    ) -> Self {
        let network = Arc::new(ScriptedNetwork::default());
        let observer = Arc::new(RecordingObserver::default());
        let settings = ArbiterSettings {
            origin: Url::parse(ORIGIN).unwrap(),
            default_document: "/index.html".into(),
            skip_waiting,
        };
        let arbiter = CacheArbiter::new(VersionRegistry::new(version), manifest, settings, handle, network.clone())
            .unwrap()
            .with_observer(observer.clone());
        Self { arbiter, network, store, observer }
    }

    pub fn request(&self, method: Method, path: &str) -> ProxyRequest {
        ProxyRequest::new(method, Url::parse(ORIGIN).unwrap().join(path).unwrap())
    }

    pub fn get(&self, path: &str) -> ProxyRequest {
        self.request(Method::GET, path)
    }

    pub fn navigate(&self, path: &str) -> ProxyRequest {
        self.get(path).with_destination(Destination::Document)
    }
}
