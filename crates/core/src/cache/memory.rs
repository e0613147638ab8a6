//! In-memory [`CacheStore`] for tests and ephemeral deployments.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::store::{CacheStore, ensure_cacheable};
use crate::Error;
use crate::exchange::{ProxyRequest, ProxyResponse};

#[derive(Debug, Default)]
struct Partition {
    name: String,
    entries: HashMap<String, ProxyResponse>,
}

/// Volatile partitioned store.
///
/// Uses a Vec of partitions behind a tokio RwLock so enumeration keeps
/// creation order. Cloning shares the underlying storage.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    partitions: Arc<RwLock<Vec<Partition>>>,
    max_entries: Option<usize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store that refuses new entries once `max_entries` are held across all partitions.
    pub fn with_quota(max_entries: usize) -> Self {
        Self { max_entries: Some(max_entries), ..Self::default() }
    }

    /// Fail if inserting `incoming` new keys would exceed the quota. Overwrites are free.
    fn check_quota(&self, partitions: &[Partition], name: &str, incoming: &[String]) -> Result<(), Error> {
        let Some(max) = self.max_entries else {
            return Ok(());
        };
        let held: usize = partitions.iter().map(|p| p.entries.len()).sum();
        let existing = partitions.iter().find(|p| p.name == name);
        let mut fresh: Vec<&String> = incoming
            .iter()
            .filter(|key| existing.is_none_or(|p| !p.entries.contains_key(*key)))
            .collect();
        fresh.sort();
        fresh.dedup();
        if held + fresh.len() > max {
            return Err(Error::QuotaExceeded(format!("{held} of {max} entries in use")));
        }
        Ok(())
    }
}

fn partition_mut<'a>(partitions: &'a mut Vec<Partition>, name: &str) -> &'a mut Partition {
    match partitions.iter().position(|p| p.name == name) {
        Some(index) => &mut partitions[index],
        None => {
            partitions.push(Partition { name: name.to_string(), entries: HashMap::new() });
            let last = partitions.len() - 1;
            &mut partitions[last]
        }
    }
}

#[async_trait]
impl CacheStore for MemoryStore {
    async fn open(&self, name: &str) -> Result<(), Error> {
        let mut partitions = self.partitions.write().await;
        partition_mut(&mut partitions, name);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, Error> {
        let partitions = self.partitions.read().await;
        Ok(partitions.iter().map(|p| p.name.clone()).collect())
    }

    async fn delete(&self, name: &str) -> Result<bool, Error> {
        let mut partitions = self.partitions.write().await;
        let before = partitions.len();
        partitions.retain(|p| p.name != name);
        Ok(partitions.len() != before)
    }

    async fn match_request(&self, name: &str, request: &ProxyRequest) -> Result<Option<ProxyResponse>, Error> {
        if !request.is_get() {
            return Ok(None);
        }
        let partitions = self.partitions.read().await;
        Ok(partitions
            .iter()
            .find(|p| p.name == name)
            .and_then(|p| p.entries.get(&request.cache_key()))
            .cloned())
    }

    async fn put(&self, name: &str, request: &ProxyRequest, response: &ProxyResponse) -> Result<(), Error> {
        ensure_cacheable(request)?;
        let key = request.cache_key();
        let mut partitions = self.partitions.write().await;
        self.check_quota(&partitions, name, std::slice::from_ref(&key))?;
        partition_mut(&mut partitions, name)
            .entries
            .insert(key, response.clone());
        Ok(())
    }

    async fn put_all(&self, name: &str, entries: &[(ProxyRequest, ProxyResponse)]) -> Result<(), Error> {
        for (request, _) in entries {
            ensure_cacheable(request)?;
        }
        let keys: Vec<String> = entries.iter().map(|(request, _)| request.cache_key()).collect();
        let mut partitions = self.partitions.write().await;
        self.check_quota(&partitions, name, &keys)?;
        let partition = partition_mut(&mut partitions, name);
        for (key, (_, response)) in keys.into_iter().zip(entries) {
            partition.entries.insert(key, response.clone());
        }
        Ok(())
    }

    async fn entry_count(&self, name: &str) -> Result<u64, Error> {
        let partitions = self.partitions.read().await;
        Ok(partitions
            .iter()
            .find(|p| p.name == name)
            .map_or(0, |p| p.entries.len() as u64))
    }
}
