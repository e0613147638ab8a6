//! Cache store abstraction.
//!
//! Storage is split into named partitions (`static-v3`, `dynamic-v3`, ...)
//! each holding request → response snapshots. Implementations must keep
//! two guarantees: only GET requests are ever stored, and concurrent writes
//! to the same key resolve last-write-wins.

use async_trait::async_trait;

use crate::Error;
use crate::exchange::{ProxyRequest, ProxyResponse};

/// Named-partition storage of GET responses.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Create the partition if it does not already exist.
    async fn open(&self, name: &str) -> Result<(), Error>;

    /// Names of every existing partition, in creation order.
    async fn keys(&self) -> Result<Vec<String>, Error>;

    /// Delete a partition and all of its entries. Returns false if it did not exist.
    async fn delete(&self, name: &str) -> Result<bool, Error>;

    /// Look up the stored response for a request.
    ///
    /// Non-GET requests never match.
    async fn match_request(&self, name: &str, request: &ProxyRequest) -> Result<Option<ProxyResponse>, Error>;

    /// Store a response, replacing any previous entry for the same request.
    ///
    /// Opens the partition implicitly. Fails with [`Error::UnsupportedMethod`]
    /// for non-GET requests.
    async fn put(&self, name: &str, request: &ProxyRequest, response: &ProxyResponse) -> Result<(), Error>;

    /// Store several entries atomically: either all are written or none are.
    async fn put_all(&self, name: &str, entries: &[(ProxyRequest, ProxyResponse)]) -> Result<(), Error>;

    /// Number of entries held by a partition (0 if it does not exist).
    async fn entry_count(&self, name: &str) -> Result<u64, Error>;
}

pub(crate) fn ensure_cacheable(request: &ProxyRequest) -> Result<(), Error> {
    if request.is_get() { Ok(()) } else { Err(Error::UnsupportedMethod(request.method.to_string())) }
}
