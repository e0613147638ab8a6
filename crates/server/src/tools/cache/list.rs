//! cache_list tool implementation.
//!
//! Lists every partition in the store with its entry count, alongside the
//! arbiter's lifecycle state.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::Serialize;
use waystation_client::{CacheArbiter, LifecycleState};
use waystation_core::CacheStore;

use crate::tools::json_result;

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct PartitionSummary {
    pub name: String,
    pub entries: u64,
    /// Whether the partition belongs to the configured version.
    pub live: bool,
}

/// Output from the cache_list tool.
#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct CacheListOutput {
    pub version: String,
    /// Generation requests are served from; differs from `version` until activation.
    pub serving: String,
    pub state: LifecycleState,
    pub clients_claimed: bool,
    /// Partitions in creation order.
    pub partitions: Vec<PartitionSummary>,
}

/// Implementation of the cache_list tool.
pub async fn list_impl(arbiter: &CacheArbiter) -> Result<CallToolResult, McpError> {
    let store = arbiter.store();
    let mut partitions = Vec::new();
    for name in store.keys().await? {
        let entries = store.entry_count(&name).await?;
        let live = arbiter.version().is_live(&name);
        partitions.push(PartitionSummary { name, entries, live });
    }

    let output = CacheListOutput {
        version: arbiter.version().tag().to_string(),
        serving: arbiter.serving_version().await.tag().to_string(),
        state: arbiter.state().await,
        clients_claimed: arbiter.clients_claimed(),
        partitions,
    };

    json_result(&output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::test_support::{arbiter, output};
    use waystation_core::{CacheStore, MemoryStore};

    #[tokio::test]
    async fn test_list_empty() {
        let arbiter = arbiter("https://shop.example.com", &["/"], MemoryStore::new());

        let out = output(&list_impl(&arbiter).await.unwrap());

        assert_eq!(out["version"], "v1");
        assert_eq!(out["serving"], "v1");
        assert_eq!(out["state"], "idle");
        assert_eq!(out["clients_claimed"], false);
        assert_eq!(out["partitions"], serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_list_marks_live_partitions() {
        let store = MemoryStore::new();
        store.open("static-v0").await.unwrap();
        store.open("static-v1").await.unwrap();
        let arbiter = arbiter("https://shop.example.com", &["/"], store);

        let out = output(&list_impl(&arbiter).await.unwrap());

        assert_eq!(out["partitions"][0]["name"], "static-v0");
        assert_eq!(out["partitions"][0]["live"], false);
        assert_eq!(out["partitions"][1]["name"], "static-v1");
        assert_eq!(out["partitions"][1]["live"], true);
        assert_eq!(out["partitions"][1]["entries"], 0);
    }
}
