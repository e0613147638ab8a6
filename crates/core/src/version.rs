//! Version registry: the single tag that decides which cache generation is live.

use std::fmt;

/// The two partitions that make up a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Partition {
    /// Pre-cached manifest assets.
    Static,
    /// Responses captured at runtime.
    Dynamic,
}

impl Partition {
    pub fn prefix(self) -> &'static str {
        match self {
            Partition::Static => "static",
            Partition::Dynamic => "dynamic",
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Holds the current version tag and derives partition names from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRegistry {
    tag: String,
}

impl VersionRegistry {
    pub fn new(tag: impl Into<String>) -> Self {
        Self { tag: tag.into() }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Storage name of a partition in the current generation, e.g. `static-v3`.
    pub fn partition_name(&self, partition: Partition) -> String {
        format!("{}-{}", partition.prefix(), self.tag)
    }

    /// Both live partition names, static first.
    pub fn live_partitions(&self) -> [String; 2] {
        [self.partition_name(Partition::Static), self.partition_name(Partition::Dynamic)]
    }

    /// Whether a stored partition belongs to the current generation.
    pub fn is_live(&self, name: &str) -> bool {
        self.live_partitions().iter().any(|live| live == name)
    }

    /// Recover the generation a stored partition name belongs to.
    ///
    /// Returns `None` for names that are not `static-<tag>` or `dynamic-<tag>`.
    pub fn from_partition_name(name: &str) -> Option<Self> {
        [Partition::Static, Partition::Dynamic].into_iter().find_map(|partition| {
            name.strip_prefix(partition.prefix())
                .and_then(|rest| rest.strip_prefix('-'))
                .filter(|tag| !tag.is_empty())
                .map(Self::new)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partition_names() {
        let registry = VersionRegistry::new("v3");
        assert_eq!(registry.partition_name(Partition::Static), "static-v3");
        assert_eq!(registry.partition_name(Partition::Dynamic), "dynamic-v3");
    }

    #[test]
    fn test_is_live() {
        let registry = VersionRegistry::new("v3");
        assert!(registry.is_live("static-v3"));
        assert!(registry.is_live("dynamic-v3"));
        assert!(!registry.is_live("static-v2"));
        assert!(!registry.is_live("static-v30"));
        assert!(!registry.is_live("other-cache"));
    }

    #[test]
    fn test_from_partition_name() {
        assert_eq!(VersionRegistry::from_partition_name("static-v2"), Some(VersionRegistry::new("v2")));
        assert_eq!(VersionRegistry::from_partition_name("dynamic-2024-05"), Some(VersionRegistry::new("2024-05")));
        assert_eq!(VersionRegistry::from_partition_name("static-"), None);
        assert_eq!(VersionRegistry::from_partition_name("staticv2"), None);
        assert_eq!(VersionRegistry::from_partition_name("thumbnails"), None);
    }
}
