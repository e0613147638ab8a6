//! Core types and shared functionality for waystation.
//!
//! This crate provides:
//! - Request/response model for intercepted traffic
//! - Cache store abstraction with SQLite and in-memory backends
//! - Version registry and static manifest classification
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod exchange;
pub mod manifest;
pub mod version;

pub use cache::{CacheDb, CacheEntry, CacheStore, MemoryStore};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
pub use exchange::{Destination, ProxyRequest, ProxyResponse};
pub use manifest::{MatchMode, StaticManifest};
pub use version::{Partition, VersionRegistry};
