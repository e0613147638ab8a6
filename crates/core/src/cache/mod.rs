//! Partitioned response cache.
//!
//! Storage is addressed by partition name and request identity. It supports:
//!
//! - A [`CacheStore`] trait so the arbiter never depends on a backend
//! - A persistent SQLite backend (WAL mode, async access via tokio-rusqlite)
//! - A volatile in-memory backend
//! - Automatic schema migrations

pub mod connection;
pub mod entries;
pub mod hash;
pub mod memory;
pub mod migrations;
pub mod store;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::CacheEntry;
pub use memory::MemoryStore;
pub use store::CacheStore;
