//! Cache inspection MCP tools.
//!
//! This module provides read-only views over the arbiter's cache store.

pub mod get;
pub mod list;

pub use get::{CacheGetParams, get_impl};
pub use list::list_impl;
