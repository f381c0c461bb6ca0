//! Versioned response cache.
//!
//! This module provides named buckets of response snapshots behind the
//! [`CacheStorage`] trait. It supports:
//!
//! - Persistent storage in SQLite via tokio-rusqlite (WAL mode, migrations)
//! - An in-memory store with the same semantics
//! - Version-tagged bucket names per role
//! - Oldest-first eviction for bounded buckets

pub mod connection;
pub mod entries;
pub mod eviction;
pub mod hash;
pub mod memory;
pub mod migrations;
pub mod registry;
pub mod storage;

pub use crate::Error;

pub use connection::CacheDb;
pub use eviction::{EvictionMode, trim};
pub use memory::MemoryStorage;
pub use registry::{Bucket, CacheRegistry, CacheRole, VersionTag};
pub use storage::CacheStorage;
