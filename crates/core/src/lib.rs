//! Core types and shared functionality for folio-sw.
//!
//! This crate provides:
//! - Request/response snapshots and URL normalization
//! - Versioned bucket storage with SQLite and in-memory backends
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;
pub mod request;
pub mod url;

pub use cache::{Bucket, CacheDb, CacheRegistry, CacheRole, CacheStorage, EvictionMode, MemoryStorage, VersionTag};
pub use config::AppConfig;
pub use error::Error;
pub use request::{Destination, Request, RequestKey, RequestMode, Response};
