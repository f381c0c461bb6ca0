//! Storage interface behind the cache registry.
//!
//! Mirrors the browser cache storage surface (open/match/put/delete/keys) so
//! the worker can run against SQLite or memory without knowing which.

use async_trait::async_trait;

use crate::Error;
use crate::request::{Request, RequestKey, Response};

/// Named buckets of response snapshots keyed by request identity.
///
/// Every call is individually atomic. Callers get no cross-call locking.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Create the bucket if it does not exist yet.
    async fn open(&self, bucket: &str) -> Result<(), Error>;

    async fn has(&self, bucket: &str) -> Result<bool, Error>;

    /// All bucket names in creation order.
    async fn names(&self) -> Result<Vec<String>, Error>;

    /// Delete a bucket and all its entries. Returns false if it did not exist.
    async fn delete(&self, bucket: &str) -> Result<bool, Error>;

    /// Store or overwrite one entry. An overwritten key becomes the newest.
    async fn put(&self, bucket: &str, request: &Request, response: &Response) -> Result<(), Error>;

    /// Create the bucket and store every entry, or store nothing.
    async fn put_all(&self, bucket: &str, entries: &[(Request, Response)]) -> Result<(), Error>;

    async fn match_in(&self, bucket: &str, request: &Request) -> Result<Option<Response>, Error>;

    /// Search every bucket in creation order and return the first hit.
    async fn match_any(&self, request: &Request) -> Result<Option<Response>, Error>;

    /// Keys of a bucket, oldest first. Missing buckets have no keys.
    async fn keys(&self, bucket: &str) -> Result<Vec<RequestKey>, Error>;

    /// Remove one entry. Returns false if it was not present.
    async fn delete_entry(&self, bucket: &str, key: &RequestKey) -> Result<bool, Error>;

    async fn count(&self, bucket: &str) -> Result<usize, Error>;
}
