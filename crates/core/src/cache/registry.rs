//! Versioned bucket registry.
//!
//! Bucket names are `{role}-cache-{version}`. One deployment shares a single
//! version across all roles, so bumping it retires every old bucket at once.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::storage::CacheStorage;
use crate::Error;
use crate::request::{Request, RequestKey, Response};

/// Role of a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheRole {
    /// Precached shell plus navigations. Unbounded.
    Static,
    /// Scripts, styles and fonts.
    Dynamic,
    Images,
}

impl CacheRole {
    pub const ALL: [CacheRole; 3] = [CacheRole::Static, CacheRole::Dynamic, CacheRole::Images];

    pub fn as_str(&self) -> &'static str {
        match self {
            CacheRole::Static => "static",
            CacheRole::Dynamic => "dynamic",
            CacheRole::Images => "images",
        }
    }

    /// Whether writes to this role are followed by eviction.
    pub fn is_bounded(&self) -> bool {
        !matches!(self, CacheRole::Static)
    }

    pub fn bucket_name(&self, version: &VersionTag) -> String {
        format!("{}-cache-{}", self.as_str(), version)
    }
}

impl fmt::Display for CacheRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Deployment version shared by all bucket roles.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionTag(String);

impl VersionTag {
    pub fn new(version: impl Into<String>) -> Self {
        Self(version.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The bucket names this version owns, one per role.
    pub fn bucket_names(&self) -> Vec<String> {
        CacheRole::ALL.iter().map(|role| role.bucket_name(self)).collect()
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Handle to one named bucket.
#[derive(Clone)]
pub struct Bucket {
    name: String,
    role: CacheRole,
    storage: Arc<dyn CacheStorage>,
}

impl Bucket {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn role(&self) -> CacheRole {
        self.role
    }

    pub async fn put(&self, request: &Request, response: &Response) -> Result<(), Error> {
        self.storage.put(&self.name, request, response).await
    }

    /// Store a batch atomically.
    pub async fn put_all(&self, entries: &[(Request, Response)]) -> Result<(), Error> {
        self.storage.put_all(&self.name, entries).await
    }

    /// Keys oldest first.
    pub async fn keys(&self) -> Result<Vec<RequestKey>, Error> {
        self.storage.keys(&self.name).await
    }

    pub async fn match_request(&self, request: &Request) -> Result<Option<Response>, Error> {
        self.storage.match_in(&self.name, request).await
    }

    pub async fn delete_entry(&self, key: &RequestKey) -> Result<bool, Error> {
        self.storage.delete_entry(&self.name, key).await
    }

    pub async fn count(&self) -> Result<usize, Error> {
        self.storage.count(&self.name).await
    }
}

impl fmt::Debug for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bucket").field("name", &self.name).field("role", &self.role).finish()
    }
}

/// Storage bound to the current [`VersionTag`].
#[derive(Clone)]
pub struct CacheRegistry {
    storage: Arc<dyn CacheStorage>,
    version: VersionTag,
}

impl CacheRegistry {
    pub fn new(storage: Arc<dyn CacheStorage>, version: VersionTag) -> Self {
        Self { storage, version }
    }

    pub fn version(&self) -> &VersionTag {
        &self.version
    }

    /// Handle to the current bucket for `role` without touching storage.
    ///
    /// The bucket is created by its first write.
    pub fn bucket(&self, role: CacheRole) -> Bucket {
        Bucket { name: role.bucket_name(&self.version), role, storage: Arc::clone(&self.storage) }
    }

    /// Open (creating if absent) the current bucket for `role`.
    pub async fn open(&self, role: CacheRole) -> Result<Bucket, Error> {
        let bucket = self.bucket(role);
        self.storage.open(bucket.name()).await?;
        Ok(bucket)
    }

    /// Look the request up across every bucket, current or not.
    pub async fn match_request(&self, request: &Request) -> Result<Option<Response>, Error> {
        self.storage.match_any(request).await
    }

    pub async fn bucket_names(&self) -> Result<Vec<String>, Error> {
        self.storage.names().await
    }

    pub async fn delete_bucket(&self, name: &str) -> Result<bool, Error> {
        self.storage.delete(name).await
    }

    /// Entry keys of any bucket by name.
    pub async fn keys_of(&self, name: &str) -> Result<Vec<RequestKey>, Error> {
        if !self.storage.has(name).await? {
            return Err(Error::BucketNotFound(name.to_string()));
        }
        self.storage.keys(name).await
    }

    pub async fn count_of(&self, name: &str) -> Result<usize, Error> {
        self.storage.count(name).await
    }

    /// Names owned by the current version.
    pub fn current_names(&self) -> Vec<String> {
        self.version.bucket_names()
    }

    /// Existing buckets that the current version does not own.
    pub async fn stale_names(&self) -> Result<Vec<String>, Error> {
        let current = self.current_names();
        Ok(self
            .bucket_names()
            .await?
            .into_iter()
            .filter(|name| !current.contains(name))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStorage;
    use url::Url;

    fn registry(version: &str, storage: Arc<dyn CacheStorage>) -> CacheRegistry {
        CacheRegistry::new(storage, VersionTag::new(version))
    }

    #[test]
    fn test_bucket_names() {
        let names = VersionTag::new("1.0.1").bucket_names();
        assert_eq!(names, vec!["static-cache-1.0.1", "dynamic-cache-1.0.1", "images-cache-1.0.1"]);
    }

    #[test]
    fn test_static_unbounded() {
        assert!(!CacheRole::Static.is_bounded());
        assert!(CacheRole::Dynamic.is_bounded());
        assert!(CacheRole::Images.is_bounded());
    }

    #[tokio::test]
    async fn test_open_creates_bucket() {
        let storage: Arc<dyn CacheStorage> = Arc::new(MemoryStorage::new());
        let reg = registry("v1", Arc::clone(&storage));
        let bucket = reg.open(CacheRole::Images).await.unwrap();

        assert_eq!(bucket.name(), "images-cache-v1");
        assert_eq!(bucket.role(), CacheRole::Images);
        assert_eq!(reg.bucket_names().await.unwrap(), vec!["images-cache-v1"]);
    }

    #[tokio::test]
    async fn test_stale_names_across_versions() {
        let storage: Arc<dyn CacheStorage> = Arc::new(MemoryStorage::new());
        let old = registry("v1", Arc::clone(&storage));
        old.open(CacheRole::Static).await.unwrap();
        old.open(CacheRole::Images).await.unwrap();

        let new = registry("v2", Arc::clone(&storage));
        new.open(CacheRole::Static).await.unwrap();

        assert_eq!(new.stale_names().await.unwrap(), vec!["static-cache-v1", "images-cache-v1"]);
    }

    #[tokio::test]
    async fn test_keys_of_missing_bucket() {
        let reg = registry("v1", Arc::new(MemoryStorage::new()));
        let result = reg.keys_of("static-cache-v9").await;
        assert!(matches!(result, Err(Error::BucketNotFound(_))));
    }

    #[tokio::test]
    async fn test_match_request_searches_all_buckets() {
        let storage: Arc<dyn CacheStorage> = Arc::new(MemoryStorage::new());
        let old = registry("v1", Arc::clone(&storage));
        let req = Request::get(Url::parse("https://folio.example/logo.svg").unwrap());
        old.open(CacheRole::Images)
            .await
            .unwrap()
            .put(&req, &Response::new(200, "<svg/>"))
            .await
            .unwrap();

        let new = registry("v2", storage);
        assert!(new.match_request(&req).await.unwrap().is_some());
    }
}
