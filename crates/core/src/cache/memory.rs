//! In-memory [`CacheStorage`] for tests and ephemeral runs.

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::storage::CacheStorage;
use crate::Error;
use crate::request::{Request, RequestKey, Response};

struct MemoryBucket {
    name: String,
    /// Oldest first.
    entries: Vec<(RequestKey, Response)>,
}

impl MemoryBucket {
    fn new(name: &str) -> Self {
        Self { name: name.to_string(), entries: Vec::new() }
    }

    fn upsert(&mut self, key: RequestKey, response: Response) {
        self.entries.retain(|(k, _)| k.hash != key.hash);
        self.entries.push((key, response));
    }

    fn find(&self, hash: &str) -> Option<&Response> {
        self.entries.iter().find(|(k, _)| k.hash == hash).map(|(_, r)| r)
    }
}

/// Buckets held in process memory, in creation order.
#[derive(Default)]
pub struct MemoryStorage {
    buckets: RwLock<Vec<MemoryBucket>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

fn bucket_mut<'a>(buckets: &'a mut Vec<MemoryBucket>, name: &str) -> &'a mut MemoryBucket {
    match buckets.iter().position(|b| b.name == name) {
        Some(idx) => &mut buckets[idx],
        None => {
            buckets.push(MemoryBucket::new(name));
            let last = buckets.len() - 1;
            &mut buckets[last]
        }
    }
}

#[async_trait]
impl CacheStorage for MemoryStorage {
    async fn open(&self, bucket: &str) -> Result<(), Error> {
        let mut buckets = self.buckets.write().await;
        bucket_mut(&mut buckets, bucket);
        Ok(())
    }

    async fn has(&self, bucket: &str) -> Result<bool, Error> {
        Ok(self.buckets.read().await.iter().any(|b| b.name == bucket))
    }

    async fn names(&self) -> Result<Vec<String>, Error> {
        Ok(self.buckets.read().await.iter().map(|b| b.name.clone()).collect())
    }

    async fn delete(&self, bucket: &str) -> Result<bool, Error> {
        let mut buckets = self.buckets.write().await;
        let before = buckets.len();
        buckets.retain(|b| b.name != bucket);
        Ok(buckets.len() < before)
    }

    async fn put(&self, bucket: &str, request: &Request, response: &Response) -> Result<(), Error> {
        let mut buckets = self.buckets.write().await;
        bucket_mut(&mut buckets, bucket).upsert(request.key(), response.clone());
        Ok(())
    }

    async fn put_all(&self, bucket: &str, entries: &[(Request, Response)]) -> Result<(), Error> {
        let mut buckets = self.buckets.write().await;
        let target = bucket_mut(&mut buckets, bucket);
        for (request, response) in entries {
            target.upsert(request.key(), response.clone());
        }
        Ok(())
    }

    async fn match_in(&self, bucket: &str, request: &Request) -> Result<Option<Response>, Error> {
        let hash = request.key().hash;
        let buckets = self.buckets.read().await;
        Ok(buckets
            .iter()
            .find(|b| b.name == bucket)
            .and_then(|b| b.find(&hash))
            .cloned())
    }

    async fn match_any(&self, request: &Request) -> Result<Option<Response>, Error> {
        let hash = request.key().hash;
        let buckets = self.buckets.read().await;
        Ok(buckets.iter().find_map(|b| b.find(&hash)).cloned())
    }

    async fn keys(&self, bucket: &str) -> Result<Vec<RequestKey>, Error> {
        let buckets = self.buckets.read().await;
        Ok(buckets
            .iter()
            .find(|b| b.name == bucket)
            .map(|b| b.entries.iter().map(|(k, _)| k.clone()).collect())
            .unwrap_or_default())
    }

    async fn delete_entry(&self, bucket: &str, key: &RequestKey) -> Result<bool, Error> {
        let mut buckets = self.buckets.write().await;
        let Some(target) = buckets.iter_mut().find(|b| b.name == bucket) else {
            return Ok(false);
        };
        let before = target.entries.len();
        target.entries.retain(|(k, _)| k.hash != key.hash);
        Ok(target.entries.len() < before)
    }

    async fn count(&self, bucket: &str) -> Result<usize, Error> {
        let buckets = self.buckets.read().await;
        Ok(buckets.iter().find(|b| b.name == bucket).map_or(0, |b| b.entries.len()))
    }
}
