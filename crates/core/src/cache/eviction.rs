//! Oldest-first eviction for bounded buckets.

use serde::{Deserialize, Serialize};

use super::registry::Bucket;
use crate::Error;

/// How much a single trim call removes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionMode {
    /// Remove at most the single oldest entry per call.
    ///
    /// Bursty concurrent writes can leave the bucket above the bound until
    /// later writes catch up.
    #[default]
    Oldest,
    /// Remove oldest entries until the bucket is within the bound.
    Sweep,
}

/// Trim `bucket` towards `max_items`, oldest entries first.
///
/// Returns the number of removed entries.
pub async fn trim(bucket: &Bucket, max_items: usize, mode: EvictionMode) -> Result<usize, Error> {
    let keys = bucket.keys().await?;
    if keys.len() <= max_items {
        return Ok(0);
    }

    let overflow = keys.len() - max_items;
    let victims = match mode {
        EvictionMode::Oldest => 1,
        EvictionMode::Sweep => overflow,
    };

    let mut removed = 0;
    for key in keys.iter().take(victims) {
        if bucket.delete_entry(key).await? {
            removed += 1;
        }
    }

    if overflow > victims {
        tracing::debug!(
            bucket = bucket.name(),
            remaining_overflow = overflow - victims,
            "bucket still above bound after trim"
        );
    } else {
        tracing::debug!(bucket = bucket.name(), removed, "trimmed bucket");
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheRegistry, CacheRole, CacheStorage, MemoryStorage, VersionTag};
    use crate::request::{Request, Response};
    use std::sync::Arc;
    use url::Url;

    fn request(n: usize) -> Request {
        Request::get(Url::parse(&format!("https://folio.example/img/{n}.png")).unwrap())
    }

    async fn filled_bucket(n: usize) -> Bucket {
        let storage: Arc<dyn CacheStorage> = Arc::new(MemoryStorage::new());
        let bucket = CacheRegistry::new(storage, VersionTag::new("v1")).bucket(CacheRole::Images);
        for i in 0..n {
            bucket.put(&request(i), &Response::new(200, format!("{i}"))).await.unwrap();
        }
        bucket
    }

    #[tokio::test]
    async fn test_trim_within_bound_is_noop() {
        let bucket = filled_bucket(3).await;
        assert_eq!(trim(&bucket, 3, EvictionMode::Oldest).await.unwrap(), 0);
        assert_eq!(bucket.count().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_oldest_removes_single_entry() {
        let bucket = filled_bucket(5).await;
        assert_eq!(trim(&bucket, 2, EvictionMode::Oldest).await.unwrap(), 1);

        let keys = bucket.keys().await.unwrap();
        assert_eq!(keys.len(), 4);
        assert_eq!(keys[0].url, "https://folio.example/img/1.png");
    }

    #[tokio::test]
    async fn test_sweep_reaches_bound() {
        let bucket = filled_bucket(5).await;
        assert_eq!(trim(&bucket, 2, EvictionMode::Sweep).await.unwrap(), 3);

        let urls: Vec<String> = bucket.keys().await.unwrap().into_iter().map(|k| k.url).collect();
        assert_eq!(urls, vec!["https://folio.example/img/3.png", "https://folio.example/img/4.png"]);
    }

    #[tokio::test]
    async fn test_serial_writes_stay_bounded() {
        let bucket = filled_bucket(0).await;
        for i in 0..20 {
            bucket.put(&request(i), &Response::new(200, "x")).await.unwrap();
            trim(&bucket, 5, EvictionMode::Oldest).await.unwrap();
            assert!(bucket.count().await.unwrap() <= 5);
        }
    }
}
