//! cache_list tool implementation.
//!
//! Lists every bucket in storage with its entry count.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use folio_core::CacheRegistry;

use crate::tools::json_result;

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct BucketSummary {
    pub name: String,
    pub entries: usize,
    /// Whether the bucket belongs to the running version.
    pub current: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheListOutput {
    pub version: String,
    pub buckets: Vec<BucketSummary>,
}

pub async fn list_impl(registry: &CacheRegistry) -> Result<CallToolResult, McpError> {
    let current = registry.current_names();
    let mut buckets = Vec::new();
    for name in registry.bucket_names().await? {
        let entries = registry.count_of(&name).await?;
        buckets.push(BucketSummary { current: current.contains(&name), entries, name });
    }

    json_result(&CacheListOutput { version: registry.version().as_str().to_string(), buckets })
}
