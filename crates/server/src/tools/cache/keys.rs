//! cache_keys tool implementation.
//!
//! Lists the request keys of one bucket, oldest first.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use folio_core::{CacheRegistry, RequestKey};

use crate::tools::json_result;

/// Parameters for the cache_keys tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheKeysParams {
    /// Bucket name, e.g. "images-cache-1.0.1".
    pub bucket: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CacheKeysOutput {
    pub bucket: String,
    pub keys: Vec<RequestKey>,
}

pub async fn keys_impl(registry: &CacheRegistry, params: CacheKeysParams) -> Result<CallToolResult, McpError> {
    let keys = registry.keys_of(&params.bucket).await?;
    json_result(&CacheKeysOutput { bucket: params.bucket, keys })
}
