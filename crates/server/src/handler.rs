//! MCP server handler implementation.
//!
//! Each tool call delivers one event to the worker, or inspects its buckets.
use std::sync::Arc;

use crate::tools::cache::{CacheKeysParams, keys_impl, list_impl};
use crate::tools::fetch::{FetchParams, fetch_impl};
use crate::tools::lifecycle::{MessageParams, activate_impl, install_impl, message_impl, status_impl};
use crate::worker::ServiceWorker;

use folio_client::Fetcher;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};

/// The MCP server handler for folio-sw.
#[derive(Clone)]
pub struct FolioWorkerServer {
    tool_router: ToolRouter<Self>,
    worker: Arc<ServiceWorker>,
    fetcher: Arc<dyn Fetcher>,
}

#[tool_router]
impl FolioWorkerServer {
    pub fn new(worker: Arc<ServiceWorker>, fetcher: Arc<dyn Fetcher>) -> Self {
        Self { tool_router: Self::tool_router(), worker, fetcher }
    }

    #[tool(description = "Run the install event: precache the manifest into the static bucket of the current version.")]
    async fn sw_install(&self) -> Result<CallToolResult, McpError> {
        install_impl(&self.worker).await
    }

    #[tool(
        description = "Run the activate event: enable navigation preload, delete buckets of other versions and claim clients."
    )]
    async fn sw_activate(&self) -> Result<CallToolResult, McpError> {
        activate_impl(&self.worker).await
    }

    /// Deliver a fetch event.
    ///
    /// Requests the worker does not intercept are fetched directly from the network.
    #[tool(
        description = "Deliver a fetch event. Navigations are network first, images cache first, scripts/styles/fonts stale-while-revalidate."
    )]
    async fn sw_fetch(&self, params: Parameters<FetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.worker, &self.fetcher, params.0).await
    }

    #[tool(description = "Post a message to the worker. {\"type\": \"SKIP_WAITING\"} activates a waiting worker.")]
    async fn sw_message(&self, params: Parameters<MessageParams>) -> Result<CallToolResult, McpError> {
        message_impl(&self.worker, params.0).await
    }

    #[tool(description = "Report the worker state and cache version.")]
    async fn sw_status(&self) -> Result<CallToolResult, McpError> {
        status_impl(&self.worker).await
    }

    #[tool(description = "List every cache bucket with its entry count.")]
    async fn cache_list(&self) -> Result<CallToolResult, McpError> {
        list_impl(self.worker.registry()).await
    }

    #[tool(description = "List the request keys stored in one bucket, oldest first.")]
    async fn cache_keys(&self, params: Parameters<CacheKeysParams>) -> Result<CallToolResult, McpError> {
        keys_impl(self.worker.registry(), params.0).await
    }
}

impl ServerHandler for FolioWorkerServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "folio-sw".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
