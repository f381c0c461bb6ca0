//! sw_fetch: deliver one request to the worker's fetch handler.

use std::sync::Arc;

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use folio_client::Fetcher;
use folio_core::url::normalize;
use folio_core::{Destination, Request, RequestMode, Response};

use crate::error::ToolError;
use crate::tools::json_result;
use crate::worker::strategies::navigation::Preload;
use crate::worker::{FetchEvent, FetchOutcome, ServiceWorker};

/// Parameters for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FetchParams {
    /// Absolute URL, or a path resolved against the site origin.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default = "default_method")]
    pub method: String,

    /// Request mode: "navigate", "same-origin", "no-cors" (default) or "cors".
    #[serde(default)]
    pub mode: Option<String>,

    /// Destination hint: "document", "image", "style", "script", "font", ...
    #[serde(default)]
    pub destination: Option<String>,

    /// Navigation preload delivered with the event.
    #[serde(default)]
    pub preload: Option<PreloadParams>,
}

fn default_method() -> String {
    "GET".into()
}

/// A preload response, or the reason the preload failed.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct PreloadParams {
    #[serde(default = "default_status")]
    pub status: u16,
    #[serde(default)]
    pub body: String,
    /// When set the preload is treated as failed and the rest is ignored.
    #[serde(default)]
    pub error: Option<String>,
}

fn default_status() -> u16 {
    200
}

impl From<PreloadParams> for Preload {
    fn from(params: PreloadParams) -> Self {
        match params.error {
            Some(reason) => Preload::Failed(reason),
            None => Preload::Ready(Response::new(params.status, params.body)),
        }
    }
}

/// Output of the sw_fetch tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct FetchOutput {
    pub url: String,
    /// Strategy the router picked.
    pub route: String,
    /// "respond", "passthrough" or "network_error".
    pub outcome: String,
    pub status: Option<u16>,
    pub status_text: Option<String>,
    pub content_type: Option<String>,
    pub headers: Vec<(String, String)>,
    /// Body decoded as UTF-8, lossily.
    pub body: Option<String>,
    pub body_bytes: usize,
    pub error: Option<String>,
}

impl FetchOutput {
    fn with_response(mut self, response: &Response) -> Self {
        self.status = Some(response.status);
        self.status_text = Some(response.status_text.clone());
        self.content_type = response.content_type().map(str::to_string);
        self.headers = response.headers.clone();
        self.body = Some(String::from_utf8_lossy(&response.body).into_owned());
        self.body_bytes = response.body.len();
        self
    }
}

/// Build the request the tool describes.
pub fn build_request(worker: &ServiceWorker, params: &FetchParams) -> Result<Request, ToolError> {
    let origin = &worker.settings().origin;
    let url = normalize(&params.url, origin).map_err(|e| ToolError::InvalidInput(format!("{}: {e}", params.url)))?;

    let method = params.method.trim();
    if method.is_empty() || !method.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(ToolError::InvalidInput(format!("invalid method: {:?}", params.method)));
    }

    let mode = match params.mode.as_deref() {
        Some(mode) => mode.parse::<RequestMode>().map_err(|e| ToolError::InvalidInput(e.to_string()))?,
        None => RequestMode::default(),
    };
    let destination = params.destination.as_deref().map(Destination::parse).unwrap_or_default();

    Ok(Request { mode, ..Request::get(url).with_method(method).with_destination(destination) })
}

/// Run the fetch handler. Requests the worker abstains from are fetched
/// directly, never through the cache.
pub async fn fetch_impl(
    worker: &ServiceWorker, fetcher: &Arc<dyn Fetcher>, params: FetchParams,
) -> Result<CallToolResult, McpError> {
    let request = build_request(worker, &params)?;
    let preload = params.preload.map(Preload::from).unwrap_or_default();
    let base = FetchOutput { url: request.url.to_string(), ..Default::default() };

    let output = match worker.on_fetch(FetchEvent::new(request.clone()).with_preload(preload)).await {
        FetchOutcome::Respond { route, response } => {
            FetchOutput { route: route.as_str().into(), outcome: "respond".into(), ..base }.with_response(&response)
        }
        FetchOutcome::Passthrough(route) => {
            let base = FetchOutput { route: route.as_str().into(), outcome: "passthrough".into(), ..base };
            match fetcher.fetch(&request).await {
                Ok(response) => base.with_response(&response),
                Err(e) => FetchOutput { error: Some(e.to_string()), ..base },
            }
        }
        FetchOutcome::NetworkError => FetchOutput {
            route: "navigation".into(),
            outcome: "network_error".into(),
            error: Some("no network, cached copy or offline page".into()),
            ..base
        },
    };

    json_result(&output)
}
