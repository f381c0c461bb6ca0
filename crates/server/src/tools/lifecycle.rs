//! sw_install, sw_activate, sw_message and sw_status.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::tools::json_result;
use crate::worker::lifecycle::{ActivateReport, InstallReport, WorkerState};
use crate::worker::{MessageOutcome, ServiceWorker};

#[derive(Debug, Clone, Serialize)]
pub struct InstallOutput {
    pub state: WorkerState,
    #[serde(flatten)]
    pub report: InstallReport,
}

pub async fn install_impl(worker: &ServiceWorker) -> Result<CallToolResult, McpError> {
    let report = worker.on_install().await?;
    json_result(&InstallOutput { state: worker.state(), report })
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivateOutput {
    pub state: WorkerState,
    #[serde(flatten)]
    pub report: ActivateReport,
}

pub async fn activate_impl(worker: &ServiceWorker) -> Result<CallToolResult, McpError> {
    let report = worker.on_activate().await?;
    json_result(&ActivateOutput { state: worker.state(), report })
}

/// Parameters for the sw_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MessageParams {
    /// Message payload as a page would post it, e.g. `{"type": "SKIP_WAITING"}`.
    pub data: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageOutput {
    /// `ignored` or `skip_waiting`.
    pub handled: &'static str,
    pub state: WorkerState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activated: Option<ActivateReport>,
}

pub async fn message_impl(worker: &ServiceWorker, params: MessageParams) -> Result<CallToolResult, McpError> {
    let output = match worker.on_message(&params.data).await? {
        MessageOutcome::Ignored => MessageOutput { handled: "ignored", state: worker.state(), activated: None },
        MessageOutcome::SkipWaiting { activated } => {
            MessageOutput { handled: "skip_waiting", state: worker.state(), activated }
        }
    };
    json_result(&output)
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusOutput {
    pub state: WorkerState,
    pub version: String,
    pub skip_waiting_requested: bool,
    pub pending_background_tasks: usize,
}

pub async fn status_impl(worker: &ServiceWorker) -> Result<CallToolResult, McpError> {
    json_result(&StatusOutput {
        state: worker.state(),
        version: worker.registry().version().as_str().to_string(),
        skip_waiting_requested: worker.skip_waiting_requested(),
        pending_background_tasks: worker.pending_background_tasks(),
    })
}
