use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::RuntimeResult;

/// One agent invocation handed to the runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentInvocation {
    pub agent: String,
    pub model: String,
    pub system_prompt: String,
    pub tools: Vec<String>,
    pub input: String,
}

impl AgentInvocation {
    pub fn new(agent: impl Into<String>, model: impl Into<String>, input: impl Into<String>) -> Self {
        Self {
            agent: agent.into(),
            model: model.into(),
            system_prompt: String::new(),
            tools: Vec::new(),
            input: input.into(),
        }
    }

    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    pub fn with_tools(mut self, tools: Vec<String>) -> Self {
        self.tools = tools;
        self
    }
}

/// One named workflow step: an instruction for a specific agent plus the key
/// its output is stored under.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStep {
    pub name: String,
    pub description: String,
    pub agent: String,
    pub input: String,
    pub output_key: String,
}

/// A coordinator instruction plus the ordered step list, handed to the
/// runtime as a single invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowRequest {
    pub instruction: String,
    pub steps: Vec<WorkflowStep>,
}

/// A tool callback requested by the runtime.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

/// The structured result answering one tool callback.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResultMessage {
    pub id: String,
    pub output: Value,
}

/// Response from an agent or workflow invocation.
///
/// A non-empty `tool_calls` list means the runtime is waiting for tool
/// results before it can continue.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeResponse {
    #[serde(default)]
    pub execution_id: Option<String>,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub output: Option<String>,
    #[serde(default)]
    pub outputs: Option<serde_json::Map<String, Value>>,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
}

fn default_status() -> String {
    "completed".to_string()
}

impl RuntimeResponse {
    /// Whether the runtime finished without pending tool calls.
    pub fn is_complete(&self) -> bool {
        self.tool_calls.is_empty()
    }
}

/// The external agent runtime, as consumed by the orchestrator.
#[async_trait]
pub trait AgentRuntime: Send + Sync {
    /// Run one agent to completion, answering tool callbacks along the way.
    async fn run_agent(&self, invocation: AgentInvocation) -> RuntimeResult<RuntimeResponse>;

    /// Run a whole workflow under a single coordinating invocation.
    async fn run_workflow(&self, request: WorkflowRequest) -> RuntimeResult<RuntimeResponse>;
}
