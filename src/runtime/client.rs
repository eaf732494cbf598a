use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use super::types::{
    AgentInvocation, AgentRuntime, RuntimeResponse, ToolResultMessage, WorkflowRequest,
};
use crate::config::{RequestConfig, RuntimeConfig};
use crate::error::{RuntimeError, RuntimeResult};
use crate::observability::{AgentEvent, AgentEventLogger};
use crate::tools::{dispatch_tool, ToolContext};

/// Cap on tool-callback rounds for one invocation.
const MAX_TOOL_ROUNDS: usize = 20;

/// HTTP client for the agent runtime API.
pub struct AgentRuntimeClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    request_config: RequestConfig,
    tools: Option<ToolContext>,
    events: Option<AgentEventLogger>,
}

impl AgentRuntimeClient {
    /// Create a new runtime client
    pub fn new(config: &RuntimeConfig, request_config: RequestConfig) -> RuntimeResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_millis(request_config.timeout_ms))
            .build()
            .map_err(RuntimeError::Http)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            request_config,
            tools: None,
            events: None,
        })
    }

    /// Attach the tool context that answers runtime tool callbacks.
    pub fn with_tool_context(mut self, tools: ToolContext) -> Self {
        self.tools = Some(tools);
        self
    }

    /// Attach an event logger mirroring runtime activity into structured logs.
    pub fn with_event_logger(mut self, events: AgentEventLogger) -> Self {
        self.events = Some(events);
        self
    }

    /// Get the base URL (for testing)
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn emit(&self, event: AgentEvent) {
        if let Some(events) = &self.events {
            events.handle(&event);
        }
    }

    async fn invoke(
        &self,
        run_path: &str,
        continue_path: &str,
        body: Value,
        label: &str,
    ) -> RuntimeResult<RuntimeResponse> {
        let start = Instant::now();
        self.emit(AgentEvent::InvocationStarted { execution_id: None });

        let result = self.invoke_inner(run_path, continue_path, body, label).await;

        match &result {
            Ok(response) => {
                self.emit(AgentEvent::InvocationCompleted {
                    execution_id: response.execution_id.clone(),
                    duration_ms: start.elapsed().as_millis() as i64,
                });
            }
            Err(e) => {
                self.emit(AgentEvent::InvocationFailed {
                    error: e.to_string(),
                });
            }
        }

        result
    }

    async fn invoke_inner(
        &self,
        run_path: &str,
        continue_path: &str,
        body: Value,
        label: &str,
    ) -> RuntimeResult<RuntimeResponse> {
        let mut response = self
            .post_with_retry(&format!("{}{}", self.base_url, run_path), &body, label)
            .await?;

        let mut rounds = 0;
        while !response.is_complete() {
            rounds += 1;
            if rounds > MAX_TOOL_ROUNDS {
                return Err(RuntimeError::InvalidResponse {
                    message: format!("Tool callback rounds exceeded {MAX_TOOL_ROUNDS}"),
                });
            }

            let tools = self.tools.as_ref().ok_or_else(|| RuntimeError::InvalidResponse {
                message: "Runtime requested tool calls but no tool context is attached"
                    .to_string(),
            })?;

            let execution_id =
                response
                    .execution_id
                    .clone()
                    .ok_or_else(|| RuntimeError::InvalidResponse {
                        message: "Tool calls received without an execution id".to_string(),
                    })?;

            let mut tool_results = Vec::new();
            for call in &response.tool_calls {
                let tool_start = Instant::now();
                self.emit(AgentEvent::ToolCalled {
                    tool_name: call.name.clone(),
                });

                let output = dispatch_tool(tools, &call.name, &call.arguments).await;

                self.emit(AgentEvent::ToolCompleted {
                    tool_name: call.name.clone(),
                    duration_ms: tool_start.elapsed().as_millis() as i64,
                });
                tool_results.push(ToolResultMessage {
                    id: call.id.clone(),
                    output,
                });
            }

            let continue_body = json!({
                "executionId": execution_id,
                "toolResults": tool_results,
            });

            response = self
                .post_with_retry(
                    &format!("{}{}", self.base_url, continue_path),
                    &continue_body,
                    label,
                )
                .await?;
        }

        Ok(response)
    }

    /// POST with bounded retries and exponential backoff.
    async fn post_with_retry(
        &self,
        url: &str,
        body: &Value,
        label: &str,
    ) -> RuntimeResult<RuntimeResponse> {
        let mut last_error = None;
        let mut retries = 0;

        while retries <= self.request_config.max_retries {
            if retries > 0 {
                let delay = Duration::from_millis(
                    self.request_config.retry_delay_ms * (2_u64.pow(retries - 1)),
                );
                warn!(
                    invocation = label,
                    retry = retries,
                    delay_ms = delay.as_millis(),
                    "Retrying agent runtime request"
                );
                tokio::time::sleep(delay).await;
            }

            let start = Instant::now();

            match self.execute_request(url, body).await {
                Ok(response) => {
                    info!(
                        invocation = label,
                        latency_ms = start.elapsed().as_millis(),
                        "Agent runtime call succeeded"
                    );
                    return Ok(response);
                }
                Err(e) => {
                    error!(
                        invocation = label,
                        error = %e,
                        latency_ms = start.elapsed().as_millis(),
                        retry = retries,
                        "Agent runtime call failed"
                    );
                    last_error = Some(e);
                    retries += 1;
                }
            }
        }

        Err(RuntimeError::Unavailable {
            message: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "Unknown error".to_string()),
            retries,
        })
    }

    /// Execute a single request (internal)
    async fn execute_request(&self, url: &str, body: &Value) -> RuntimeResult<RuntimeResponse> {
        debug!(url, "Calling agent runtime");

        let mut request = self
            .client
            .post(url)
            .header("Content-Type", "application/json")
            .json(body);

        if let Some(api_key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {api_key}"));
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                RuntimeError::Timeout {
                    timeout_ms: self.request_config.timeout_ms,
                }
            } else {
                RuntimeError::Http(e)
            }
        })?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(RuntimeError::Api {
                status: status.as_u16(),
                message: error_body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| RuntimeError::InvalidResponse {
                message: format!("Failed to parse response: {e}"),
            })
    }
}

#[async_trait]
impl AgentRuntime for AgentRuntimeClient {
    async fn run_agent(&self, invocation: AgentInvocation) -> RuntimeResult<RuntimeResponse> {
        let label = invocation.agent.clone();
        let body = serde_json::to_value(&invocation).map_err(|e| RuntimeError::InvalidResponse {
            message: format!("Failed to encode invocation: {e}"),
        })?;
        self.invoke("/v1/agents/run", "/v1/agents/continue", body, &label)
            .await
    }

    async fn run_workflow(&self, request: WorkflowRequest) -> RuntimeResult<RuntimeResponse> {
        let body = serde_json::to_value(&request).map_err(|e| RuntimeError::InvalidResponse {
            message: format!("Failed to encode workflow request: {e}"),
        })?;
        self.invoke(
            "/v1/workflows/run",
            "/v1/workflows/continue",
            body,
            "chaos-workflow",
        )
        .await
    }
}
