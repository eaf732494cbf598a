//! Agent runtime client tests using wiremock for the HTTP surface.

mod common;

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use chaos_agent::config::{AppContext, Config, RequestConfig, RuntimeConfig};
use chaos_agent::error::RuntimeError;
use chaos_agent::runtime::{
    AgentInvocation, AgentRuntime, AgentRuntimeClient, WorkflowRequest, WorkflowStep,
};
use chaos_agent::tools::ToolContext;

use common::{id_response, FakeExecutor, FakeStackMetadata};

fn test_client(base_url: &str) -> AgentRuntimeClient {
    let config = RuntimeConfig {
        base_url: base_url.to_string(),
        api_key: Some("test-api-key".to_string()),
    };
    let request_config = RequestConfig {
        timeout_ms: 5000,
        max_retries: 0,
        retry_delay_ms: 100,
    };
    AgentRuntimeClient::new(&config, request_config).expect("Failed to create client")
}

fn test_invocation() -> AgentInvocation {
    AgentInvocation::new("hypothesis-generator", "model-x", "Analyze the workload")
        .with_system_prompt("You generate hypotheses.")
        .with_tools(vec!["get_hypotheses".to_string()])
}

fn tool_context(exec: Arc<FakeExecutor>) -> ToolContext {
    ToolContext {
        exec,
        stack: Arc::new(FakeStackMetadata::with_role("arn:aws:iam::123:role/fis")),
        app: Arc::new(AppContext::new(Config::from_env())),
    }
}

#[tokio::test]
async fn successful_agent_run() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/agents/run"))
        .and(header("Authorization", "Bearer test-api-key"))
        .and(body_partial_json(json!({
            "agent": "hypothesis-generator",
            "systemPrompt": "You generate hypotheses."
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "executionId": "exec-1",
            "status": "completed",
            "output": "Generated 5 hypotheses."
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server.uri());
    let response = client.run_agent(test_invocation()).await.unwrap();

    assert_eq!(response.status, "completed");
    assert_eq!(response.output.as_deref(), Some("Generated 5 hypotheses."));
}

#[tokio::test]
async fn api_error_is_surfaced_with_status() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/agents/run"))
        .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server.uri());
    let err = client.run_agent(test_invocation()).await.unwrap_err();

    // Retries are exhausted (none configured), so the failure is terminal
    match err {
        RuntimeError::Unavailable { message, retries } => {
            assert!(message.contains("401"));
            assert_eq!(retries, 1);
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn retries_then_succeeds() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/agents/run"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .up_to_n_times(1)
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/agents/run"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "completed",
            "output": "done"
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = RuntimeConfig {
        base_url: mock_server.uri(),
        api_key: None,
    };
    let request_config = RequestConfig {
        timeout_ms: 5000,
        max_retries: 2,
        retry_delay_ms: 10,
    };
    let client = AgentRuntimeClient::new(&config, request_config).unwrap();

    let response = client.run_agent(test_invocation()).await.unwrap();
    assert_eq!(response.output.as_deref(), Some("done"));
}

#[tokio::test]
async fn tool_callbacks_are_answered_and_execution_continues() {
    let mock_server = MockServer::start().await;

    // First response asks for a tool call
    Mock::given(method("POST"))
        .and(path("/v1/agents/run"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "executionId": "exec-7",
            "status": "needs_tools",
            "toolCalls": [
                {"id": "t1", "name": "insert_hypothesis", "arguments": {"title": "cache failure is survivable"}}
            ]
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    // The continue call must carry the execution id and the tool result
    Mock::given(method("POST"))
        .and(path("/v1/agents/continue"))
        .and(body_partial_json(json!({
            "executionId": "exec-7",
            "toolResults": [
                {"id": "t1", "output": {"success": true, "hypothesis_id": 42}}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "executionId": "exec-7",
            "status": "completed",
            "output": "Hypothesis stored."
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let exec = Arc::new(FakeExecutor::new());
    exec.push_response(id_response(&[42]));

    let client = test_client(&mock_server.uri()).with_tool_context(tool_context(exec.clone()));
    let response = client.run_agent(test_invocation()).await.unwrap();

    assert_eq!(response.output.as_deref(), Some("Hypothesis stored."));
    // The dispatched insert ran exactly one statement
    assert_eq!(exec.call_count(), 1);
    assert!(exec.last_call().sql.contains("INSERT INTO hypothesis"));
}

#[tokio::test]
async fn tool_calls_without_context_are_invalid() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/agents/run"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "executionId": "exec-9",
            "status": "needs_tools",
            "toolCalls": [{"id": "t1", "name": "get_hypotheses", "arguments": {}}]
        })))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server.uri());
    let err = client.run_agent(test_invocation()).await.unwrap_err();
    assert!(matches!(err, RuntimeError::InvalidResponse { .. }));
}

#[tokio::test]
async fn workflow_request_carries_steps() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/workflows/run"))
        .and(body_partial_json(json!({
            "steps": [{"name": "hypothesis_generation"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "executionId": "wf-1",
            "status": "completed",
            "outputs": {"hypotheses": "generated"}
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server.uri());
    let request = WorkflowRequest {
        instruction: "Run the chaos workflow.".to_string(),
        steps: vec![WorkflowStep {
            name: "hypothesis_generation".to_string(),
            description: "Generate hypotheses".to_string(),
            agent: "hypothesis-generator".to_string(),
            input: "Analyze the workload.".to_string(),
            output_key: "hypotheses".to_string(),
        }],
    };

    let response = client.run_workflow(request).await.unwrap();
    assert_eq!(response.status, "completed");
    assert_eq!(
        response.outputs.unwrap().get("hypotheses"),
        Some(&json!("generated"))
    );
}

#[tokio::test]
async fn malformed_response_body_is_invalid_response() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/v1/agents/run"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&mock_server)
        .await;

    let client = test_client(&mock_server.uri());
    let err = client.run_agent(test_invocation()).await.unwrap_err();
    match err {
        RuntimeError::Unavailable { message, .. } => {
            assert!(message.contains("Invalid response"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
