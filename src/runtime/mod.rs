//! Agent runtime API client and types.
//!
//! The LLM agent runtime is an external collaborator reached over HTTP. This
//! crate sends it agent and workflow invocations and answers its tool
//! callbacks; all reasoning happens on the runtime side.

mod client;
mod types;

pub use client::AgentRuntimeClient;
pub use types::{
    AgentInvocation, AgentRuntime, RuntimeResponse, ToolCall, ToolResultMessage, WorkflowRequest,
    WorkflowStep,
};
