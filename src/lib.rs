//! # Chaos Agent
//!
//! A multi-agent chaos engineering pipeline for AWS workloads. Specialized
//! LLM agents analyze a workload's source code and deployed resources,
//! propose and prioritize chaos hypotheses, design and run AWS Fault
//! Injection Service experiments, and record what was learned.
//!
//! Reasoning is delegated to an external agent runtime; this crate owns the
//! durable parts around it:
//!
//! - database tools over the RDS Data API (hypotheses, experiments,
//!   components, evaluations, insights, analyses),
//! - deployment-stack metadata access (connection coordinates, FIS role),
//! - configuration with region/model resolution and workload tag filtering,
//! - the fixed six-step workflow orchestrator,
//! - structured JSON logging and evaluation charts.
//!
//! ## Architecture
//!
//! ```text
//! CLI → Workflow Orchestrator → Agent Runtime (HTTP)
//!                                    ↓ tool callbacks
//!                              Database Tools → RDS Data API (Aurora)
//!                              Stack Metadata → CloudFormation
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use chaos_agent::config::{AppContext, Config};
//! use chaos_agent::runtime::AgentRuntimeClient;
//! use chaos_agent::workflow::{run_chaos_workflow, WorkflowParams};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::from_env();
//!     let ctx = Arc::new(AppContext::new(config.clone()));
//!     let runtime = AgentRuntimeClient::new(&config.runtime, config.request.clone())?;
//!     let run = run_chaos_workflow(&ctx, &runtime, WorkflowParams::default()).await?;
//!     println!("{}", run.status);
//!     Ok(())
//! }
//! ```

pub mod agents;
pub mod charts;
pub mod config;
pub mod db;
pub mod error;
pub mod observability;
pub mod prompts;
pub mod runtime;
pub mod stack;
pub mod tags;
pub mod tools;
pub mod workflow;

pub use config::{AppContext, Config};
pub use error::{AppError, AppResult};
