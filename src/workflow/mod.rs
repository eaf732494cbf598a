//! Workflow orchestration for the chaos engineering pipeline.
//!
//! A fixed, statically ordered sequence of six named steps, each an
//! instruction template for one specialized agent. The orchestrator builds
//! one coordinator instruction plus the step list and hands both to a single
//! runtime invocation; it does not branch, retry steps, or validate per-step
//! output.

use serde::Serialize;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::config::AppContext;
use crate::error::AppResult;
use crate::runtime::{AgentRuntime, WorkflowRequest, WorkflowStep};

/// Default workload analyzed when none is given.
pub const DEFAULT_WORKLOAD_REPO: &str =
    "https://github.com/aws-containers/retail-store-sample-app.git";

/// Inputs for one workflow run.
#[derive(Debug, Clone)]
pub struct WorkflowParams {
    /// Repository URL of the workload to analyze.
    pub workload_repo: String,
    /// AWS region where the workload's resources are deployed.
    pub region: String,
    /// Tag string scoping resource discovery, e.g. "Environment=prod".
    pub tags: Option<String>,
    /// Number of top priority experiments to execute.
    pub top_experiments: u32,
}

impl Default for WorkflowParams {
    fn default() -> Self {
        Self {
            workload_repo: DEFAULT_WORKLOAD_REPO.to_string(),
            region: crate::config::DEFAULT_REGION.to_string(),
            tags: None,
            top_experiments: 3,
        }
    }
}

/// Outcome of one workflow run.
#[derive(Debug, Serialize)]
pub struct WorkflowRun {
    pub execution_id: String,
    pub status: String,
    pub outputs: serde_json::Map<String, Value>,
}

/// Build the fixed six-step chaos workflow for the given parameters.
pub fn build_steps(params: &WorkflowParams) -> Vec<WorkflowStep> {
    let workload_repo = &params.workload_repo;
    let region = &params.region;
    let top_experiments = params.top_experiments;

    vec![
        WorkflowStep {
            name: "hypothesis_generation".to_string(),
            description: "Generate chaos engineering hypotheses by analyzing the AWS workload"
                .to_string(),
            agent: "hypothesis-generator".to_string(),
            input: format!("Analyze the AWS workload repository ({workload_repo})."),
            output_key: "hypotheses".to_string(),
        },
        WorkflowStep {
            name: "hypothesis_prioritization".to_string(),
            description: "Prioritize the generated hypotheses based on impact and feasibility"
                .to_string(),
            agent: "hypothesis-prioritization".to_string(),
            input: "Prioritize all hypotheses in the database based on:\n\n\
                 1. Business impact (customer experience, revenue impact)\n\
                 2. Technical feasibility (ease of testing, resource requirements)\n\
                 3. Risk level (blast radius, recovery time)\n\
                 4. Learning value (insights gained from the experiment)\n\n\
                 Update each hypothesis with a priority ranking from 1 to N (1 = highest priority).\n\
                 Focus on experiments that provide maximum learning with acceptable risk."
                .to_string(),
            output_key: "prioritized_hypotheses".to_string(),
        },
        WorkflowStep {
            name: "experiment_design".to_string(),
            description: "Design AWS FIS experiments based on the prioritized hypotheses"
                .to_string(),
            agent: "experiment-design".to_string(),
            input: "Retrieve all hypotheses from the database (ordered by priority) and create \
                 experiment designs for each.\n\n\
                 1. Focus on the highest priority hypotheses first\n\
                 2. Create a production-ready FIS experiment template for each\n\
                 3. Save the experiment to the database using insert_experiment\n\
                 4. Include both FIS configuration and IAM role configuration\n\
                 5. Consider the priority ranking when designing experiments\n\n\
                 Start with the top 10 highest priority hypotheses."
                .to_string(),
            output_key: "experiment_designs".to_string(),
        },
        WorkflowStep {
            name: "fis_setup".to_string(),
            description: "Set up all experiments in AWS FIS".to_string(),
            agent: "experiments".to_string(),
            input: format!(
                "Set up AWS FIS experiments for the workload:\n\n\
                 1. Get all draft experiments from the database using get_experiments\n\
                 2. For each experiment, discover AWS resources and create FIS experiments\n\
                 3. Update experiment status to 'created' when successfully set up\n\
                 4. I have my app deployed in {region} region\n\
                 5. Prioritize setting up experiments based on their hypothesis priority\n\n\
                 Focus on creating real, executable FIS experiments in AWS."
            ),
            output_key: "fis_setup_results".to_string(),
        },
        WorkflowStep {
            name: "experiment_execution".to_string(),
            description: "Execute selected experiments and monitor results".to_string(),
            agent: "experiments".to_string(),
            input: format!(
                "Execute chaos engineering experiments for the workload:\n\n\
                 1. Get the top {top_experiments} highest priority experiments from the database \
                 that have status 'created'\n\
                 2. For each experiment: display its details, execute it with AWS FIS, monitor \
                 progress, wait for completion (completed, failed, or stopped), capture results \
                 and duration, and update the database with the final status\n\
                 3. Provide a summary of all executed experiments\n\n\
                 Execute experiments sequentially (one at a time), verify experiment targets \
                 before execution, capture stop reasons if experiments are terminated, and \
                 update database status throughout the process."
            ),
            output_key: "execution_results".to_string(),
        },
        WorkflowStep {
            name: "results_analysis".to_string(),
            description: "Analyze experiment results and generate insights".to_string(),
            agent: "learning-and-iteration".to_string(),
            input: "Analyze and summarize the results of executed chaos engineering experiments:\n\n\
                 1. Get all experiments from the database with status 'completed', 'failed', or \
                 'stopped'\n\
                 2. For each executed experiment: show its hypothesis, execution status and \
                 duration, analyze failure patterns, and extract key learnings\n\
                 3. Provide an overall summary of chaos engineering results\n\
                 4. Recommend next steps based on findings\n\n\
                 Focus on actionable insights that can improve system resilience."
                .to_string(),
            output_key: "insights".to_string(),
        },
    ]
}

fn coordinator_instruction(params: &WorkflowParams) -> String {
    format!(
        "Execute a complete chaos engineering workflow for the workload at {}.\n\
         The workflow should analyze the application architecture, generate and prioritize \
         hypotheses, design and execute experiments using AWS FIS, and provide actionable \
         insights for improving resilience.\n\n\
         Follow these steps in sequence:\n\
         1. Generate hypotheses from the workload repository\n\
         2. Prioritize hypotheses based on impact and feasibility\n\
         3. Create experiments for prioritized hypotheses\n\
         4. Set up all experiments in AWS FIS (region: {})\n\
         5. Execute selected experiments (top {})\n\
         6. Review experiment results and generate insights",
        params.workload_repo, params.region, params.top_experiments
    )
}

/// Execute the complete chaos engineering workflow.
///
/// Control flow is delegated wholesale to the agent runtime; this function
/// resolves tags, builds the step list, and makes one coordinating
/// invocation.
pub async fn run_chaos_workflow(
    ctx: &AppContext,
    runtime: &dyn AgentRuntime,
    params: WorkflowParams,
) -> AppResult<WorkflowRun> {
    if let Some(tags) = &params.tags {
        ctx.set_workload_tags_from_str(tags)?;
    }

    let execution_id = Uuid::new_v4().to_string();
    info!(
        execution_id = %execution_id,
        workload_repo = %params.workload_repo,
        region = %params.region,
        tags = params.tags.as_deref().unwrap_or(""),
        top_experiments = params.top_experiments,
        "Starting chaos engineering workflow"
    );

    let request = WorkflowRequest {
        instruction: coordinator_instruction(&params),
        steps: build_steps(&params),
    };

    let response = runtime.run_workflow(request).await?;

    info!(
        execution_id = %execution_id,
        status = %response.status,
        "Chaos engineering workflow finished"
    );

    Ok(WorkflowRun {
        execution_id,
        status: response.status,
        outputs: response.outputs.unwrap_or_default(),
    })
}
