use std::process::ExitCode;
use std::sync::Arc;

use aws_config::{BehaviorVersion, Region};
use clap::Parser;
use tracing::{error, info};

use chaos_agent::config::{AppContext, Config, DEFAULT_REGION};
use chaos_agent::db::DataApiGateway;
use chaos_agent::observability::{init_logging, AgentEventLogger};
use chaos_agent::runtime::AgentRuntimeClient;
use chaos_agent::stack::{CfnStackLocator, CfnStackMetadata, StackMetadata};
use chaos_agent::tags::parse_tags_string;
use chaos_agent::tools::ToolContext;
use chaos_agent::workflow::{run_chaos_workflow, WorkflowParams, DEFAULT_WORKLOAD_REPO};

/// Run the Chaos Agent workflow for testing AWS workload resilience.
#[derive(Debug, Parser)]
#[command(name = "chaos-agent", version, about)]
struct Cli {
    /// Repository URL for the workload to analyze
    #[arg(short, long, default_value = DEFAULT_WORKLOAD_REPO)]
    workload: String,

    /// AWS region where resources are deployed
    #[arg(short, long, default_value = DEFAULT_REGION)]
    region: String,

    /// Number of top priority experiments to execute
    #[arg(short, long, default_value_t = 3)]
    experiments: u32,

    /// Workload tags for resource filtering (format: 'Environment=prod,Application=web-app')
    #[arg(short, long)]
    tags: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = Config::from_env();
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    init_logging(&config.logging, "chaos-workflow");

    match run(cli, config).await {
        Ok(()) => {
            info!("Workflow completed successfully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Error running workflow");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, config: Config) -> anyhow::Result<()> {
    info!(
        version = env!("CARGO_PKG_VERSION"),
        workload = %cli.workload,
        "Starting Chaos Agent workflow"
    );

    // Validate tags before doing any work
    if let Some(tags) = &cli.tags {
        parse_tags_string(tags)?;
        info!(tags = %tags, "Using workload tags");
    } else {
        info!("No workload tags specified - will consider all resources");
    }

    // Only treat the CLI region as an override when it was actually changed
    let mut ctx = AppContext::new(config.clone());
    if cli.region != DEFAULT_REGION {
        ctx = ctx.with_region_override(&cli.region);
    }
    let ctx = Arc::new(ctx);

    let base_sdk_config = aws_config::defaults(BehaviorVersion::latest()).load().await;
    let locator = CfnStackLocator::new(base_sdk_config.clone());
    let region = ctx.aws_region(&locator).await;
    info!(region = %region, "AWS region resolved");

    let sdk_config = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(region.clone()))
        .load()
        .await;

    let stack = Arc::new(CfnStackMetadata::new(&sdk_config, &config.stack_name));
    let outputs = stack.outputs().await?;
    let gateway = Arc::new(DataApiGateway::connect(&sdk_config, &outputs)?);
    info!(database = %gateway.coordinates().database, "Database initialized");

    let tool_context = ToolContext {
        exec: gateway,
        stack,
        app: ctx.clone(),
    };

    let runtime = AgentRuntimeClient::new(&config.runtime, config.request.clone())?
        .with_tool_context(tool_context)
        .with_event_logger(AgentEventLogger::new("chaos-workflow"));
    info!(base_url = %runtime.base_url(), "Agent runtime client initialized");

    let params = WorkflowParams {
        workload_repo: cli.workload,
        region,
        tags: cli.tags,
        top_experiments: cli.experiments,
    };

    let run = run_chaos_workflow(&ctx, &runtime, params).await?;
    info!(
        execution_id = %run.execution_id,
        status = %run.status,
        outputs = run.outputs.len(),
        "Workflow run recorded"
    );

    Ok(())
}
