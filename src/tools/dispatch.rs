//! Tool dispatch for agent runtime callbacks.
//!
//! The runtime asks for tools by name with JSON arguments; each arm here
//! deserializes the arguments, runs the tool, and serializes its structured
//! result back. Argument errors come back as validation-error payloads, never
//! as a crash.

use std::path::Path;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::charts;
use crate::config::AppContext;
use crate::db::SqlExecutor;
use crate::stack::StackMetadata;

use super::analysis::{self, NewResourceAnalysis, NewSourceAnalysis};
use super::components::{self, NewSystemComponent, SystemComponentFilter, SystemComponentUpdate};
use super::evaluations::{self, EvaluationFilter, EvaluationScores};
use super::experiments::{self, ExperimentFilter, ExperimentUpdate, NewExperiment};
use super::hypotheses::{self, HypothesisFilter, HypothesisUpdate, NewHypothesis};
use super::insights::{self, NewLearningInsights};
use super::views::{self, ExperimentContextFilter};

/// Everything the dispatcher needs to run a tool.
#[derive(Clone)]
pub struct ToolContext {
    pub exec: Arc<dyn SqlExecutor>,
    pub stack: Arc<dyn StackMetadata>,
    pub app: Arc<AppContext>,
}

#[derive(Debug, Deserialize)]
struct UpdateHypothesisArgs {
    hypothesis_id: i64,
    #[serde(flatten)]
    update: HypothesisUpdate,
}

#[derive(Debug, Deserialize)]
struct UpdateExperimentArgs {
    experiment_id: i64,
    #[serde(flatten)]
    update: ExperimentUpdate,
}

#[derive(Debug, Deserialize)]
struct UpdateComponentArgs {
    component_id: i64,
    #[serde(flatten)]
    update: SystemComponentUpdate,
}

#[derive(Debug, Deserialize)]
struct BatchHypothesesArgs {
    hypotheses: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct BatchPrioritiesArgs {
    priority_updates: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct BatchComponentsArgs {
    components: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct BatchEvaluationsArgs {
    evaluations: Vec<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct LearningHistoryArgs {
    days_back: i64,
}

impl Default for LearningHistoryArgs {
    fn default() -> Self {
        Self { days_back: 30 }
    }
}

#[derive(Debug, Deserialize)]
struct HypothesisStatusArgs {
    hypothesis_id: i64,
    status: String,
    learning_notes: String,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ExperimentResultsArgs {
    experiment_id: Option<i64>,
    status: Option<String>,
    limit: i64,
}

impl Default for ExperimentResultsArgs {
    fn default() -> Self {
        Self {
            experiment_id: None,
            status: None,
            limit: 50,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ChartArgs {
    chart_type: String,
    output_path: String,
    #[serde(flatten)]
    filter: EvaluationFilter,
}

impl Default for ChartArgs {
    fn default() -> Self {
        Self {
            chart_type: "bar".to_string(),
            output_path: "evaluation_chart.png".to_string(),
            filter: EvaluationFilter::default(),
        }
    }
}

/// Run a named tool with JSON arguments and return its structured result.
pub async fn dispatch_tool(ctx: &ToolContext, name: &str, args: &Value) -> Value {
    info!(tool_name = name, "Dispatching tool call");
    let exec = ctx.exec.as_ref();

    match name {
        "get_hypotheses" => match parse_args::<HypothesisFilter>(name, args) {
            Ok(filter) => to_json(&hypotheses::get_hypotheses(exec, filter).await),
            Err(e) => e,
        },
        "insert_hypothesis" => match parse_args::<NewHypothesis>(name, args) {
            Ok(hypothesis) => {
                id_result(hypotheses::insert_hypothesis(exec, &hypothesis).await, "hypothesis_id")
            }
            Err(e) => e,
        },
        "update_hypothesis" => match parse_args::<UpdateHypothesisArgs>(name, args) {
            Ok(update_args) => {
                let updated =
                    hypotheses::update_hypothesis(exec, update_args.hypothesis_id, &update_args.update)
                        .await;
                json!({ "success": updated })
            }
            Err(e) => e,
        },
        "batch_insert_hypotheses" => match parse_args::<BatchHypothesesArgs>(name, args) {
            Ok(batch) => to_json(&hypotheses::batch_insert_hypotheses(exec, &batch.hypotheses).await),
            Err(e) => e,
        },
        "batch_update_hypothesis_priorities" => match parse_args::<BatchPrioritiesArgs>(name, args) {
            Ok(batch) => {
                to_json(&hypotheses::batch_update_priorities(exec, &batch.priority_updates).await)
            }
            Err(e) => e,
        },

        "get_experiments" => match parse_args::<ExperimentFilter>(name, args) {
            Ok(filter) => to_json(&experiments::get_experiments(exec, filter).await),
            Err(e) => e,
        },
        "insert_experiment" => match parse_args::<NewExperiment>(name, args) {
            Ok(experiment) => {
                id_result(experiments::insert_experiment(exec, &experiment).await, "experiment_id")
            }
            Err(e) => e,
        },
        "update_experiment" => match parse_args::<UpdateExperimentArgs>(name, args) {
            Ok(update_args) => {
                let updated =
                    experiments::update_experiment(exec, update_args.experiment_id, &update_args.update)
                        .await;
                json!({ "success": updated })
            }
            Err(e) => e,
        },

        "get_system_components" => match parse_args::<SystemComponentFilter>(name, args) {
            Ok(filter) => to_json(&components::get_system_components(exec, filter).await),
            Err(e) => e,
        },
        "insert_system_component" => match parse_args::<NewSystemComponent>(name, args) {
            Ok(component) => id_result(
                components::insert_system_component(exec, &component).await,
                "component_id",
            ),
            Err(e) => e,
        },
        "update_system_component" => match parse_args::<UpdateComponentArgs>(name, args) {
            Ok(update_args) => {
                let updated = components::update_system_component(
                    exec,
                    update_args.component_id,
                    &update_args.update,
                )
                .await;
                json!({ "success": updated })
            }
            Err(e) => e,
        },
        "batch_insert_system_components" => match parse_args::<BatchComponentsArgs>(name, args) {
            Ok(batch) => {
                to_json(&components::batch_insert_system_components(exec, &batch.components).await)
            }
            Err(e) => e,
        },

        "insert_hypothesis_evaluation" => match parse_args::<EvaluationScores>(name, args) {
            Ok(scores) => to_json(&evaluations::insert_evaluation(exec, &scores).await),
            Err(e) => e,
        },
        "batch_insert_hypothesis_evaluations" => match parse_args::<BatchEvaluationsArgs>(name, args)
        {
            Ok(batch) => {
                to_json(&evaluations::batch_insert_evaluations(exec, &batch.evaluations).await)
            }
            Err(e) => e,
        },
        "get_hypothesis_evaluations" => match parse_args::<EvaluationFilter>(name, args) {
            Ok(filter) => to_json(&evaluations::get_evaluations(exec, filter).await),
            Err(e) => e,
        },

        "save_learning_insights" => match parse_args::<NewLearningInsights>(name, args) {
            Ok(learning) => to_json(&insights::save_learning_insights(exec, &learning).await),
            Err(e) => e,
        },
        "get_learning_history" => match parse_args::<LearningHistoryArgs>(name, args) {
            Ok(history_args) => {
                to_json(&insights::get_learning_history(exec, history_args.days_back).await)
            }
            Err(e) => e,
        },
        "update_hypothesis_status" => match parse_args::<HypothesisStatusArgs>(name, args) {
            Ok(status_args) => to_json(
                &insights::update_hypothesis_status(
                    exec,
                    status_args.hypothesis_id,
                    status_args.status,
                    status_args.learning_notes,
                )
                .await,
            ),
            Err(e) => e,
        },
        "get_experiment_results" => match parse_args::<ExperimentResultsArgs>(name, args) {
            Ok(results_args) => to_json(
                &insights::get_experiment_results(
                    exec,
                    results_args.experiment_id,
                    results_args.status,
                    results_args.limit,
                )
                .await,
            ),
            Err(e) => e,
        },

        "insert_source_analysis" => match parse_args::<NewSourceAnalysis>(name, args) {
            Ok(source) => {
                id_result(analysis::insert_source_analysis(exec, &source).await, "analysis_id")
            }
            Err(e) => e,
        },
        "insert_resource_analysis" => match parse_args::<NewResourceAnalysis>(name, args) {
            Ok(resource) => {
                id_result(analysis::insert_resource_analysis(exec, &resource).await, "analysis_id")
            }
            Err(e) => e,
        },
        "get_source_analysis" => to_json(&analysis::get_source_analysis(exec).await),
        "get_resource_analysis" => to_json(&analysis::get_resource_analysis(exec).await),
        "get_deployed_resources" => to_json(&analysis::get_deployed_resources(exec).await),

        "get_experiments_with_context" => match parse_args::<ExperimentContextFilter>(name, args) {
            Ok(filter) => to_json(&views::get_experiments_with_context(exec, filter).await),
            Err(e) => e,
        },

        "get_fis_execution_role" => match ctx.stack.fis_execution_role().await {
            Ok(role) => json!({
                "success": true,
                "role_arn": role.role_arn,
                "role_name": role.role_name,
                "message": format!("Retrieved pre-generated FIS execution role: {}", role.role_arn),
            }),
            Err(e) => json!({ "success": false, "error": e.to_string() }),
        },

        "get_workload_tags" => to_json(&ctx.app.workload_tags()),
        "get_default_model" => json!(ctx.app.default_model()),
        "get_small_model" => json!(ctx.app.small_model()),
        "get_large_model" => json!(ctx.app.large_model()),

        "display_evaluation_chart" => match parse_args::<ChartArgs>(name, args) {
            Ok(chart_args) => render_chart(ctx, chart_args).await,
            Err(e) => e,
        },
        "get_evaluation_statistics" => match parse_args::<EvaluationFilter>(name, args) {
            Ok(filter) => {
                let result = evaluations::get_evaluations(exec, filter).await;
                if !result.success {
                    return to_json(&result);
                }
                match charts::compute_statistics(&result.evaluations) {
                    Some(stats) => json!({ "success": true, "statistics": stats }),
                    None => json!({
                        "success": false,
                        "error": "No evaluation data found",
                        "message": "No hypothesis evaluations available",
                    }),
                }
            }
            Err(e) => e,
        },

        _ => {
            warn!(tool_name = name, "Unknown tool requested");
            json!({ "success": false, "error": format!("Unknown tool: {name}") })
        }
    }
}

async fn render_chart(ctx: &ToolContext, args: ChartArgs) -> Value {
    let result = evaluations::get_evaluations(ctx.exec.as_ref(), args.filter).await;
    if !result.success {
        return to_json(&result);
    }

    let path = Path::new(&args.output_path);
    let rendered = match args.chart_type.as_str() {
        "bar" => charts::render_score_bar_chart(&result.evaluations, path),
        "heatmap" => charts::render_dimension_heatmap(&result.evaluations, path),
        other => Err(crate::error::ChartError::UnsupportedType {
            chart_type: other.to_string(),
        }),
    };

    match rendered {
        Ok(output) => json!({
            "success": true,
            "chart_type": output.chart_type,
            "hypothesis_count": output.hypothesis_count,
            "path": output.path,
            "message": format!(
                "Successfully generated {} chart for {} hypotheses",
                output.chart_type, output.hypothesis_count
            ),
        }),
        Err(e) => json!({
            "success": false,
            "error": e.to_string(),
            "message": format!("Failed to generate {} chart", args.chart_type),
        }),
    }
}

fn parse_args<T: DeserializeOwned>(tool: &str, args: &Value) -> Result<T, Value> {
    serde_json::from_value(args.clone()).map_err(|e| {
        warn!(tool_name = tool, error = %e, "Invalid tool arguments");
        json!({
            "success": false,
            "error": format!("Invalid parameters for {tool}: {e}"),
        })
    })
}

fn to_json<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or_else(|e| {
        json!({ "success": false, "error": format!("Failed to encode result: {e}") })
    })
}

fn id_result(id: Option<i64>, key: &str) -> Value {
    let mut map = serde_json::Map::new();
    map.insert("success".to_string(), Value::Bool(id.is_some()));
    map.insert(key.to_string(), id.map(Value::from).unwrap_or(Value::Null));
    Value::Object(map)
}
