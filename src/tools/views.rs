//! Read access to the `experiment_with_hypothesis` database view.

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::db::{cell, SelectBuilder, SqlExecutor, SqlParam, SqlValue};
use crate::error::ToolResult;

/// Optional filters over the joined experiment view.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentContextFilter {
    pub status: Option<String>,
    pub hypothesis_status: Option<String>,
    pub component_type: Option<String>,
    pub limit: Option<i64>,
}

/// One experiment with its hypothesis and system component context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentContextRow {
    pub id: Option<i64>,
    pub title: String,
    pub description: String,
    pub experiment_plan: String,
    pub status: String,
    pub scheduled_for: Option<String>,
    pub executed_at: Option<String>,
    pub completed_at: Option<String>,
    pub created_at: String,
    pub hypothesis_title: Option<String>,
    pub hypothesis_description: Option<String>,
    pub hypothesis_status: Option<String>,
    pub component_name: Option<String>,
    pub component_type: Option<String>,
}

impl ExperimentContextRow {
    // Column order mirrors the view definition
    fn from_row(row: &[SqlValue]) -> Self {
        Self {
            id: cell(row, 0).as_long(),
            title: cell(row, 1).text_or_empty(),
            description: cell(row, 2).text_or_empty(),
            experiment_plan: cell(row, 3).text_or_empty(),
            status: cell(row, 4).text_or_empty(),
            scheduled_for: cell(row, 5).opt_text(),
            executed_at: cell(row, 6).opt_text(),
            completed_at: cell(row, 7).opt_text(),
            created_at: cell(row, 8).text_or_empty(),
            hypothesis_title: cell(row, 9).opt_text(),
            hypothesis_description: cell(row, 10).opt_text(),
            hypothesis_status: cell(row, 11).opt_text(),
            component_name: cell(row, 12).opt_text(),
            component_type: cell(row, 13).opt_text(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ExperimentContextResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub experiments: Vec<ExperimentContextRow>,
    pub count: usize,
    pub filters: ExperimentContextFilter,
    pub message: String,
}

/// Get experiments with their hypothesis and component context from the
/// database view. Never errors.
pub async fn get_experiments_with_context(
    exec: &dyn SqlExecutor,
    filter: ExperimentContextFilter,
) -> ExperimentContextResult {
    info!(filters = ?filter, "Getting experiments with context");

    match query_view(exec, &filter).await {
        Ok(experiments) => {
            info!(count = experiments.len(), "Retrieved experiments with context from view");
            let count = experiments.len();
            ExperimentContextResult {
                success: true,
                error: None,
                message: format!("Retrieved {count} experiments with context"),
                experiments,
                count,
                filters: filter,
            }
        }
        Err(e) => {
            error!(error = %e, "Error getting experiments with context");
            ExperimentContextResult {
                success: false,
                error: Some(e.to_string()),
                experiments: Vec::new(),
                count: 0,
                filters: filter,
                message: "Failed to get experiments with context from database".to_string(),
            }
        }
    }
}

async fn query_view(
    exec: &dyn SqlExecutor,
    filter: &ExperimentContextFilter,
) -> ToolResult<Vec<ExperimentContextRow>> {
    let mut builder = SelectBuilder::new(
        "SELECT id, title, description, experiment_plan, status, \
         scheduled_for, executed_at, completed_at, created_at, \
         hypothesis_title, hypothesis_description, hypothesis_status, \
         component_name, component_type \
         FROM experiment_with_hypothesis",
    );

    if let Some(status) = &filter.status {
        builder = builder.filter("status = :status", vec![SqlParam::text("status", status)]);
    }
    if let Some(hypothesis_status) = &filter.hypothesis_status {
        builder = builder.filter(
            "hypothesis_status = :hypothesis_status",
            vec![SqlParam::text("hypothesis_status", hypothesis_status)],
        );
    }
    if let Some(component_type) = &filter.component_type {
        builder = builder.filter(
            "component_type = :component_type",
            vec![SqlParam::text("component_type", component_type)],
        );
    }

    let (sql, params) = builder.finish("created_at DESC", "limit", filter.limit.unwrap_or(10));

    debug!("Executing SELECT from experiment_with_hypothesis view");
    let response = exec.execute(&sql, params).await?;

    Ok(response
        .records
        .iter()
        .map(|row| ExperimentContextRow::from_row(row))
        .collect())
}
