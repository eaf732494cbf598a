//! Experiment database tools.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::db::{cell, json_cell, SelectBuilder, SqlExecutor, SqlParam, SqlValue};
use crate::error::ToolResult;

const BASE_SELECT: &str = "SELECT e.id, e.hypothesis_id, e.title, e.description, e.experiment_plan, \
     e.fis_configuration, e.fis_role_configuration, e.status, e.created_at, e.updated_at, \
     h.title as hypothesis_title, h.description as hypothesis_description, \
     sc.name as component_name, sc.type as component_type \
     FROM experiment e \
     LEFT JOIN hypothesis h ON e.hypothesis_id = h.id \
     LEFT JOIN system_component sc ON h.system_component_id = sc.id";

/// A new experiment tied to a hypothesis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewExperiment {
    pub title: String,
    pub hypothesis_id: i64,
    pub description: String,
    pub experiment_plan: String,
    /// FIS template configuration.
    pub fis_configuration: Value,
    /// IAM role configuration for FIS execution.
    #[serde(default)]
    pub fis_role_configuration: Option<Value>,
    #[serde(default = "default_status")]
    pub status: String,
}

fn default_status() -> String {
    "draft".to_string()
}

impl NewExperiment {
    pub fn new(
        title: impl Into<String>,
        hypothesis_id: i64,
        description: impl Into<String>,
        experiment_plan: impl Into<String>,
        fis_configuration: Value,
    ) -> Self {
        Self {
            title: title.into(),
            hypothesis_id,
            description: description.into(),
            experiment_plan: experiment_plan.into(),
            fis_configuration,
            fis_role_configuration: None,
            status: default_status(),
        }
    }

    pub fn with_role_configuration(mut self, role_configuration: Value) -> Self {
        self.fis_role_configuration = Some(role_configuration);
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }
}

/// Fields to change on an existing experiment; `None` leaves a field as is.
/// Timestamps are ISO 8601 strings cast by the server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub experiment_plan: Option<String>,
    pub status: Option<String>,
    pub fis_experiment_id: Option<String>,
    pub experiment_notes: Option<String>,
    pub scheduled_for: Option<String>,
    pub executed_at: Option<String>,
    pub completed_at: Option<String>,
}

/// Optional filters for experiment queries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentFilter {
    pub status: Option<String>,
    pub hypothesis_id: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentRow {
    pub id: Option<i64>,
    pub hypothesis_id: Option<i64>,
    pub title: String,
    pub description: String,
    pub experiment_plan: String,
    pub fis_configuration: Value,
    pub fis_role_configuration: Option<Value>,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
    pub hypothesis_title: Option<String>,
    pub hypothesis_description: Option<String>,
    pub component_name: Option<String>,
    pub component_type: Option<String>,
}

impl ExperimentRow {
    fn from_row(row: &[SqlValue]) -> Self {
        // Role configuration parses leniently: malformed JSON reads as None
        let fis_role_configuration = match cell(row, 6).as_text() {
            Some(text) if !text.trim().is_empty() => match serde_json::from_str(text) {
                Ok(value) => Some(value),
                Err(_) => {
                    warn!(
                        experiment_id = cell(row, 0).as_long(),
                        "Failed to parse fis_role_configuration"
                    );
                    None
                }
            },
            _ => None,
        };

        Self {
            id: cell(row, 0).as_long(),
            hypothesis_id: cell(row, 1).as_long(),
            title: cell(row, 2).text_or_empty(),
            description: cell(row, 3).text_or_empty(),
            experiment_plan: cell(row, 4).text_or_empty(),
            fis_configuration: json_cell(row, 5, "fis_configuration", Value::Object(Default::default())),
            fis_role_configuration,
            status: cell(row, 7).text_or_empty(),
            created_at: cell(row, 8).text_or_empty(),
            updated_at: cell(row, 9).text_or_empty(),
            hypothesis_title: cell(row, 10).opt_text(),
            hypothesis_description: cell(row, 11).opt_text(),
            component_name: cell(row, 12).opt_text(),
            component_type: cell(row, 13).opt_text(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ExperimentQueryResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub experiments: Vec<ExperimentRow>,
    pub count: usize,
    pub filters: ExperimentFilter,
    pub message: String,
}

/// Insert an experiment; returns the generated id, or `None` on failure.
pub async fn insert_experiment(exec: &dyn SqlExecutor, experiment: &NewExperiment) -> Option<i64> {
    info!(
        title = %experiment.title,
        hypothesis_id = experiment.hypothesis_id,
        status = %experiment.status,
        "Inserting experiment into database"
    );

    // JSON columns are cast server-side; payloads travel as text
    let sql = "INSERT INTO experiment ( \
         hypothesis_id, title, description, experiment_plan, \
         fis_configuration, fis_role_configuration, status \
         ) VALUES ( \
         :hypothesis_id, :title, :description, :experiment_plan, \
         :fis_configuration::jsonb, :fis_role_configuration::jsonb, :status \
         ) RETURNING id";

    let fis_configuration =
        serde_json::to_string(&experiment.fis_configuration).unwrap_or_else(|_| "{}".to_string());
    let fis_role_configuration = experiment
        .fis_role_configuration
        .as_ref()
        .map(|v| serde_json::to_string(v).unwrap_or_else(|_| "{}".to_string()));

    let params = vec![
        SqlParam::long("hypothesis_id", experiment.hypothesis_id),
        SqlParam::text("title", &experiment.title),
        SqlParam::text("description", &experiment.description),
        SqlParam::text("experiment_plan", &experiment.experiment_plan),
        SqlParam::text("fis_configuration", fis_configuration),
        SqlParam::opt_text("fis_role_configuration", fis_role_configuration),
        SqlParam::text("status", &experiment.status),
    ];

    match exec.execute(sql, params).await {
        Ok(response) => match response.returned_id() {
            Some(id) => {
                info!(experiment_id = id, "Successfully inserted experiment");
                Some(id)
            }
            None => {
                error!("Insert returned no experiment id");
                None
            }
        },
        Err(e) => {
            error!(error = %e, "Database error inserting experiment");
            None
        }
    }
}

/// Get experiments with hypothesis and component context. Never errors.
pub async fn get_experiments(
    exec: &dyn SqlExecutor,
    filter: ExperimentFilter,
) -> ExperimentQueryResult {
    info!(filters = ?filter, "Getting experiments from database");

    match query_experiments(exec, &filter).await {
        Ok(experiments) => {
            info!(count = experiments.len(), "Retrieved experiments from database");
            let count = experiments.len();
            ExperimentQueryResult {
                success: true,
                error: None,
                message: format!("Retrieved {count} experiments"),
                experiments,
                count,
                filters: filter,
            }
        }
        Err(e) => {
            error!(error = %e, "Error getting experiments");
            ExperimentQueryResult {
                success: false,
                error: Some(e.to_string()),
                experiments: Vec::new(),
                count: 0,
                filters: filter,
                message: "Failed to get experiments from database".to_string(),
            }
        }
    }
}

async fn query_experiments(
    exec: &dyn SqlExecutor,
    filter: &ExperimentFilter,
) -> ToolResult<Vec<ExperimentRow>> {
    let mut builder = SelectBuilder::new(BASE_SELECT);

    if let Some(status) = &filter.status {
        builder = builder.filter("e.status = :status", vec![SqlParam::text("status", status)]);
    }
    if let Some(hypothesis_id) = filter.hypothesis_id {
        builder = builder.filter(
            "e.hypothesis_id = :hypothesis_id",
            vec![SqlParam::long("hypothesis_id", hypothesis_id)],
        );
    }

    let (sql, params) = builder.finish("e.created_at DESC", "limit", filter.limit.unwrap_or(10));

    debug!("Executing SELECT for experiments");
    let response = exec.execute(&sql, params).await?;

    Ok(response
        .records
        .iter()
        .map(|row| ExperimentRow::from_row(row))
        .collect())
}

/// Update an existing experiment.
///
/// Returns `true` only when a row was changed; `false` when the id does not
/// exist or no fields were supplied. The no-field case executes no statement.
pub async fn update_experiment(
    exec: &dyn SqlExecutor,
    experiment_id: i64,
    update: &ExperimentUpdate,
) -> bool {
    info!(experiment_id, "Updating experiment");

    let mut fields = Vec::new();
    let mut params = Vec::new();

    if let Some(title) = &update.title {
        fields.push("title = :title");
        params.push(SqlParam::text("title", title));
    }
    if let Some(description) = &update.description {
        fields.push("description = :description");
        params.push(SqlParam::text("description", description));
    }
    if let Some(experiment_plan) = &update.experiment_plan {
        fields.push("experiment_plan = :experiment_plan");
        params.push(SqlParam::text("experiment_plan", experiment_plan));
    }
    if let Some(status) = &update.status {
        fields.push("status = :status");
        params.push(SqlParam::text("status", status));
    }
    if let Some(fis_experiment_id) = &update.fis_experiment_id {
        fields.push("fis_experiment_id = :fis_experiment_id");
        params.push(SqlParam::text("fis_experiment_id", fis_experiment_id));
    }
    if let Some(experiment_notes) = &update.experiment_notes {
        fields.push("experiment_notes = :experiment_notes");
        params.push(SqlParam::text("experiment_notes", experiment_notes));
    }
    if let Some(scheduled_for) = &update.scheduled_for {
        fields.push("scheduled_for = :scheduled_for::timestamp with time zone");
        params.push(SqlParam::text("scheduled_for", scheduled_for));
    }
    if let Some(executed_at) = &update.executed_at {
        fields.push("executed_at = :executed_at::timestamp with time zone");
        params.push(SqlParam::text("executed_at", executed_at));
    }
    if let Some(completed_at) = &update.completed_at {
        fields.push("completed_at = :completed_at::timestamp with time zone");
        params.push(SqlParam::text("completed_at", completed_at));
    }

    if fields.is_empty() {
        warn!("No fields provided for update");
        return false;
    }

    fields.push("updated_at = CURRENT_TIMESTAMP");
    params.push(SqlParam::long("experiment_id", experiment_id));

    let sql = format!(
        "UPDATE experiment SET {} WHERE id = :experiment_id",
        fields.join(", ")
    );

    match exec.execute(&sql, params).await {
        Ok(response) if response.number_of_records_updated > 0 => {
            info!(experiment_id, "Successfully updated experiment");
            true
        }
        Ok(_) => {
            warn!(experiment_id, "No experiment found with that id");
            false
        }
        Err(e) => {
            error!(error = %e, "Database error updating experiment");
            false
        }
    }
}
