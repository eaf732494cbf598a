//! Hypothesis database tools.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::db::{cell, SelectBuilder, SqlExecutor, SqlParam};
use crate::error::{ToolError, ToolResult};

const BASE_SELECT: &str = "SELECT h.id, h.title, h.description, h.persona, h.steady_state_description, \
     h.failure_mode, h.status, h.priority, h.notes, h.system_component_id, \
     h.created_at, h.updated_at, \
     sc.name as component_name, sc.type as component_type \
     FROM hypothesis h \
     LEFT JOIN system_component sc ON h.system_component_id = sc.id";

const ORDER_BY: &str = "h.priority ASC, h.created_at DESC";

/// A new hypothesis; `title` is the only required field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewHypothesis {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub persona: Option<String>,
    #[serde(default)]
    pub steady_state_description: Option<String>,
    #[serde(default)]
    pub failure_mode: Option<String>,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default = "default_priority")]
    pub priority: i64,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub system_component_id: Option<i64>,
}

fn default_status() -> String {
    "proposed".to_string()
}

fn default_priority() -> i64 {
    1
}

impl NewHypothesis {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            persona: None,
            steady_state_description: None,
            failure_mode: None,
            status: default_status(),
            priority: default_priority(),
            notes: None,
            system_component_id: None,
        }
    }
}

/// Fields to change on an existing hypothesis; `None` leaves a field as is.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HypothesisUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub persona: Option<String>,
    pub steady_state_description: Option<String>,
    pub failure_mode: Option<String>,
    pub status: Option<String>,
    pub priority: Option<i64>,
    pub notes: Option<String>,
    pub system_component_id: Option<i64>,
}

/// Optional filters for hypothesis queries; an omitted filter imposes no
/// constraint.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HypothesisFilter {
    pub hypothesis_ids: Option<Vec<i64>>,
    pub status: Option<String>,
    pub priority: Option<i64>,
    pub system_component_id: Option<i64>,
    /// Case-insensitive substring match across component type and hypothesis
    /// title/description.
    pub service: Option<String>,
    /// Top N hypotheses by priority (1 = highest); overrides `limit`.
    pub top_n: Option<i64>,
    pub priority_range: Option<(i64, i64)>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HypothesisRow {
    pub id: Option<i64>,
    pub title: String,
    pub description: Option<String>,
    pub persona: Option<String>,
    pub steady_state_description: Option<String>,
    pub failure_mode: Option<String>,
    pub status: String,
    pub priority: Option<i64>,
    pub notes: Option<String>,
    pub system_component_id: Option<i64>,
    pub created_at: String,
    pub updated_at: String,
    pub component_name: Option<String>,
    pub component_type: Option<String>,
}

impl HypothesisRow {
    fn from_row(row: &[crate::db::SqlValue]) -> Self {
        Self {
            id: cell(row, 0).as_long(),
            title: cell(row, 1).text_or_empty(),
            description: cell(row, 2).opt_text(),
            persona: cell(row, 3).opt_text(),
            steady_state_description: cell(row, 4).opt_text(),
            failure_mode: cell(row, 5).opt_text(),
            status: cell(row, 6).text_or_empty(),
            priority: cell(row, 7).as_long(),
            notes: cell(row, 8).opt_text(),
            system_component_id: cell(row, 9).as_long(),
            created_at: cell(row, 10).text_or_empty(),
            updated_at: cell(row, 11).text_or_empty(),
            component_name: cell(row, 12).opt_text(),
            component_type: cell(row, 13).opt_text(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HypothesisQueryResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub hypotheses: Vec<HypothesisRow>,
    pub count: usize,
    pub filters: HypothesisFilter,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HypothesisBatchInsertResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub inserted_count: usize,
    pub requested_count: usize,
    pub hypothesis_ids: Vec<i64>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct PriorityBatchResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub updated_count: i64,
    pub requested_count: usize,
    pub message: String,
}

/// Insert a new hypothesis; returns the generated id, or `None` on failure.
pub async fn insert_hypothesis(exec: &dyn SqlExecutor, hypothesis: &NewHypothesis) -> Option<i64> {
    info!(
        title = %hypothesis.title,
        status = %hypothesis.status,
        priority = hypothesis.priority,
        "Inserting new hypothesis"
    );

    let sql = "INSERT INTO hypothesis ( \
         title, description, persona, steady_state_description, \
         failure_mode, status, priority, notes, system_component_id \
         ) VALUES ( \
         :title, :description, :persona, :steady_state_description, \
         :failure_mode, :status, :priority, :notes, :system_component_id \
         ) RETURNING id";

    let params = vec![
        SqlParam::text("title", &hypothesis.title),
        SqlParam::opt_text("description", hypothesis.description.as_deref()),
        SqlParam::opt_text("persona", hypothesis.persona.as_deref()),
        SqlParam::opt_text(
            "steady_state_description",
            hypothesis.steady_state_description.as_deref(),
        ),
        SqlParam::opt_text("failure_mode", hypothesis.failure_mode.as_deref()),
        SqlParam::text("status", &hypothesis.status),
        SqlParam::long("priority", hypothesis.priority),
        SqlParam::opt_text("notes", hypothesis.notes.as_deref()),
        SqlParam::opt_long("system_component_id", hypothesis.system_component_id),
    ];

    match exec.execute(sql, params).await {
        Ok(response) => match response.returned_id() {
            Some(id) => {
                info!(hypothesis_id = id, "Successfully inserted hypothesis");
                Some(id)
            }
            None => {
                error!("Insert returned no hypothesis id");
                None
            }
        },
        Err(e) => {
            error!(error = %e, "Database error inserting hypothesis");
            None
        }
    }
}

/// Update an existing hypothesis.
///
/// Returns `true` only when a row was changed; `false` when the id does not
/// exist or no fields were supplied. The no-field case executes no statement.
pub async fn update_hypothesis(
    exec: &dyn SqlExecutor,
    hypothesis_id: i64,
    update: &HypothesisUpdate,
) -> bool {
    info!(hypothesis_id, "Updating hypothesis");

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
    if let Some(persona) = &update.persona {
        fields.push("persona = :persona");
        params.push(SqlParam::text("persona", persona));
    }
    if let Some(steady_state) = &update.steady_state_description {
        fields.push("steady_state_description = :steady_state_description");
        params.push(SqlParam::text("steady_state_description", steady_state));
    }
    if let Some(failure_mode) = &update.failure_mode {
        fields.push("failure_mode = :failure_mode");
        params.push(SqlParam::text("failure_mode", failure_mode));
    }
    if let Some(status) = &update.status {
        fields.push("status = :status");
        params.push(SqlParam::text("status", status));
    }
    if let Some(priority) = update.priority {
        fields.push("priority = :priority");
        params.push(SqlParam::long("priority", priority));
    }
    if let Some(notes) = &update.notes {
        fields.push("notes = :notes");
        params.push(SqlParam::text("notes", notes));
    }
    if let Some(component_id) = update.system_component_id {
        fields.push("system_component_id = :system_component_id");
        params.push(SqlParam::long("system_component_id", component_id));
    }

    if fields.is_empty() {
        warn!("No fields provided for update");
        return false;
    }

    fields.push("updated_at = CURRENT_TIMESTAMP");
    params.push(SqlParam::long("hypothesis_id", hypothesis_id));

    let sql = format!(
        "UPDATE hypothesis SET {} WHERE id = :hypothesis_id",
        fields.join(", ")
    );

    match exec.execute(&sql, params).await {
        Ok(response) if response.number_of_records_updated > 0 => {
            info!(hypothesis_id, "Successfully updated hypothesis");
            true
        }
        Ok(_) => {
            warn!(hypothesis_id, "No hypothesis found with that id");
            false
        }
        Err(e) => {
            error!(error = %e, "Database error updating hypothesis");
            false
        }
    }
}

/// Get hypotheses with flexible filtering. Never errors; failures come back
/// as a structured result.
pub async fn get_hypotheses(
    exec: &dyn SqlExecutor,
    filter: HypothesisFilter,
) -> HypothesisQueryResult {
    info!(filters = ?filter, "Getting hypotheses");

    match query_hypotheses(exec, &filter).await {
        Ok(hypotheses) => {
            info!(count = hypotheses.len(), "Retrieved hypotheses from database");
            let count = hypotheses.len();
            HypothesisQueryResult {
                success: true,
                error: None,
                message: format!("Retrieved {count} hypotheses"),
                hypotheses,
                count,
                filters: filter,
            }
        }
        Err(e) => {
            error!(error = %e, "Error getting hypotheses");
            HypothesisQueryResult {
                success: false,
                error: Some(e.to_string()),
                hypotheses: Vec::new(),
                count: 0,
                filters: filter,
                message: "Failed to get hypotheses from database".to_string(),
            }
        }
    }
}

async fn query_hypotheses(
    exec: &dyn SqlExecutor,
    filter: &HypothesisFilter,
) -> ToolResult<Vec<HypothesisRow>> {
    let mut builder = SelectBuilder::new(BASE_SELECT);

    if let Some(ids) = &filter.hypothesis_ids {
        builder = builder.filter_in("h.id", "id", ids);
    }
    if let Some(status) = &filter.status {
        builder = builder.filter("h.status = :status", vec![SqlParam::text("status", status)]);
    }
    if let Some(priority) = filter.priority {
        builder = builder.filter(
            "h.priority = :priority",
            vec![SqlParam::long("priority", priority)],
        );
    }
    if let Some(component_id) = filter.system_component_id {
        builder = builder.filter(
            "h.system_component_id = :system_component_id",
            vec![SqlParam::long("system_component_id", component_id)],
        );
    }
    if let Some(service) = &filter.service {
        let pattern = format!("%{service}%");
        builder = builder.filter(
            "(UPPER(sc.type) LIKE UPPER(:service_filter) \
             OR UPPER(h.title) LIKE UPPER(:service_filter_title) \
             OR UPPER(h.description) LIKE UPPER(:service_filter_desc))",
            vec![
                SqlParam::text("service_filter", &pattern),
                SqlParam::text("service_filter_title", &pattern),
                SqlParam::text("service_filter_desc", &pattern),
            ],
        );
    }
    if let Some((min_priority, max_priority)) = filter.priority_range {
        builder = builder.filter(
            "h.priority BETWEEN :min_priority AND :max_priority",
            vec![
                SqlParam::long("min_priority", min_priority),
                SqlParam::long("max_priority", max_priority),
            ],
        );
    }

    let (sql, params) = match filter.top_n {
        Some(top_n) => builder.finish(ORDER_BY, "top_n", top_n),
        None => builder.finish(ORDER_BY, "limit", filter.limit.unwrap_or(50)),
    };

    debug!("Executing SELECT for hypotheses");
    let response = exec.execute(&sql, params).await?;

    Ok(response
        .records
        .iter()
        .map(|row| HypothesisRow::from_row(row))
        .collect())
}

/// Batch insert hypotheses in one statement.
///
/// Every item is validated before any SQL is built; one malformed item
/// rejects the whole batch and writes nothing.
pub async fn batch_insert_hypotheses(
    exec: &dyn SqlExecutor,
    hypotheses: &[Value],
) -> HypothesisBatchInsertResult {
    info!(count = hypotheses.len(), "Batch inserting hypotheses");

    if hypotheses.is_empty() {
        warn!("No hypotheses provided for batch insert");
        return HypothesisBatchInsertResult {
            success: false,
            error: Some("No hypotheses provided".to_string()),
            inserted_count: 0,
            requested_count: 0,
            hypothesis_ids: Vec::new(),
            message: "No hypotheses to insert".to_string(),
        };
    }

    match batch_insert_inner(exec, hypotheses).await {
        Ok(ids) if !ids.is_empty() => {
            info!(count = ids.len(), "Successfully batch inserted hypotheses");
            HypothesisBatchInsertResult {
                success: true,
                error: None,
                inserted_count: ids.len(),
                requested_count: hypotheses.len(),
                message: format!("Successfully inserted {} hypotheses", ids.len()),
                hypothesis_ids: ids,
            }
        }
        Ok(_) => {
            warn!("No hypotheses were inserted");
            HypothesisBatchInsertResult {
                success: false,
                error: Some("No hypotheses were inserted".to_string()),
                inserted_count: 0,
                requested_count: hypotheses.len(),
                hypothesis_ids: Vec::new(),
                message: "Failed to insert hypotheses".to_string(),
            }
        }
        Err(e) => {
            error!(error = %e, "Batch insert failed");
            let message = if e.is_validation() {
                "Failed to validate batch insert data"
            } else {
                "Database error during batch insert"
            };
            HypothesisBatchInsertResult {
                success: false,
                error: Some(e.to_string()),
                inserted_count: 0,
                requested_count: hypotheses.len(),
                hypothesis_ids: Vec::new(),
                message: message.to_string(),
            }
        }
    }
}

async fn batch_insert_inner(exec: &dyn SqlExecutor, hypotheses: &[Value]) -> ToolResult<Vec<i64>> {
    // Validate every item before touching the database
    for (i, hypothesis) in hypotheses.iter().enumerate() {
        let item = hypothesis
            .as_object()
            .ok_or_else(|| ToolError::Validation {
                message: format!("Hypothesis {i} is not an object"),
            })?;
        let title = item.get("title").ok_or_else(|| ToolError::Validation {
            message: format!("Hypothesis {i} missing required key 'title'"),
        })?;
        match title.as_str() {
            Some(t) if !t.trim().is_empty() => {}
            _ => {
                return Err(ToolError::Validation {
                    message: format!("Hypothesis {i} has invalid title"),
                })
            }
        }
    }

    let mut values_clauses = Vec::new();
    let mut params = Vec::new();

    for (i, hypothesis) in hypotheses.iter().enumerate() {
        let get_str = |key: &str| hypothesis.get(key).and_then(Value::as_str);
        let get_long = |key: &str| hypothesis.get(key).and_then(Value::as_i64);

        values_clauses.push(format!(
            "(:title_{i}, :description_{i}, :persona_{i}, :steady_state_description_{i}, \
             :failure_mode_{i}, :status_{i}, :priority_{i}, :notes_{i}, :system_component_id_{i})"
        ));

        params.push(SqlParam::opt_text(format!("title_{i}"), get_str("title")));
        params.push(SqlParam::opt_text(
            format!("description_{i}"),
            get_str("description"),
        ));
        params.push(SqlParam::opt_text(format!("persona_{i}"), get_str("persona")));
        params.push(SqlParam::opt_text(
            format!("steady_state_description_{i}"),
            get_str("steady_state_description"),
        ));
        params.push(SqlParam::opt_text(
            format!("failure_mode_{i}"),
            get_str("failure_mode"),
        ));
        params.push(SqlParam::text(
            format!("status_{i}"),
            get_str("status").unwrap_or("proposed"),
        ));
        params.push(SqlParam::long(
            format!("priority_{i}"),
            get_long("priority").unwrap_or(1),
        ));
        params.push(SqlParam::opt_text(format!("notes_{i}"), get_str("notes")));
        params.push(SqlParam::opt_long(
            format!("system_component_id_{i}"),
            get_long("system_component_id"),
        ));
    }

    let sql = format!(
        "INSERT INTO hypothesis ( \
         title, description, persona, steady_state_description, \
         failure_mode, status, priority, notes, system_component_id \
         ) VALUES {} RETURNING id",
        values_clauses.join(", ")
    );

    debug!(count = hypotheses.len(), "Executing batch INSERT for hypotheses");
    let response = exec.execute(&sql, params).await?;
    Ok(response.returned_ids())
}

/// Batch update hypothesis priorities in one CASE-keyed statement.
///
/// Each item must carry integer `hypothesis_id` and `priority`; one malformed
/// item rejects the whole batch. Shared priorities are allowed.
pub async fn batch_update_priorities(
    exec: &dyn SqlExecutor,
    priority_updates: &[Value],
) -> PriorityBatchResult {
    info!(
        count = priority_updates.len(),
        "Batch updating hypothesis priorities"
    );

    if priority_updates.is_empty() {
        warn!("No priority updates provided");
        return PriorityBatchResult {
            success: false,
            error: Some("No priority updates provided".to_string()),
            updated_count: 0,
            requested_count: 0,
            message: "No hypotheses to update".to_string(),
        };
    }

    match batch_priorities_inner(exec, priority_updates).await {
        Ok(updated) if updated > 0 => {
            info!(updated, "Successfully batch updated hypothesis priorities");
            PriorityBatchResult {
                success: true,
                error: None,
                updated_count: updated,
                requested_count: priority_updates.len(),
                message: format!("Successfully updated {updated} hypothesis priorities"),
            }
        }
        Ok(_) => {
            warn!("No hypotheses were updated - check if hypothesis ids exist");
            PriorityBatchResult {
                success: false,
                error: Some("No hypotheses were updated".to_string()),
                updated_count: 0,
                requested_count: priority_updates.len(),
                message: "No hypotheses found with provided ids".to_string(),
            }
        }
        Err(e) => {
            error!(error = %e, "Batch priority update failed");
            let message = if e.is_validation() {
                "Failed to validate batch update data"
            } else {
                "Database error during batch update"
            };
            PriorityBatchResult {
                success: false,
                error: Some(e.to_string()),
                updated_count: 0,
                requested_count: priority_updates.len(),
                message: message.to_string(),
            }
        }
    }
}

async fn batch_priorities_inner(
    exec: &dyn SqlExecutor,
    priority_updates: &[Value],
) -> ToolResult<i64> {
    for (i, update) in priority_updates.iter().enumerate() {
        if !update.is_object() {
            return Err(ToolError::Validation {
                message: format!("Update {i} is not an object"),
            });
        }
        let id = update.get("hypothesis_id");
        let priority = update.get("priority");
        if id.is_none() || priority.is_none() {
            return Err(ToolError::Validation {
                message: format!(
                    "Update {i} missing required keys 'hypothesis_id' or 'priority'"
                ),
            });
        }
        if id.and_then(Value::as_i64).is_none() || priority.and_then(Value::as_i64).is_none() {
            return Err(ToolError::Validation {
                message: format!("Update {i} has non-integer values"),
            });
        }
    }

    let mut case_arms = Vec::new();
    let mut id_placeholders = Vec::new();
    let mut params = Vec::new();

    for (i, update) in priority_updates.iter().enumerate() {
        let id = update
            .get("hypothesis_id")
            .and_then(Value::as_i64)
            .unwrap_or_default();
        let priority = update
            .get("priority")
            .and_then(Value::as_i64)
            .unwrap_or_default();

        case_arms.push(format!("WHEN :id_{i} THEN :priority_{i}"));
        id_placeholders.push(format!(":id_{i}"));
        params.push(SqlParam::long(format!("id_{i}"), id));
        params.push(SqlParam::long(format!("priority_{i}"), priority));
    }

    let sql = format!(
        "UPDATE hypothesis SET priority = CASE id {} END, \
         updated_at = CURRENT_TIMESTAMP WHERE id IN ({})",
        case_arms.join(" "),
        id_placeholders.join(",")
    );

    debug!(
        count = priority_updates.len(),
        "Executing batch UPDATE for hypothesis priorities"
    );
    let response = exec.execute(&sql, params).await?;
    Ok(response.number_of_records_updated)
}
