//! System component database tools.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::db::{cell, SelectBuilder, SqlExecutor, SqlParam, SqlValue};
use crate::error::{ToolError, ToolResult};

/// A new system component; name and type are required.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSystemComponent {
    pub name: String,
    #[serde(rename = "type")]
    pub component_type: String,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewSystemComponent {
    pub fn new(name: impl Into<String>, component_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            component_type: component_type.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Fields to change on an existing component; `None` leaves a field as is.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemComponentUpdate {
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub component_type: Option<String>,
    pub description: Option<String>,
}

/// Optional filters for component queries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemComponentFilter {
    #[serde(rename = "type")]
    pub component_type: Option<String>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemComponentRow {
    pub id: Option<i64>,
    pub name: String,
    #[serde(rename = "type")]
    pub component_type: String,
    pub description: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl SystemComponentRow {
    fn from_row(row: &[SqlValue]) -> Self {
        Self {
            id: cell(row, 0).as_long(),
            name: cell(row, 1).text_or_empty(),
            component_type: cell(row, 2).text_or_empty(),
            description: cell(row, 3).opt_text(),
            created_at: cell(row, 4).text_or_empty(),
            updated_at: cell(row, 5).text_or_empty(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SystemComponentQueryResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub components: Vec<SystemComponentRow>,
    pub count: usize,
    pub filters: SystemComponentFilter,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ComponentBatchInsertResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub inserted_count: usize,
    pub requested_count: usize,
    pub component_ids: Vec<i64>,
    pub message: String,
}

/// Insert a system component; returns the generated id, or `None` on failure.
pub async fn insert_system_component(
    exec: &dyn SqlExecutor,
    component: &NewSystemComponent,
) -> Option<i64> {
    info!(
        name = %component.name,
        component_type = %component.component_type,
        "Inserting new system component"
    );

    let sql = "INSERT INTO system_component (name, type, description) \
         VALUES (:name, :type, :description) RETURNING id";

    let params = vec![
        SqlParam::text("name", &component.name),
        SqlParam::text("type", &component.component_type),
        SqlParam::opt_text("description", component.description.as_deref()),
    ];

    match exec.execute(sql, params).await {
        Ok(response) => match response.returned_id() {
            Some(id) => {
                info!(component_id = id, "Successfully inserted system component");
                Some(id)
            }
            None => {
                error!("Insert returned no component id");
                None
            }
        },
        Err(e) => {
            error!(error = %e, "Database error inserting system component");
            None
        }
    }
}

/// Update an existing system component.
///
/// Returns `true` only when a row was changed; `false` when the id does not
/// exist or no fields were supplied.
pub async fn update_system_component(
    exec: &dyn SqlExecutor,
    component_id: i64,
    update: &SystemComponentUpdate,
) -> bool {
    info!(component_id, "Updating system component");

    let mut fields = Vec::new();
    let mut params = Vec::new();

    if let Some(name) = &update.name {
        fields.push("name = :name");
        params.push(SqlParam::text("name", name));
    }
    if let Some(component_type) = &update.component_type {
        fields.push("type = :type");
        params.push(SqlParam::text("type", component_type));
    }
    if let Some(description) = &update.description {
        fields.push("description = :description");
        params.push(SqlParam::text("description", description));
    }

    if fields.is_empty() {
        warn!("No fields provided for update");
        return false;
    }

    fields.push("updated_at = CURRENT_TIMESTAMP");
    params.push(SqlParam::long("component_id", component_id));

    let sql = format!(
        "UPDATE system_component SET {} WHERE id = :component_id",
        fields.join(", ")
    );

    match exec.execute(&sql, params).await {
        Ok(response) if response.number_of_records_updated > 0 => {
            info!(component_id, "Successfully updated system component");
            true
        }
        Ok(_) => {
            warn!(component_id, "No system component found with that id");
            false
        }
        Err(e) => {
            error!(error = %e, "Database error updating system component");
            false
        }
    }
}

/// Get system components, optionally filtered by type. Never errors.
pub async fn get_system_components(
    exec: &dyn SqlExecutor,
    filter: SystemComponentFilter,
) -> SystemComponentQueryResult {
    info!(filters = ?filter, "Getting system components");

    match query_components(exec, &filter).await {
        Ok(components) => {
            let count = components.len();
            SystemComponentQueryResult {
                success: true,
                error: None,
                message: format!("Retrieved {count} system components"),
                components,
                count,
                filters: filter,
            }
        }
        Err(e) => {
            error!(error = %e, "Error getting system components");
            SystemComponentQueryResult {
                success: false,
                error: Some(e.to_string()),
                components: Vec::new(),
                count: 0,
                filters: filter,
                message: "Failed to get system components from database".to_string(),
            }
        }
    }
}

async fn query_components(
    exec: &dyn SqlExecutor,
    filter: &SystemComponentFilter,
) -> ToolResult<Vec<SystemComponentRow>> {
    let mut builder = SelectBuilder::new(
        "SELECT id, name, type, description, created_at, updated_at FROM system_component",
    );

    if let Some(component_type) = &filter.component_type {
        builder = builder.filter(
            "type = :component_type",
            vec![SqlParam::text("component_type", component_type)],
        );
    }

    let (sql, params) = builder.finish("name", "limit", filter.limit.unwrap_or(50));

    debug!("Executing SELECT for system components");
    let response = exec.execute(&sql, params).await?;

    Ok(response
        .records
        .iter()
        .map(|row| SystemComponentRow::from_row(row))
        .collect())
}

/// Batch insert system components in one statement.
///
/// Every item is validated before any SQL is built; one malformed item
/// rejects the whole batch and writes nothing.
pub async fn batch_insert_system_components(
    exec: &dyn SqlExecutor,
    components: &[Value],
) -> ComponentBatchInsertResult {
    info!(count = components.len(), "Batch inserting system components");

    if components.is_empty() {
        warn!("No system components provided for batch insert");
        return ComponentBatchInsertResult {
            success: false,
            error: Some("No system components provided".to_string()),
            inserted_count: 0,
            requested_count: 0,
            component_ids: Vec::new(),
            message: "No system components to insert".to_string(),
        };
    }

    match batch_insert_inner(exec, components).await {
        Ok(ids) if !ids.is_empty() => {
            info!(count = ids.len(), "Successfully batch inserted system components");
            ComponentBatchInsertResult {
                success: true,
                error: None,
                inserted_count: ids.len(),
                requested_count: components.len(),
                message: format!("Successfully inserted {} system components", ids.len()),
                component_ids: ids,
            }
        }
        Ok(_) => {
            warn!("No system components were inserted");
            ComponentBatchInsertResult {
                success: false,
                error: Some("No system components were inserted".to_string()),
                inserted_count: 0,
                requested_count: components.len(),
                component_ids: Vec::new(),
                message: "Failed to insert system components".to_string(),
            }
        }
        Err(e) => {
            error!(error = %e, "Batch insert failed");
            let message = if e.is_validation() {
                "Failed to validate batch insert data"
            } else {
                "Database error during batch insert"
            };
            ComponentBatchInsertResult {
                success: false,
                error: Some(e.to_string()),
                inserted_count: 0,
                requested_count: components.len(),
                component_ids: Vec::new(),
                message: message.to_string(),
            }
        }
    }
}

async fn batch_insert_inner(exec: &dyn SqlExecutor, components: &[Value]) -> ToolResult<Vec<i64>> {
    for (i, component) in components.iter().enumerate() {
        let item = component.as_object().ok_or_else(|| ToolError::Validation {
            message: format!("Component {i} is not an object"),
        })?;
        if !item.contains_key("name") || !item.contains_key("type") {
            return Err(ToolError::Validation {
                message: format!("Component {i} missing required keys 'name' or 'type'"),
            });
        }
        for key in ["name", "type"] {
            match item.get(key).and_then(Value::as_str) {
                Some(v) if !v.trim().is_empty() => {}
                _ => {
                    return Err(ToolError::Validation {
                        message: format!("Component {i} has invalid {key}"),
                    })
                }
            }
        }
    }

    let mut values_clauses = Vec::new();
    let mut params = Vec::new();

    for (i, component) in components.iter().enumerate() {
        let get_str = |key: &str| component.get(key).and_then(Value::as_str);

        values_clauses.push(format!("(:name_{i}, :type_{i}, :description_{i})"));
        params.push(SqlParam::opt_text(format!("name_{i}"), get_str("name")));
        params.push(SqlParam::opt_text(format!("type_{i}"), get_str("type")));
        params.push(SqlParam::opt_text(
            format!("description_{i}"),
            get_str("description"),
        ));
    }

    let sql = format!(
        "INSERT INTO system_component (name, type, description) VALUES {} RETURNING id",
        values_clauses.join(", ")
    );

    debug!(count = components.len(), "Executing batch INSERT for system components");
    let response = exec.execute(&sql, params).await?;
    Ok(response.returned_ids())
}
