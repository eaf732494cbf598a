//! Database access layer for the chaos agent system.
//!
//! Statements run against an Aurora cluster through the RDS Data API; this
//! module owns the wire value model, the parameter formatter, the dynamic
//! query builder shared by every entity tool, and the schema DDL.

mod gateway;
mod param;
mod query;
pub mod schema;

pub use gateway::{DataApiGateway, DbCoordinates, SqlExecutor, DATABASE_NAME, STACK_NAME};
pub use param::{ParamValue, SqlParam};
pub use query::SelectBuilder;

use serde_json::Value;
use tracing::warn;

/// A single tagged value cell from the data API.
///
/// Result rows are ordered lists of these; callers index them positionally,
/// so the column order of every SELECT is part of the contract.
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Bool(bool),
    Long(i64),
    Double(f64),
    Text(String),
}

static NULL_CELL: SqlValue = SqlValue::Null;

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    pub fn as_long(&self) -> Option<i64> {
        match self {
            SqlValue::Long(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_double(&self) -> Option<f64> {
        match self {
            SqlValue::Double(v) => Some(*v),
            SqlValue::Long(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SqlValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            SqlValue::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Text content with the empty string standing in for NULL.
    pub fn text_or_empty(&self) -> String {
        self.as_text().unwrap_or_default().to_string()
    }

    /// Text content, `None` for NULL cells.
    pub fn opt_text(&self) -> Option<String> {
        self.as_text().map(str::to_string)
    }
}

/// Structured response from one statement execution.
#[derive(Debug, Clone, Default)]
pub struct SqlResponse {
    /// Result rows, in SELECT/RETURNING order.
    pub records: Vec<Vec<SqlValue>>,
    /// Row count reported for UPDATE/DELETE statements.
    pub number_of_records_updated: i64,
}

impl SqlResponse {
    /// The generated id returned by a single-row `INSERT ... RETURNING id`.
    pub fn returned_id(&self) -> Option<i64> {
        self.records.first().and_then(|row| cell(row, 0).as_long())
    }

    /// All generated ids from a multi-row `INSERT ... RETURNING id`,
    /// in statement order.
    pub fn returned_ids(&self) -> Vec<i64> {
        self.records
            .iter()
            .filter_map(|row| cell(row, 0).as_long())
            .collect()
    }
}

/// Positional cell access; out-of-range indexes read as NULL.
pub fn cell(row: &[SqlValue], idx: usize) -> &SqlValue {
    row.get(idx).unwrap_or(&NULL_CELL)
}

/// Parse a JSON column cell, falling back to `default` on malformed content.
///
/// Mirrors the lenient read side of the JSON contract: writes are cast to
/// jsonb by the server, reads come back as text.
pub fn json_cell(row: &[SqlValue], idx: usize, field_name: &str, default: Value) -> Value {
    match cell(row, idx).as_text() {
        Some(text) if !text.trim().is_empty() => match serde_json::from_str(text) {
            Ok(value) => value,
            Err(e) => {
                warn!(field = field_name, error = %e, "Failed to parse JSON column");
                default
            }
        },
        _ => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cell_out_of_range_is_null() {
        let row = vec![SqlValue::Long(7)];
        assert_eq!(cell(&row, 0).as_long(), Some(7));
        assert!(cell(&row, 5).is_null());
    }

    #[test]
    fn test_double_coerces_from_long() {
        assert_eq!(SqlValue::Long(3).as_double(), Some(3.0));
        assert_eq!(SqlValue::Double(3.8).as_double(), Some(3.8));
        assert_eq!(SqlValue::Text("3.8".into()).as_double(), None);
    }

    #[test]
    fn test_returned_ids_in_statement_order() {
        let response = SqlResponse {
            records: vec![
                vec![SqlValue::Long(4)],
                vec![SqlValue::Long(5)],
                vec![SqlValue::Long(6)],
            ],
            number_of_records_updated: 0,
        };
        assert_eq!(response.returned_id(), Some(4));
        assert_eq!(response.returned_ids(), vec![4, 5, 6]);
    }

    #[test]
    fn test_json_cell_lenient_parse() {
        let row = vec![SqlValue::Text(r#"{"a":1}"#.into())];
        assert_eq!(json_cell(&row, 0, "meta", json!({})), json!({"a": 1}));

        let row = vec![SqlValue::Text("not json".into())];
        assert_eq!(json_cell(&row, 0, "meta", json!({})), json!({}));

        let row = vec![SqlValue::Null];
        assert_eq!(json_cell(&row, 0, "meta", json!([])), json!([]));
    }
}
