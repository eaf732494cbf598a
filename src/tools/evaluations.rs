//! Hypothesis evaluation database tools.
//!
//! At most one evaluation row exists per hypothesis: inserts upsert on
//! `hypothesis_id`, overwriting every score column and refreshing the
//! evaluation timestamp.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::db::{cell, SelectBuilder, SqlExecutor, SqlParam, SqlValue};
use crate::error::{ToolError, ToolResult};

const SCORE_KEYS: &[&str] = &[
    "testability_score",
    "specificity_score",
    "realism_score",
    "safety_score",
    "learning_value_score",
];

const UPSERT_CLAUSE: &str = "ON CONFLICT (hypothesis_id) DO UPDATE SET \
     testability_score = EXCLUDED.testability_score, \
     specificity_score = EXCLUDED.specificity_score, \
     realism_score = EXCLUDED.realism_score, \
     safety_score = EXCLUDED.safety_score, \
     learning_value_score = EXCLUDED.learning_value_score, \
     overall_score = EXCLUDED.overall_score, \
     evaluation_timestamp = CURRENT_TIMESTAMP";

/// Quality scores for one hypothesis. The five dimension scores must be in
/// 1..=5 and the overall score in [1.0, 5.0].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationScores {
    pub hypothesis_id: i64,
    pub testability_score: i64,
    pub specificity_score: i64,
    pub realism_score: i64,
    pub safety_score: i64,
    pub learning_value_score: i64,
    pub overall_score: f64,
}

impl EvaluationScores {
    fn validate(&self) -> Result<(), ToolError> {
        for (name, score) in [
            ("testability", self.testability_score),
            ("specificity", self.specificity_score),
            ("realism", self.realism_score),
            ("safety", self.safety_score),
            ("learning_value", self.learning_value_score),
        ] {
            if !(1..=5).contains(&score) {
                return Err(ToolError::Validation {
                    message: format!("{name}_score must be an integer between 1 and 5"),
                });
            }
        }
        if !(1.0..=5.0).contains(&self.overall_score) {
            return Err(ToolError::Validation {
                message: "overall_score must be a number between 1 and 5".to_string(),
            });
        }
        Ok(())
    }
}

/// Optional filters for evaluation queries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EvaluationFilter {
    pub hypothesis_ids: Option<Vec<i64>>,
    pub min_overall_score: Option<f64>,
    pub max_overall_score: Option<f64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationRow {
    pub id: Option<i64>,
    pub hypothesis_id: Option<i64>,
    pub hypothesis_title: String,
    pub testability_score: i64,
    pub specificity_score: i64,
    pub realism_score: i64,
    pub safety_score: i64,
    pub learning_value_score: i64,
    pub overall_score: f64,
    pub evaluation_timestamp: String,
}

impl EvaluationRow {
    fn from_row(row: &[SqlValue]) -> Self {
        Self {
            id: cell(row, 0).as_long(),
            hypothesis_id: cell(row, 1).as_long(),
            hypothesis_title: cell(row, 2).text_or_empty(),
            testability_score: cell(row, 3).as_long().unwrap_or_default(),
            specificity_score: cell(row, 4).as_long().unwrap_or_default(),
            realism_score: cell(row, 5).as_long().unwrap_or_default(),
            safety_score: cell(row, 6).as_long().unwrap_or_default(),
            learning_value_score: cell(row, 7).as_long().unwrap_or_default(),
            overall_score: cell(row, 8).as_double().unwrap_or_default(),
            evaluation_timestamp: cell(row, 9).text_or_empty(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EvaluationWriteResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evaluation_id: Option<i64>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct EvaluationBatchResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Rows the upsert touched; inserted and updated rows are reported as one
    /// undifferentiated count.
    pub inserted_count: i64,
    pub requested_count: usize,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct EvaluationQueryResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub evaluations: Vec<EvaluationRow>,
    pub count: usize,
    pub filters: EvaluationFilter,
    pub message: String,
}

/// Insert or replace the evaluation for one hypothesis.
///
/// Scores are validated before any statement executes; out-of-range input is
/// a validation-error result, not a database call.
pub async fn insert_evaluation(
    exec: &dyn SqlExecutor,
    scores: &EvaluationScores,
) -> EvaluationWriteResult {
    info!(
        hypothesis_id = scores.hypothesis_id,
        "Inserting evaluation for hypothesis"
    );

    if let Err(e) = scores.validate() {
        error!(error = %e, "Evaluation validation failed");
        return EvaluationWriteResult {
            success: false,
            error: Some(e.to_string()),
            evaluation_id: None,
            message: "Failed to insert evaluation due to validation error".to_string(),
        };
    }

    let sql = format!(
        "INSERT INTO hypothesis_evaluation ( \
         hypothesis_id, testability_score, specificity_score, realism_score, \
         safety_score, learning_value_score, overall_score \
         ) VALUES ( \
         :hypothesis_id, :testability_score, :specificity_score, :realism_score, \
         :safety_score, :learning_value_score, :overall_score \
         ) {UPSERT_CLAUSE} RETURNING id"
    );

    let params = vec![
        SqlParam::long("hypothesis_id", scores.hypothesis_id),
        SqlParam::long("testability_score", scores.testability_score),
        SqlParam::long("specificity_score", scores.specificity_score),
        SqlParam::long("realism_score", scores.realism_score),
        SqlParam::long("safety_score", scores.safety_score),
        SqlParam::long("learning_value_score", scores.learning_value_score),
        SqlParam::double("overall_score", scores.overall_score),
    ];

    match exec.execute(&sql, params).await {
        Ok(response) => {
            let evaluation_id = response.returned_id();
            info!(?evaluation_id, "Successfully inserted/updated evaluation");
            EvaluationWriteResult {
                success: true,
                error: None,
                evaluation_id,
                message: format!(
                    "Successfully inserted/updated evaluation for hypothesis {}",
                    scores.hypothesis_id
                ),
            }
        }
        Err(e) => {
            error!(error = %e, "Error inserting hypothesis evaluation");
            EvaluationWriteResult {
                success: false,
                error: Some(e.to_string()),
                evaluation_id: None,
                message: "Failed to insert hypothesis evaluation".to_string(),
            }
        }
    }
}

/// Batch upsert evaluations in one statement.
///
/// Every item is validated before any SQL is built; one malformed item
/// rejects the whole batch and writes nothing.
pub async fn batch_insert_evaluations(
    exec: &dyn SqlExecutor,
    evaluations: &[Value],
) -> EvaluationBatchResult {
    info!(count = evaluations.len(), "Batch inserting hypothesis evaluations");

    if evaluations.is_empty() {
        warn!("No evaluations provided for batch insert");
        return EvaluationBatchResult {
            success: false,
            error: Some("No evaluations provided".to_string()),
            inserted_count: 0,
            requested_count: 0,
            message: "No evaluations to insert".to_string(),
        };
    }

    match batch_insert_inner(exec, evaluations).await {
        Ok(affected) => {
            info!(affected, "Successfully batch inserted/updated evaluations");
            EvaluationBatchResult {
                success: true,
                error: None,
                inserted_count: affected,
                requested_count: evaluations.len(),
                message: format!("Successfully inserted/updated {affected} evaluations"),
            }
        }
        Err(e) => {
            error!(error = %e, "Batch evaluation insert failed");
            let message = if e.is_validation() {
                "Failed to validate batch insert data"
            } else {
                "Failed to batch insert evaluations"
            };
            EvaluationBatchResult {
                success: false,
                error: Some(e.to_string()),
                inserted_count: 0,
                requested_count: evaluations.len(),
                message: message.to_string(),
            }
        }
    }
}

async fn batch_insert_inner(exec: &dyn SqlExecutor, evaluations: &[Value]) -> ToolResult<i64> {
    for (i, evaluation) in evaluations.iter().enumerate() {
        let item = evaluation.as_object().ok_or_else(|| ToolError::Validation {
            message: format!("Evaluation {i} is not an object"),
        })?;

        for key in ["hypothesis_id"]
            .iter()
            .chain(SCORE_KEYS)
            .chain(["overall_score"].iter())
        {
            if !item.contains_key(*key) {
                return Err(ToolError::Validation {
                    message: format!("Evaluation {i} missing required key '{key}'"),
                });
            }
        }

        for key in SCORE_KEYS {
            match item.get(*key).and_then(Value::as_i64) {
                Some(score) if (1..=5).contains(&score) => {}
                _ => {
                    return Err(ToolError::Validation {
                        message: format!(
                            "Evaluation {i}: {key} must be an integer between 1 and 5"
                        ),
                    })
                }
            }
        }

        match item.get("overall_score").and_then(Value::as_f64) {
            Some(score) if (1.0..=5.0).contains(&score) => {}
            _ => {
                return Err(ToolError::Validation {
                    message: format!(
                        "Evaluation {i}: overall_score must be a number between 1 and 5"
                    ),
                })
            }
        }
    }

    let mut values_clauses = Vec::new();
    let mut params = Vec::new();

    for (i, evaluation) in evaluations.iter().enumerate() {
        let get_long = |key: &str| evaluation.get(key).and_then(Value::as_i64).unwrap_or_default();

        values_clauses.push(format!(
            "(:hypothesis_id_{i}, :testability_score_{i}, :specificity_score_{i}, \
             :realism_score_{i}, :safety_score_{i}, :learning_value_score_{i}, :overall_score_{i})"
        ));

        params.push(SqlParam::long(
            format!("hypothesis_id_{i}"),
            get_long("hypothesis_id"),
        ));
        for key in SCORE_KEYS {
            params.push(SqlParam::long(format!("{key}_{i}"), get_long(key)));
        }
        params.push(SqlParam::double(
            format!("overall_score_{i}"),
            evaluation
                .get("overall_score")
                .and_then(Value::as_f64)
                .unwrap_or_default(),
        ));
    }

    let sql = format!(
        "INSERT INTO hypothesis_evaluation ( \
         hypothesis_id, testability_score, specificity_score, realism_score, \
         safety_score, learning_value_score, overall_score \
         ) VALUES {} {UPSERT_CLAUSE}",
        values_clauses.join(", ")
    );

    debug!(count = evaluations.len(), "Executing batch UPSERT for evaluations");
    let response = exec.execute(&sql, params).await?;
    Ok(response.number_of_records_updated)
}

/// Get evaluations with their hypothesis titles, best scores first. Never
/// errors.
pub async fn get_evaluations(
    exec: &dyn SqlExecutor,
    filter: EvaluationFilter,
) -> EvaluationQueryResult {
    info!(filters = ?filter, "Getting hypothesis evaluations");

    match query_evaluations(exec, &filter).await {
        Ok(evaluations) => {
            info!(count = evaluations.len(), "Retrieved evaluations from database");
            let count = evaluations.len();
            EvaluationQueryResult {
                success: true,
                error: None,
                message: format!("Retrieved {count} evaluations"),
                evaluations,
                count,
                filters: filter,
            }
        }
        Err(e) => {
            error!(error = %e, "Error getting hypothesis evaluations");
            EvaluationQueryResult {
                success: false,
                error: Some(e.to_string()),
                evaluations: Vec::new(),
                count: 0,
                filters: filter,
                message: "Failed to get evaluations from database".to_string(),
            }
        }
    }
}

async fn query_evaluations(
    exec: &dyn SqlExecutor,
    filter: &EvaluationFilter,
) -> ToolResult<Vec<EvaluationRow>> {
    let mut builder = SelectBuilder::new(
        "SELECT he.id, he.hypothesis_id, h.title as hypothesis_title, \
         he.testability_score, he.specificity_score, he.realism_score, \
         he.safety_score, he.learning_value_score, he.overall_score, \
         he.evaluation_timestamp \
         FROM hypothesis_evaluation he \
         JOIN hypothesis h ON he.hypothesis_id = h.id",
    );

    if let Some(ids) = &filter.hypothesis_ids {
        builder = builder.filter_in("he.hypothesis_id", "id", ids);
    }
    if let Some(min_score) = filter.min_overall_score {
        builder = builder.filter(
            "he.overall_score >= :min_score",
            vec![SqlParam::double("min_score", min_score)],
        );
    }
    if let Some(max_score) = filter.max_overall_score {
        builder = builder.filter(
            "he.overall_score <= :max_score",
            vec![SqlParam::double("max_score", max_score)],
        );
    }

    let (sql, params) = builder.finish("he.overall_score DESC", "limit", filter.limit.unwrap_or(50));

    debug!("Executing SELECT for hypothesis evaluations");
    let response = exec.execute(&sql, params).await?;

    Ok(response
        .records
        .iter()
        .map(|row| EvaluationRow::from_row(row))
        .collect())
}
