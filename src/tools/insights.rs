//! Learning insight tools for the analysis and iteration phase.

use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use crate::db::{cell, SqlExecutor, SqlParam, SqlValue};
use crate::error::ToolResult;

use super::experiments::{self, ExperimentFilter, ExperimentQueryResult};
use super::hypotheses::{self, HypothesisUpdate};

/// Learnings captured after one experiment run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLearningInsights {
    pub experiment_id: i64,
    pub key_learnings: String,
    pub recommendations: String,
    pub refined_hypotheses: String,
    pub risk_assessment: String,
    pub knowledge_gaps: String,
    pub follow_up_experiments: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LearningInsightRow {
    pub id: Option<i64>,
    pub experiment_id: Option<i64>,
    pub experiment_title: String,
    pub key_learnings: String,
    pub recommendations: String,
    pub refined_hypotheses: String,
    pub risk_assessment: String,
    pub knowledge_gaps: String,
    pub follow_up_experiments: String,
    pub created_at: String,
}

impl LearningInsightRow {
    fn from_row(row: &[SqlValue]) -> Self {
        Self {
            id: cell(row, 0).as_long(),
            experiment_id: cell(row, 1).as_long(),
            key_learnings: cell(row, 2).text_or_empty(),
            recommendations: cell(row, 3).text_or_empty(),
            refined_hypotheses: cell(row, 4).text_or_empty(),
            risk_assessment: cell(row, 5).text_or_empty(),
            knowledge_gaps: cell(row, 6).text_or_empty(),
            follow_up_experiments: cell(row, 7).text_or_empty(),
            created_at: cell(row, 8).text_or_empty(),
            experiment_title: cell(row, 9).text_or_empty(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SaveInsightsResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct LearningHistoryResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub insights: Vec<LearningInsightRow>,
    pub count: usize,
    pub days_back: i64,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct HypothesisStatusResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub hypothesis_id: i64,
    pub message: String,
}

/// Save learning insights and recommendations for an experiment.
pub async fn save_learning_insights(
    exec: &dyn SqlExecutor,
    insights: &NewLearningInsights,
) -> SaveInsightsResult {
    info!(
        experiment_id = insights.experiment_id,
        "Saving learning insights"
    );

    let sql = "INSERT INTO learning_insights ( \
         experiment_id, key_learnings, recommendations, refined_hypotheses, \
         risk_assessment, knowledge_gaps, follow_up_experiments \
         ) VALUES ( \
         :experiment_id, :key_learnings, :recommendations, :refined_hypotheses, \
         :risk_assessment, :knowledge_gaps, :follow_up_experiments \
         )";

    let params = vec![
        SqlParam::long("experiment_id", insights.experiment_id),
        SqlParam::text("key_learnings", &insights.key_learnings),
        SqlParam::text("recommendations", &insights.recommendations),
        SqlParam::text("refined_hypotheses", &insights.refined_hypotheses),
        SqlParam::text("risk_assessment", &insights.risk_assessment),
        SqlParam::text("knowledge_gaps", &insights.knowledge_gaps),
        SqlParam::text("follow_up_experiments", &insights.follow_up_experiments),
    ];

    match exec.execute(sql, params).await {
        Ok(_) => SaveInsightsResult {
            success: true,
            error: None,
            message: "Learning insights saved successfully".to_string(),
        },
        Err(e) => {
            error!(error = %e, "Error saving learning insights");
            SaveInsightsResult {
                success: false,
                error: Some(format!("Failed to save learning insights: {e}")),
                message: "Failed to save learning insights".to_string(),
            }
        }
    }
}

/// Retrieve historical learning insights for trend analysis. Never errors.
pub async fn get_learning_history(exec: &dyn SqlExecutor, days_back: i64) -> LearningHistoryResult {
    info!(days_back, "Retrieving learning history");

    match query_learning_history(exec, days_back).await {
        Ok(insights) => {
            let count = insights.len();
            LearningHistoryResult {
                success: true,
                error: None,
                message: format!("Retrieved {count} learning insights"),
                insights,
                count,
                days_back,
            }
        }
        Err(e) => {
            error!(error = %e, "Error retrieving learning history");
            LearningHistoryResult {
                success: false,
                error: Some(e.to_string()),
                insights: Vec::new(),
                count: 0,
                days_back,
                message: "Failed to retrieve learning history".to_string(),
            }
        }
    }
}

async fn query_learning_history(
    exec: &dyn SqlExecutor,
    days_back: i64,
) -> ToolResult<Vec<LearningInsightRow>> {
    let threshold_date = (Utc::now() - Duration::days(days_back)).to_rfc3339();

    let sql = "SELECT li.id, li.experiment_id, li.key_learnings, li.recommendations, \
         li.refined_hypotheses, li.risk_assessment, li.knowledge_gaps, \
         li.follow_up_experiments, li.created_at, e.title as experiment_title \
         FROM learning_insights li \
         JOIN experiment e ON li.experiment_id = e.id \
         WHERE li.created_at >= :threshold_date \
         ORDER BY li.created_at DESC";

    let params = vec![SqlParam::text("threshold_date", threshold_date)];

    debug!("Executing SELECT for learning history");
    let response = exec.execute(sql, params).await?;

    Ok(response
        .records
        .iter()
        .map(|row| LearningInsightRow::from_row(row))
        .collect())
}

/// Update a hypothesis status from experiment learnings.
pub async fn update_hypothesis_status(
    exec: &dyn SqlExecutor,
    hypothesis_id: i64,
    status: impl Into<String>,
    learning_notes: impl Into<String>,
) -> HypothesisStatusResult {
    let status = status.into();
    info!(hypothesis_id, status = %status, "Updating hypothesis status");

    let update = HypothesisUpdate {
        status: Some(status),
        notes: Some(learning_notes.into()),
        ..Default::default()
    };

    if hypotheses::update_hypothesis(exec, hypothesis_id, &update).await {
        HypothesisStatusResult {
            success: true,
            error: None,
            hypothesis_id,
            message: "Hypothesis status updated successfully".to_string(),
        }
    } else {
        HypothesisStatusResult {
            success: false,
            error: Some("Failed to update hypothesis status".to_string()),
            hypothesis_id,
            message: "Failed to update hypothesis status".to_string(),
        }
    }
}

/// Retrieve experiment results for analysis, optionally narrowed to one
/// experiment id.
pub async fn get_experiment_results(
    exec: &dyn SqlExecutor,
    experiment_id: Option<i64>,
    status: Option<String>,
    limit: i64,
) -> ExperimentQueryResult {
    info!(?experiment_id, ?status, limit, "Retrieving experiment results");

    let filter = ExperimentFilter {
        status,
        hypothesis_id: None,
        limit: Some(limit),
    };

    let mut result = experiments::get_experiments(exec, filter).await;

    if let Some(id) = experiment_id {
        result.experiments.retain(|e| e.id == Some(id));
        result.count = result.experiments.len();
    }

    result
}
