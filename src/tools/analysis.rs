//! Source code and AWS resource analysis tools.
//!
//! Source analyses are an append-only log ("latest" is by timestamp); resource
//! analyses upsert on `resource_id`, so re-analysis of the same resource
//! overwrites its results rather than accumulating rows.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, error, info};

use crate::db::{cell, json_cell, SqlExecutor, SqlParam, SqlValue};
use crate::error::ToolResult;

/// Source code analysis results for one repository scan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewSourceAnalysis {
    pub repository_url: String,
    #[serde(default)]
    pub framework_stack: Option<Vec<String>>,
    #[serde(default)]
    pub aws_services_detected: Option<Vec<String>>,
    #[serde(default)]
    pub infrastructure_patterns: Option<BTreeMap<String, String>>,
    #[serde(default)]
    pub deployment_methods: Option<Vec<String>>,
    #[serde(default)]
    pub architectural_summary: Option<String>,
    #[serde(default)]
    pub failure_points_analysis: Option<String>,
    #[serde(default)]
    pub recommendations: Option<String>,
}

/// AWS resource analysis results; `resource_id` is the upsert key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewResourceAnalysis {
    #[serde(default)]
    pub resource_type: Option<String>,
    #[serde(default)]
    pub resource_id: Option<String>,
    #[serde(default)]
    pub aws_account_id: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub analysis_results: Option<Value>,
    #[serde(default = "default_deployment_status")]
    pub deployment_status: String,
    #[serde(default)]
    pub resource_metadata: Option<Value>,
}

fn default_deployment_status() -> String {
    "unknown".to_string()
}

impl Default for NewResourceAnalysis {
    fn default() -> Self {
        Self {
            resource_type: None,
            resource_id: None,
            aws_account_id: None,
            region: None,
            analysis_results: None,
            deployment_status: default_deployment_status(),
            resource_metadata: None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceAnalysisRow {
    pub id: Option<i64>,
    pub repository_url: String,
    pub framework_stack: Value,
    pub aws_services_detected: Value,
    pub infrastructure_patterns: Value,
    pub deployment_methods: Value,
    pub architectural_summary: Option<String>,
    pub failure_points_analysis: Option<String>,
    pub recommendations: Option<String>,
    pub analysis_timestamp: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResourceAnalysisRow {
    pub id: Option<i64>,
    pub aws_account_id: Option<String>,
    pub region: Option<String>,
    pub resource_metadata: Value,
    pub analysis_timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct SourceAnalysisResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub analysis: Option<SourceAnalysisRow>,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct ResourceAnalysisResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub analysis: Option<ResourceAnalysisRow>,
    pub message: String,
}

/// One deployed resource with its key metadata surfaced for easy access.
#[derive(Debug, Clone, Serialize)]
pub struct DeployedResource {
    pub resource_type: String,
    pub resource_id: String,
    pub resource_metadata: Value,
    pub analysis_results: Value,
    pub aws_account_id: Option<String>,
    pub region: Option<String>,
    pub created_at: String,
    pub deployment_type: Option<String>,
    /// Kubernetes namespace, when the resource lives in an EKS cluster.
    pub namespace: Option<String>,
    pub cluster_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct DeployedResourcesResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub message: String,
    pub resources: Vec<DeployedResource>,
    pub resources_by_type: BTreeMap<String, Vec<DeployedResource>>,
    pub total_count: usize,
}

/// Insert source code analysis results; returns the generated id, or `None`
/// on failure.
pub async fn insert_source_analysis(
    exec: &dyn SqlExecutor,
    analysis: &NewSourceAnalysis,
) -> Option<i64> {
    info!(repository_url = %analysis.repository_url, "Inserting source code analysis");

    let sql = "INSERT INTO source_code_analysis ( \
         repository_url, framework_stack, aws_services_detected, \
         infrastructure_patterns, deployment_methods, \
         architectural_summary, failure_points_analysis, recommendations \
         ) VALUES ( \
         :repository_url, :framework_stack, :aws_services_detected, \
         :infrastructure_patterns, :deployment_methods, \
         :architectural_summary, :failure_points_analysis, :recommendations \
         ) RETURNING id";

    let params = vec![
        SqlParam::text("repository_url", &analysis.repository_url),
        SqlParam::json("framework_stack", analysis.framework_stack.as_ref()),
        SqlParam::json(
            "aws_services_detected",
            analysis.aws_services_detected.as_ref(),
        ),
        SqlParam::json(
            "infrastructure_patterns",
            analysis.infrastructure_patterns.as_ref(),
        ),
        SqlParam::json("deployment_methods", analysis.deployment_methods.as_ref()),
        SqlParam::opt_text(
            "architectural_summary",
            analysis.architectural_summary.as_deref(),
        ),
        SqlParam::opt_text(
            "failure_points_analysis",
            analysis.failure_points_analysis.as_deref(),
        ),
        SqlParam::opt_text("recommendations", analysis.recommendations.as_deref()),
    ];

    match exec.execute(sql, params).await {
        Ok(response) => {
            let id = response.returned_id();
            info!(analysis_id = ?id, "Successfully inserted source code analysis");
            id
        }
        Err(e) => {
            error!(error = %e, "Error inserting source code analysis");
            None
        }
    }
}

/// Insert or replace the analysis for an AWS resource; returns the row id, or
/// `None` on failure. Re-analysis of a known `resource_id` is never an error.
pub async fn insert_resource_analysis(
    exec: &dyn SqlExecutor,
    analysis: &NewResourceAnalysis,
) -> Option<i64> {
    info!(
        resource_type = analysis.resource_type.as_deref().unwrap_or(""),
        resource_id = analysis.resource_id.as_deref().unwrap_or(""),
        "Inserting AWS resource analysis"
    );

    let sql = "INSERT INTO aws_resource_analysis ( \
         resource_type, resource_id, aws_account_id, region, \
         analysis_results, deployment_status, resource_metadata \
         ) VALUES ( \
         :resource_type, :resource_id, :aws_account_id, :region, \
         :analysis_results, :deployment_status, :resource_metadata \
         ) ON CONFLICT (resource_id) DO UPDATE SET \
         analysis_results = EXCLUDED.analysis_results, \
         deployment_status = EXCLUDED.deployment_status, \
         resource_metadata = EXCLUDED.resource_metadata, \
         updated_at = CURRENT_TIMESTAMP \
         RETURNING id";

    let params = vec![
        SqlParam::opt_text("resource_type", analysis.resource_type.as_deref()),
        SqlParam::opt_text("resource_id", analysis.resource_id.as_deref()),
        SqlParam::opt_text("aws_account_id", analysis.aws_account_id.as_deref()),
        SqlParam::opt_text("region", analysis.region.as_deref()),
        SqlParam::json("analysis_results", analysis.analysis_results.as_ref()),
        SqlParam::text("deployment_status", &analysis.deployment_status),
        SqlParam::json("resource_metadata", analysis.resource_metadata.as_ref()),
    ];

    match exec.execute(sql, params).await {
        Ok(response) => {
            let id = response.returned_id();
            info!(analysis_id = ?id, "Successfully inserted AWS resource analysis");
            id
        }
        Err(e) => {
            error!(error = %e, "Error inserting AWS resource analysis");
            None
        }
    }
}

/// Get the most recent source code analysis. Never errors.
pub async fn get_source_analysis(exec: &dyn SqlExecutor) -> SourceAnalysisResult {
    info!("Getting latest source code analysis");

    let sql = "SELECT id, repository_url, framework_stack, aws_services_detected, \
         infrastructure_patterns, deployment_methods, \
         architectural_summary, failure_points_analysis, recommendations, \
         analysis_timestamp \
         FROM source_code_analysis \
         ORDER BY analysis_timestamp DESC \
         LIMIT 1";

    match exec.execute(sql, Vec::new()).await {
        Ok(response) => match response.records.first() {
            Some(row) => SourceAnalysisResult {
                success: true,
                error: None,
                analysis: Some(SourceAnalysisRow {
                    id: cell(row, 0).as_long(),
                    repository_url: cell(row, 1).text_or_empty(),
                    framework_stack: json_cell(row, 2, "framework_stack", json!([])),
                    aws_services_detected: json_cell(row, 3, "aws_services_detected", json!([])),
                    infrastructure_patterns: json_cell(
                        row,
                        4,
                        "infrastructure_patterns",
                        json!({}),
                    ),
                    deployment_methods: json_cell(row, 5, "deployment_methods", json!([])),
                    architectural_summary: cell(row, 6).opt_text(),
                    failure_points_analysis: cell(row, 7).opt_text(),
                    recommendations: cell(row, 8).opt_text(),
                    analysis_timestamp: cell(row, 9).text_or_empty(),
                }),
                message: "Source code analysis retrieved successfully".to_string(),
            },
            None => SourceAnalysisResult {
                success: false,
                error: None,
                analysis: None,
                message: "No source code analysis found".to_string(),
            },
        },
        Err(e) => {
            error!(error = %e, "Error getting source code analysis");
            SourceAnalysisResult {
                success: false,
                error: Some(e.to_string()),
                analysis: None,
                message: "Failed to get source code analysis".to_string(),
            }
        }
    }
}

/// Get the most recent AWS resource analysis. Never errors.
pub async fn get_resource_analysis(exec: &dyn SqlExecutor) -> ResourceAnalysisResult {
    info!("Getting latest AWS resource analysis");

    let sql = "SELECT id, aws_account_id, region, resource_metadata, analysis_timestamp \
         FROM aws_resource_analysis \
         ORDER BY analysis_timestamp DESC \
         LIMIT 1";

    match exec.execute(sql, Vec::new()).await {
        Ok(response) => match response.records.first() {
            Some(row) => ResourceAnalysisResult {
                success: true,
                error: None,
                analysis: Some(ResourceAnalysisRow {
                    id: cell(row, 0).as_long(),
                    aws_account_id: cell(row, 1).opt_text(),
                    region: cell(row, 2).opt_text(),
                    resource_metadata: json_cell(row, 3, "resource_metadata", json!({})),
                    analysis_timestamp: cell(row, 4).text_or_empty(),
                }),
                message: "AWS resource analysis retrieved successfully".to_string(),
            },
            None => ResourceAnalysisResult {
                success: false,
                error: None,
                analysis: None,
                message: "No AWS resource analysis found".to_string(),
            },
        },
        Err(e) => {
            error!(error = %e, "Error getting AWS resource analysis");
            ResourceAnalysisResult {
                success: false,
                error: Some(e.to_string()),
                analysis: None,
                message: "Failed to get AWS resource analysis".to_string(),
            }
        }
    }
}

/// Get only deployed AWS resources, grouped by type, for hypothesis
/// generation. Never errors.
pub async fn get_deployed_resources(exec: &dyn SqlExecutor) -> DeployedResourcesResult {
    info!("Getting deployed AWS resources for hypothesis generation");

    match query_deployed_resources(exec).await {
        Ok(resources) if resources.is_empty() => DeployedResourcesResult {
            success: false,
            error: None,
            message: "No deployed resources found".to_string(),
            resources: Vec::new(),
            resources_by_type: BTreeMap::new(),
            total_count: 0,
        },
        Ok(resources) => {
            let mut resources_by_type: BTreeMap<String, Vec<DeployedResource>> = BTreeMap::new();
            for resource in &resources {
                resources_by_type
                    .entry(resource.resource_type.clone())
                    .or_default()
                    .push(resource.clone());
            }

            DeployedResourcesResult {
                success: true,
                error: None,
                message: format!("Retrieved {} deployed resources", resources.len()),
                total_count: resources.len(),
                resources,
                resources_by_type,
            }
        }
        Err(e) => {
            error!(error = %e, "Error getting deployed resources");
            DeployedResourcesResult {
                success: false,
                error: Some(e.to_string()),
                message: "Failed to get deployed resources".to_string(),
                resources: Vec::new(),
                resources_by_type: BTreeMap::new(),
                total_count: 0,
            }
        }
    }
}

async fn query_deployed_resources(exec: &dyn SqlExecutor) -> ToolResult<Vec<DeployedResource>> {
    let sql = "SELECT resource_type, resource_id, resource_metadata, analysis_results, \
         aws_account_id, region, created_at \
         FROM aws_resource_analysis \
         WHERE deployment_status = 'deployed' \
         ORDER BY created_at DESC";

    debug!("Executing SELECT for deployed resources");
    let response = exec.execute(sql, Vec::new()).await?;

    Ok(response
        .records
        .iter()
        .map(|row| deployed_resource_from_row(row))
        .collect())
}

fn deployed_resource_from_row(row: &[SqlValue]) -> DeployedResource {
    let resource_metadata = json_cell(row, 2, "resource_metadata", json!({}));
    let analysis_results = json_cell(row, 3, "analysis_results", json!({}));

    let metadata_str = |key: &str| {
        resource_metadata
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
    };
    let deployment_type = metadata_str("deployment_type");
    let namespace = metadata_str("namespace");
    let cluster_name = metadata_str("cluster_name");

    DeployedResource {
        resource_type: cell(row, 0).text_or_empty(),
        resource_id: cell(row, 1).text_or_empty(),
        aws_account_id: cell(row, 4).opt_text(),
        region: cell(row, 5).opt_text(),
        created_at: cell(row, 6).text_or_empty(),
        deployment_type,
        namespace,
        cluster_name,
        resource_metadata,
        analysis_results,
    }
}
