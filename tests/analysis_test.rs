//! Tool-boundary tests for source/resource analysis and deployed-resource
//! filtering.

mod common;

use pretty_assertions::assert_eq;
use serde_json::json;

use chaos_agent::db::{ParamValue, SqlValue};
use chaos_agent::tools::analysis::{
    get_deployed_resources, get_resource_analysis, get_source_analysis, insert_resource_analysis,
    insert_source_analysis, NewResourceAnalysis, NewSourceAnalysis,
};

use common::{id_response, rows_response, FakeExecutor};

#[tokio::test]
async fn source_analysis_json_fields_are_tagged() {
    let exec = FakeExecutor::new();
    exec.push_response(id_response(&[5]));

    let analysis = NewSourceAnalysis {
        repository_url: "https://github.com/aws-containers/retail-store-sample-app.git"
            .to_string(),
        framework_stack: Some(vec!["spring-boot".to_string(), "go".to_string()]),
        aws_services_detected: Some(vec!["ECS".to_string(), "RDS".to_string()]),
        ..Default::default()
    };
    let id = insert_source_analysis(&exec, &analysis).await;
    assert_eq!(id, Some(5));

    let call = exec.last_call();
    assert!(call.sql.contains("INSERT INTO source_code_analysis"));

    let framework = call.params.iter().find(|p| p.name == "framework_stack").unwrap();
    assert!(framework.json);
    assert_eq!(
        framework.value,
        ParamValue::Text(r#"["spring-boot","go"]"#.to_string())
    );

    // Absent JSON fields travel as plain NULLs
    let patterns = call
        .params
        .iter()
        .find(|p| p.name == "infrastructure_patterns")
        .unwrap();
    assert_eq!(patterns.value, ParamValue::Null);
    assert!(!patterns.json);
}

#[tokio::test]
async fn resource_analysis_upserts_on_resource_id() {
    let exec = FakeExecutor::new();
    exec.push_response(id_response(&[9]));
    exec.push_response(id_response(&[9]));

    let first = NewResourceAnalysis {
        resource_type: Some("EC2Instance".to_string()),
        resource_id: Some("i-123".to_string()),
        analysis_results: Some(json!({"finding": "single az"})),
        deployment_status: "deployed".to_string(),
        ..Default::default()
    };
    let second = NewResourceAnalysis {
        analysis_results: Some(json!({"finding": "multi az now"})),
        ..first.clone()
    };

    // Re-analysis of the same resource id is an overwrite, never an error:
    // both calls run the same conflict-update statement against one row.
    assert_eq!(insert_resource_analysis(&exec, &first).await, Some(9));
    assert_eq!(insert_resource_analysis(&exec, &second).await, Some(9));

    let calls = exec.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].sql, calls[1].sql);
    assert!(calls[0].sql.contains("ON CONFLICT (resource_id) DO UPDATE SET"));
    assert!(calls[0].sql.contains("analysis_results = EXCLUDED.analysis_results"));
    assert!(calls[0].sql.contains("deployment_status = EXCLUDED.deployment_status"));
    assert!(calls[0].sql.contains("updated_at = CURRENT_TIMESTAMP"));

    let results = calls[1]
        .params
        .iter()
        .find(|p| p.name == "analysis_results")
        .unwrap();
    assert_eq!(
        results.value,
        ParamValue::Text(r#"{"finding":"multi az now"}"#.to_string())
    );
}

#[tokio::test]
async fn latest_source_analysis_by_timestamp() {
    let exec = FakeExecutor::new();
    exec.push_response(rows_response(vec![vec![
        SqlValue::Long(2),
        SqlValue::Text("https://github.com/example/app.git".to_string()),
        SqlValue::Text(r#"["rust"]"#.to_string()),
        SqlValue::Text(r#"["EKS"]"#.to_string()),
        SqlValue::Null,
        SqlValue::Null,
        SqlValue::Text("three services behind an ALB".to_string()),
        SqlValue::Null,
        SqlValue::Null,
        SqlValue::Text("2025-02-01T00:00:00Z".to_string()),
    ]]));

    let result = get_source_analysis(&exec).await;

    assert!(result.success);
    let analysis = result.analysis.unwrap();
    assert_eq!(analysis.framework_stack, json!(["rust"]));
    assert_eq!(analysis.infrastructure_patterns, json!({}));

    let call = exec.last_call();
    assert!(call.sql.contains("ORDER BY analysis_timestamp DESC"));
    assert!(call.sql.contains("LIMIT 1"));
}

#[tokio::test]
async fn missing_analyses_report_not_found() {
    let exec = FakeExecutor::new();
    let result = get_source_analysis(&exec).await;
    assert!(!result.success);
    assert!(result.analysis.is_none());
    assert_eq!(result.message, "No source code analysis found");

    let result = get_resource_analysis(&exec).await;
    assert!(!result.success);
    assert_eq!(result.message, "No AWS resource analysis found");
}

#[tokio::test]
async fn deployed_resources_grouped_with_surfaced_metadata() {
    let exec = FakeExecutor::new();
    exec.push_response(rows_response(vec![
        vec![
            SqlValue::Text("EKSDeployment".to_string()),
            SqlValue::Text("carts".to_string()),
            SqlValue::Text(
                r#"{"deployment_type":"eks","namespace":"retail","cluster_name":"store"}"#
                    .to_string(),
            ),
            SqlValue::Text(r#"{"replicas":2}"#.to_string()),
            SqlValue::Text("123456789012".to_string()),
            SqlValue::Text("us-east-1".to_string()),
            SqlValue::Text("2025-02-01T00:00:00Z".to_string()),
        ],
        vec![
            SqlValue::Text("RDSInstance".to_string()),
            SqlValue::Text("orders-db".to_string()),
            SqlValue::Null,
            SqlValue::Null,
            SqlValue::Null,
            SqlValue::Null,
            SqlValue::Text("2025-01-15T00:00:00Z".to_string()),
        ],
    ]));

    let result = get_deployed_resources(&exec).await;

    assert!(result.success);
    assert_eq!(result.total_count, 2);
    assert_eq!(result.resources[0].namespace.as_deref(), Some("retail"));
    assert_eq!(result.resources[0].cluster_name.as_deref(), Some("store"));
    assert_eq!(result.resources[1].resource_metadata, json!({}));
    assert_eq!(result.resources_by_type["EKSDeployment"].len(), 1);
    assert_eq!(result.resources_by_type["RDSInstance"].len(), 1);

    let call = exec.last_call();
    assert!(call.sql.contains("WHERE deployment_status = 'deployed'"));
    assert!(call.sql.contains("ORDER BY created_at DESC"));
}

#[tokio::test]
async fn no_deployed_resources_is_not_success() {
    let exec = FakeExecutor::new();
    let result = get_deployed_resources(&exec).await;
    assert!(!result.success);
    assert_eq!(result.message, "No deployed resources found");
    assert_eq!(result.total_count, 0);
}
