//! Tool-boundary tests for experiments, system components, the view reader,
//! and the learning tools.

mod common;

use pretty_assertions::assert_eq;
use serde_json::json;

use chaos_agent::db::{ParamValue, SqlValue};
use chaos_agent::tools::components::{
    batch_insert_system_components, get_system_components, insert_system_component,
    NewSystemComponent, SystemComponentFilter,
};
use chaos_agent::tools::experiments::{
    get_experiments, insert_experiment, update_experiment, ExperimentFilter, ExperimentUpdate,
    NewExperiment,
};
use chaos_agent::tools::insights::{
    get_experiment_results, get_learning_history, save_learning_insights, update_hypothesis_status,
    NewLearningInsights,
};
use chaos_agent::tools::views::{get_experiments_with_context, ExperimentContextFilter};

use common::{id_response, rows_response, updated_response, FakeExecutor};

fn experiment_row(id: i64, status: &str) -> Vec<SqlValue> {
    vec![
        SqlValue::Long(id),
        SqlValue::Long(1),
        SqlValue::Text(format!("experiment-{id}")),
        SqlValue::Text("stop one task".to_string()),
        SqlValue::Text("plan".to_string()),
        SqlValue::Text(r#"{"actions":{"stopTask":{}}}"#.to_string()),
        SqlValue::Text("not valid json".to_string()),
        SqlValue::Text(status.to_string()),
        SqlValue::Text("2025-01-01T00:00:00Z".to_string()),
        SqlValue::Text("2025-01-01T00:00:00Z".to_string()),
        SqlValue::Text("hypothesis title".to_string()),
        SqlValue::Null,
        SqlValue::Null,
        SqlValue::Null,
    ]
}

#[tokio::test]
async fn experiment_insert_casts_json_columns() {
    let exec = FakeExecutor::new();
    exec.push_response(id_response(&[21]));

    let experiment = NewExperiment::new(
        "ECS task stop",
        3,
        "Stop one task",
        "1. stop 2. observe 3. rollback",
        json!({"actions": {"stopTask": {}}}),
    )
    .with_role_configuration(json!({"roleArn": "arn:aws:iam::123:role/fis"}));

    let id = insert_experiment(&exec, &experiment).await;
    assert_eq!(id, Some(21));

    let call = exec.last_call();
    assert!(call.sql.contains(":fis_configuration::jsonb"));
    assert!(call.sql.contains(":fis_role_configuration::jsonb"));
    assert!(call.sql.contains("RETURNING id"));

    let config = call
        .params
        .iter()
        .find(|p| p.name == "fis_configuration")
        .unwrap();
    assert_eq!(
        config.value,
        ParamValue::Text(r#"{"actions":{"stopTask":{}}}"#.to_string())
    );
}

#[tokio::test]
async fn experiment_get_parses_role_configuration_leniently() {
    let exec = FakeExecutor::new();
    exec.push_response(rows_response(vec![experiment_row(7, "draft")]));

    let filter = ExperimentFilter {
        status: Some("draft".to_string()),
        ..Default::default()
    };
    let result = get_experiments(&exec, filter).await;

    assert!(result.success);
    let experiment = &result.experiments[0];
    assert_eq!(experiment.fis_configuration, json!({"actions": {"stopTask": {}}}));
    // Malformed role configuration reads as None, not an error
    assert!(experiment.fis_role_configuration.is_none());

    let call = exec.last_call();
    assert!(call.sql.contains("e.status = :status"));
    assert!(call.sql.contains("ORDER BY e.created_at DESC"));
    assert_eq!(call.params.last().unwrap().value, ParamValue::Long(10));
}

#[tokio::test]
async fn experiment_update_casts_timestamps() {
    let exec = FakeExecutor::new();
    exec.push_response(updated_response(1));

    let update = ExperimentUpdate {
        status: Some("completed".to_string()),
        fis_experiment_id: Some("EXP123".to_string()),
        completed_at: Some("2025-02-01T10:00:00Z".to_string()),
        ..Default::default()
    };
    assert!(update_experiment(&exec, 7, &update).await);

    let call = exec.last_call();
    assert!(call.sql.contains("fis_experiment_id = :fis_experiment_id"));
    assert!(call
        .sql
        .contains("completed_at = :completed_at::timestamp with time zone"));
    assert!(call.sql.contains("updated_at = CURRENT_TIMESTAMP"));
}

#[tokio::test]
async fn experiment_update_without_fields_is_a_no_op() {
    let exec = FakeExecutor::new();
    assert!(!update_experiment(&exec, 7, &ExperimentUpdate::default()).await);
    assert_eq!(exec.call_count(), 0);
}

#[tokio::test]
async fn component_insert_and_typed_get() {
    let exec = FakeExecutor::new();
    exec.push_response(id_response(&[2]));
    exec.push_response(rows_response(vec![vec![
        SqlValue::Long(2),
        SqlValue::Text("Web API".to_string()),
        SqlValue::Text("ECS Service".to_string()),
        SqlValue::Null,
        SqlValue::Text("2025-01-01T00:00:00Z".to_string()),
        SqlValue::Text("2025-01-01T00:00:00Z".to_string()),
    ]]));

    let id = insert_system_component(
        &exec,
        &NewSystemComponent::new("Web API", "ECS Service"),
    )
    .await;
    assert_eq!(id, Some(2));

    let filter = SystemComponentFilter {
        component_type: Some("ECS Service".to_string()),
        ..Default::default()
    };
    let result = get_system_components(&exec, filter).await;
    assert!(result.success);
    assert_eq!(result.components[0].name, "Web API");

    let call = exec.last_call();
    assert!(call.sql.contains("type = :component_type"));
    assert!(call.sql.contains("ORDER BY name"));
}

#[tokio::test]
async fn component_batch_requires_name_and_type() {
    let exec = FakeExecutor::new();

    let components = vec![
        json!({"name": "Web API", "type": "ECS Service"}),
        json!({"name": "Orders DB"}),
    ];
    let result = batch_insert_system_components(&exec, &components).await;

    assert!(!result.success);
    assert!(result
        .error
        .unwrap()
        .contains("missing required keys 'name' or 'type'"));
    assert_eq!(exec.call_count(), 0);
}

#[tokio::test]
async fn view_reader_preserves_column_contract() {
    let exec = FakeExecutor::new();
    exec.push_response(rows_response(vec![vec![
        SqlValue::Long(4),
        SqlValue::Text("ECS task stop".to_string()),
        SqlValue::Text("stop one task".to_string()),
        SqlValue::Text("plan".to_string()),
        SqlValue::Text("created".to_string()),
        SqlValue::Null,
        SqlValue::Text("2025-02-01T09:00:00Z".to_string()),
        SqlValue::Null,
        SqlValue::Text("2025-01-01T00:00:00Z".to_string()),
        SqlValue::Text("API survives restarts".to_string()),
        SqlValue::Null,
        SqlValue::Text("prioritized".to_string()),
        SqlValue::Text("Web API".to_string()),
        SqlValue::Text("ECS Service".to_string()),
    ]]));

    let filter = ExperimentContextFilter {
        status: Some("created".to_string()),
        hypothesis_status: Some("prioritized".to_string()),
        component_type: Some("ECS Service".to_string()),
        ..Default::default()
    };
    let result = get_experiments_with_context(&exec, filter).await;

    assert!(result.success);
    let row = &result.experiments[0];
    assert_eq!(row.executed_at.as_deref(), Some("2025-02-01T09:00:00Z"));
    assert_eq!(row.hypothesis_status.as_deref(), Some("prioritized"));
    assert_eq!(row.component_type.as_deref(), Some("ECS Service"));

    let call = exec.last_call();
    assert!(call.sql.contains("FROM experiment_with_hypothesis"));
    assert!(call.sql.contains("status = :status"));
    assert!(call.sql.contains("hypothesis_status = :hypothesis_status"));
    assert!(call.sql.contains("component_type = :component_type"));
}

#[tokio::test]
async fn learning_insights_saved_with_all_fields() {
    let exec = FakeExecutor::new();

    let insights = NewLearningInsights {
        experiment_id: 4,
        key_learnings: "service degraded gracefully".to_string(),
        recommendations: "add a circuit breaker".to_string(),
        refined_hypotheses: "retry storms under partial failure".to_string(),
        risk_assessment: "low blast radius confirmed".to_string(),
        knowledge_gaps: "no data on cold starts".to_string(),
        follow_up_experiments: "repeat with double load".to_string(),
    };
    let result = save_learning_insights(&exec, &insights).await;

    assert!(result.success);
    let call = exec.last_call();
    assert!(call.sql.contains("INSERT INTO learning_insights"));
    assert_eq!(call.params.len(), 7);
}

#[tokio::test]
async fn learning_history_filters_by_threshold() {
    let exec = FakeExecutor::new();
    exec.push_response(rows_response(vec![]));

    let result = get_learning_history(&exec, 30).await;
    assert!(result.success);
    assert_eq!(result.days_back, 30);

    let call = exec.last_call();
    assert!(call.sql.contains("WHERE li.created_at >= :threshold_date"));
    assert!(call.sql.contains("ORDER BY li.created_at DESC"));
    assert_eq!(call.params[0].name, "threshold_date");
}

#[tokio::test]
async fn hypothesis_status_update_delegates() {
    let exec = FakeExecutor::new();
    exec.push_response(updated_response(1));

    let result = update_hypothesis_status(&exec, 5, "validated", "held up under task loss").await;

    assert!(result.success);
    assert_eq!(result.hypothesis_id, 5);

    let call = exec.last_call();
    assert!(call.sql.contains("UPDATE hypothesis SET"));
    assert!(call.sql.contains("status = :status"));
    assert!(call.sql.contains("notes = :notes"));
}

#[tokio::test]
async fn experiment_results_narrow_to_one_id() {
    let exec = FakeExecutor::new();
    exec.push_response(rows_response(vec![
        experiment_row(7, "completed"),
        experiment_row(8, "completed"),
    ]));

    let result = get_experiment_results(&exec, Some(8), Some("completed".to_string()), 50).await;

    assert!(result.success);
    assert_eq!(result.count, 1);
    assert_eq!(result.experiments[0].id, Some(8));
}
