//! Tool-boundary tests for the hypothesis tools.
//!
//! Uses a scripted executor, so these verify statement construction, the
//! validation-before-SQL batch contract, and the structured failure results.

mod common;

use pretty_assertions::assert_eq;
use serde_json::json;

use chaos_agent::db::{ParamValue, SqlValue};
use chaos_agent::tools::hypotheses::{
    batch_insert_hypotheses, batch_update_priorities, get_hypotheses, insert_hypothesis,
    update_hypothesis, HypothesisFilter, HypothesisUpdate, NewHypothesis,
};

use common::{id_response, rows_response, updated_response, FakeExecutor};

fn hypothesis_row(id: i64, title: &str, priority: i64) -> Vec<SqlValue> {
    vec![
        SqlValue::Long(id),
        SqlValue::Text(title.to_string()),
        SqlValue::Null,
        SqlValue::Null,
        SqlValue::Null,
        SqlValue::Null,
        SqlValue::Text("proposed".to_string()),
        SqlValue::Long(priority),
        SqlValue::Null,
        SqlValue::Null,
        SqlValue::Text("2025-01-01T00:00:00Z".to_string()),
        SqlValue::Text("2025-01-01T00:00:00Z".to_string()),
        SqlValue::Null,
        SqlValue::Null,
    ]
}

#[tokio::test]
async fn insert_returns_generated_id() {
    let exec = FakeExecutor::new();
    exec.push_response(id_response(&[42]));

    let id = insert_hypothesis(&exec, &NewHypothesis::new("API survives task restarts")).await;
    assert_eq!(id, Some(42));

    let call = exec.last_call();
    assert!(call.sql.contains("INSERT INTO hypothesis"));
    assert!(call.sql.contains("RETURNING id"));
    assert_eq!(call.params.len(), 9);
    assert_eq!(call.params[0].name, "title");
    assert_eq!(call.params[5].value, ParamValue::Text("proposed".to_string()));
    assert_eq!(call.params[6].value, ParamValue::Long(1));
}

#[tokio::test]
async fn insert_returns_none_on_transport_error() {
    let exec = FakeExecutor::new();
    exec.push_error("connection reset");

    let id = insert_hypothesis(&exec, &NewHypothesis::new("x")).await;
    assert_eq!(id, None);
}

#[tokio::test]
async fn update_with_no_fields_executes_nothing() {
    let exec = FakeExecutor::new();

    let updated = update_hypothesis(&exec, 7, &HypothesisUpdate::default()).await;

    assert!(!updated);
    assert_eq!(exec.call_count(), 0);
}

#[tokio::test]
async fn update_builds_dynamic_set_clause() {
    let exec = FakeExecutor::new();
    exec.push_response(updated_response(1));

    let update = HypothesisUpdate {
        status: Some("prioritized".to_string()),
        priority: Some(2),
        ..Default::default()
    };
    let updated = update_hypothesis(&exec, 7, &update).await;

    assert!(updated);
    let call = exec.last_call();
    assert!(call.sql.contains("status = :status"));
    assert!(call.sql.contains("priority = :priority"));
    assert!(call.sql.contains("updated_at = CURRENT_TIMESTAMP"));
    assert!(call.sql.contains("WHERE id = :hypothesis_id"));
    // Untouched fields never appear in the SET clause
    assert!(!call.sql.contains("title ="));
}

#[tokio::test]
async fn update_of_missing_id_returns_false() {
    let exec = FakeExecutor::new();
    exec.push_response(updated_response(0));

    let update = HypothesisUpdate {
        status: Some("validated".to_string()),
        ..Default::default()
    };
    assert!(!update_hypothesis(&exec, 999, &update).await);
}

#[tokio::test]
async fn get_with_no_filters_has_no_where_clause() {
    let exec = FakeExecutor::new();
    exec.push_response(rows_response(vec![hypothesis_row(1, "a", 1)]));

    let result = get_hypotheses(&exec, HypothesisFilter::default()).await;

    assert!(result.success);
    assert_eq!(result.count, 1);
    assert_eq!(result.hypotheses[0].title, "a");

    let call = exec.last_call();
    assert!(!call.sql.contains("WHERE"));
    assert!(call.sql.contains("ORDER BY h.priority ASC, h.created_at DESC"));
    assert!(call.sql.ends_with("LIMIT :limit"));
    assert_eq!(call.params.last().unwrap().value, ParamValue::Long(50));
}

#[tokio::test]
async fn get_combines_filters_conjunctively() {
    let exec = FakeExecutor::new();
    exec.push_response(rows_response(vec![]));

    let filter = HypothesisFilter {
        hypothesis_ids: Some(vec![1, 2]),
        status: Some("proposed".to_string()),
        priority_range: Some((1, 3)),
        service: Some("ECS".to_string()),
        limit: Some(5),
        ..Default::default()
    };
    let result = get_hypotheses(&exec, filter).await;
    assert!(result.success);
    assert_eq!(result.count, 0);

    let call = exec.last_call();
    assert!(call.sql.contains("h.id IN (:id_0,:id_1)"));
    assert!(call.sql.contains("h.status = :status"));
    assert!(call.sql.contains("h.priority BETWEEN :min_priority AND :max_priority"));
    assert!(call.sql.contains("UPPER(sc.type) LIKE UPPER(:service_filter)"));
    let where_pos = call.sql.find("WHERE").unwrap();
    let order_pos = call.sql.find("ORDER BY").unwrap();
    assert!(where_pos < order_pos);
    // The LIMIT parameter carries the caller's limit
    assert_eq!(call.params.last().unwrap().name, "limit");
    assert_eq!(call.params.last().unwrap().value, ParamValue::Long(5));
}

#[tokio::test]
async fn get_top_n_overrides_limit() {
    let exec = FakeExecutor::new();
    exec.push_response(rows_response(vec![]));

    let filter = HypothesisFilter {
        top_n: Some(3),
        limit: Some(50),
        ..Default::default()
    };
    get_hypotheses(&exec, filter).await;

    let call = exec.last_call();
    assert!(call.sql.ends_with("LIMIT :top_n"));
    assert_eq!(call.params.last().unwrap().value, ParamValue::Long(3));
}

#[tokio::test]
async fn get_failure_is_a_structured_result() {
    let exec = FakeExecutor::new();
    exec.push_error("relation does not exist");

    let result = get_hypotheses(&exec, HypothesisFilter::default()).await;

    assert!(!result.success);
    assert_eq!(result.count, 0);
    assert!(result.hypotheses.is_empty());
    assert!(result.error.unwrap().contains("relation does not exist"));
    assert_eq!(result.message, "Failed to get hypotheses from database");
}

#[tokio::test]
async fn batch_insert_rejects_malformed_item_before_any_sql() {
    let exec = FakeExecutor::new();

    let items = vec![
        json!({"title": "valid hypothesis"}),
        json!({"description": "no title here"}),
    ];
    let result = batch_insert_hypotheses(&exec, &items).await;

    assert!(!result.success);
    assert_eq!(result.inserted_count, 0);
    assert!(result.error.unwrap().contains("missing required key 'title'"));
    assert_eq!(result.message, "Failed to validate batch insert data");
    // Atomic rejection: nothing was written
    assert_eq!(exec.call_count(), 0);
}

#[tokio::test]
async fn batch_insert_rejects_blank_title() {
    let exec = FakeExecutor::new();

    let items = vec![json!({"title": "   "})];
    let result = batch_insert_hypotheses(&exec, &items).await;

    assert!(!result.success);
    assert!(result.error.unwrap().contains("invalid title"));
    assert_eq!(exec.call_count(), 0);
}

#[tokio::test]
async fn batch_insert_returns_ids_in_statement_order() {
    let exec = FakeExecutor::new();
    exec.push_response(id_response(&[10, 11, 12]));

    let items = vec![
        json!({"title": "a", "priority": 2}),
        json!({"title": "b", "status": "prioritized"}),
        json!({"title": "c", "system_component_id": 4}),
    ];
    let result = batch_insert_hypotheses(&exec, &items).await;

    assert!(result.success);
    assert_eq!(result.inserted_count, 3);
    assert_eq!(result.requested_count, 3);
    assert_eq!(result.hypothesis_ids, vec![10, 11, 12]);

    let call = exec.last_call();
    assert!(call.sql.contains("VALUES (:title_0,"));
    assert!(call.sql.contains(":title_2,"));
    assert!(call.sql.contains("RETURNING id"));
    // 9 parameters per row
    assert_eq!(call.params.len(), 27);
}

#[tokio::test]
async fn batch_insert_empty_input_is_a_no_op() {
    let exec = FakeExecutor::new();
    let result = batch_insert_hypotheses(&exec, &[]).await;
    assert!(!result.success);
    assert_eq!(exec.call_count(), 0);
}

#[tokio::test]
async fn priority_batch_builds_case_update() {
    let exec = FakeExecutor::new();
    exec.push_response(updated_response(2));

    let updates = vec![
        json!({"hypothesis_id": 1, "priority": 3}),
        json!({"hypothesis_id": 2, "priority": 1}),
    ];
    let result = batch_update_priorities(&exec, &updates).await;

    assert!(result.success);
    assert_eq!(result.updated_count, 2);

    let call = exec.last_call();
    assert!(call.sql.contains("SET priority = CASE id"));
    assert!(call.sql.contains("WHEN :id_0 THEN :priority_0"));
    assert!(call.sql.contains("WHEN :id_1 THEN :priority_1"));
    assert!(call.sql.contains("WHERE id IN (:id_0,:id_1)"));
    assert!(call.sql.contains("updated_at = CURRENT_TIMESTAMP"));
}

#[tokio::test]
async fn priority_batch_rejects_non_integer_values() {
    let exec = FakeExecutor::new();

    let updates = vec![
        json!({"hypothesis_id": 1, "priority": 3}),
        json!({"hypothesis_id": 2, "priority": "high"}),
    ];
    let result = batch_update_priorities(&exec, &updates).await;

    assert!(!result.success);
    assert!(result.error.unwrap().contains("non-integer values"));
    assert_eq!(exec.call_count(), 0);
}

#[tokio::test]
async fn priority_batch_with_unknown_ids_reports_failure() {
    let exec = FakeExecutor::new();
    exec.push_response(updated_response(0));

    let updates = vec![json!({"hypothesis_id": 999, "priority": 1})];
    let result = batch_update_priorities(&exec, &updates).await;

    assert!(!result.success);
    assert_eq!(result.updated_count, 0);
    assert_eq!(result.message, "No hypotheses found with provided ids");
}
