// Exercises the crate surface an embedding application actually sees:
// validation, model-output parsing, and chart inference over hand-built
// results. Database-backed paths are covered by the in-crate unit tests.

use datalens::core::query::{extract_columns, validate_query, QueryResult};
use datalens::core::translate::{extract_sql_and_title, DEFAULT_TITLE};
use datalens::core::viz::{generate_chart_config, recommend_visualization, ChartType};
use datalens::utils::datasource::Row;
use serde_json::json;

fn result_from_rows(rows: Vec<Row>) -> QueryResult {
    QueryResult {
        columns: extract_columns(&rows),
        row_count: rows.len(),
        data: rows,
        execution_time_ms: 4,
        limited: false,
    }
}

fn row(pairs: Vec<(&str, serde_json::Value)>) -> Row {
    let mut record = Row::new();
    for (name, value) in pairs {
        record.insert(name.to_string(), value);
    }
    record
}

#[test]
fn validator_blocks_writes_but_allows_lookalike_identifiers() {
    assert!(validate_query("INSERT INTO t VALUES (1)").is_err());
    assert!(validate_query("SELECT updated_at, created_at FROM orders").is_ok());
}

#[test]
fn model_output_contract_round_trips() {
    let extracted = extract_sql_and_title("SQL: SELECT 1\nTITLE: Test");
    assert_eq!(extracted.sql, "SELECT 1");
    assert_eq!(extracted.title, "Test");

    let bare = extract_sql_and_title("SELECT 1;");
    assert_eq!(bare.sql, "SELECT 1");
    assert_eq!(bare.title, DEFAULT_TITLE);
}

#[test]
fn chart_inference_matches_column_shapes() {
    let time_series = result_from_rows(vec![
        row(vec![("day", json!("2024-06-01")), ("visits", json!(42))]),
        row(vec![("day", json!("2024-06-02")), ("visits", json!(51))]),
    ]);
    assert_eq!(
        recommend_visualization(&time_series, "").recommendation.chart_type,
        ChartType::Line
    );

    let two_metrics = result_from_rows(vec![
        row(vec![("price", json!(10.0)), ("qty", json!(3))]),
        row(vec![("price", json!(12.5)), ("qty", json!(1))]),
    ]);
    assert_eq!(
        recommend_visualization(&two_metrics, "").recommendation.chart_type,
        ChartType::Scatter
    );
}

#[test]
fn chart_config_follows_caller_override() {
    let result = result_from_rows(vec![
        row(vec![("region", json!("north")), ("revenue", json!(100))]),
        row(vec![("region", json!("south")), ("revenue", json!(90))]),
    ]);
    // the recommender would pick a pie here; the caller wants bars
    let config = generate_chart_config(&result, ChartType::Bar);
    assert_eq!(config["chart_type"], "bar");
    assert_eq!(config["x_axis"], "region");
    assert_eq!(config["y_axis"], "revenue");
}
