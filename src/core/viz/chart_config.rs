use super::recommender::{is_numeric_column, is_time_column, ChartType};
use crate::core::insights::title_case;
use crate::core::query::QueryResult;
use serde_json::{json, Value};

/// Axis/series/dimension mappings for a caller-chosen chart type, built from
/// the same dimension/metric split the recommender uses. Independent of the
/// recommendation so callers may override the suggested chart.
pub fn generate_chart_config(result: &QueryResult, chart_type: ChartType) -> Value {
    if result.columns.is_empty() || result.data.is_empty() {
        return json!({});
    }

    let (dimensions, metrics) = split_dimensions_and_metrics(result);

    match chart_type {
        ChartType::Bar
        | ChartType::Line
        | ChartType::Area
        | ChartType::HorizontalBar
        | ChartType::GroupedBar => json!({
            "chart_type": chart_type,
            "x_axis": dimensions.first(),
            "y_axis": metrics.first(),
            "series": metrics.iter().take(3).collect::<Vec<_>>(),
        }),
        ChartType::Pie => json!({
            "chart_type": chart_type,
            "dimension": dimensions.first(),
            "metric": metrics.first(),
        }),
        ChartType::Scatter => json!({
            "chart_type": chart_type,
            "x_axis": metrics.first().or(dimensions.first()),
            "y_axis": metrics.get(1).or(dimensions.get(1)),
            "size_axis": metrics.get(2),
            "color_axis": dimensions.first(),
        }),
        ChartType::Table => json!({
            "chart_type": chart_type,
            "columns": result.columns.iter().map(|c| json!({
                "field": c.name,
                "header": title_case(&c.name),
                "type": c.inferred_type,
            })).collect::<Vec<_>>(),
        }),
        ChartType::Heatmap => json!({}),
    }
}

/// Dimensions are the non-numeric and time columns, metrics the numeric
/// non-time ones; both keep the result's column order.
fn split_dimensions_and_metrics(result: &QueryResult) -> (Vec<&String>, Vec<&String>) {
    let mut dimensions = Vec::new();
    let mut metrics = Vec::new();

    for column in &result.columns {
        let samples: Vec<&Value> = result
            .data
            .iter()
            .take(10)
            .filter_map(|row| row.get(&column.name))
            .collect();
        let time = is_time_column(&column.name, &column.inferred_type, &samples);
        let numeric = is_numeric_column(&column.inferred_type, &samples);

        if numeric && !time {
            metrics.push(&column.name);
        } else {
            dimensions.push(&column.name);
        }
    }
    (dimensions, metrics)
}
