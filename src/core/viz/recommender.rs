use crate::core::query::QueryResult;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChartType {
    Line,
    Bar,
    GroupedBar,
    HorizontalBar,
    Pie,
    Scatter,
    Area,
    Heatmap,
    Table,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartRecommendation {
    pub chart_type: ChartType,
    pub reason: String,
    pub config: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartAlternative {
    pub chart_type: ChartType,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisualizationResponse {
    pub recommendation: ChartRecommendation,
    pub alternatives: Vec<ChartAlternative>,
}

const TIME_NAME_PATTERNS: [&str; 9] = [
    "date", "time", "created", "updated", "timestamp", "_at", "year", "month", "day",
];
const TIME_TYPES: [&str; 3] = ["date", "datetime", "timestamp"];
const NUMERIC_TYPES: [&str; 3] = ["integer", "float", "numeric"];

/// Share of sampled values that must parse as numbers for a column to count
/// as numeric despite its declared type.
const NUMERIC_SAMPLE_THRESHOLD: f64 = 0.8;

const SAMPLE_SIZE: usize = 10;

#[derive(Debug, Default)]
pub(crate) struct DataProfile {
    pub row_count: usize,
    pub time_columns: Vec<String>,
    pub numeric_columns: Vec<String>,
    pub categorical_columns: Vec<String>,
}

fn sample_values<'a>(result: &'a QueryResult, column: &str) -> Vec<&'a Value> {
    result
        .data
        .iter()
        .take(SAMPLE_SIZE)
        .filter_map(|row| row.get(column))
        .collect()
}

pub(crate) fn is_time_column(name: &str, inferred_type: &str, samples: &[&Value]) -> bool {
    let lower = name.to_lowercase();
    if TIME_NAME_PATTERNS.iter().any(|p| lower.contains(p)) {
        return true;
    }
    if TIME_TYPES.contains(&inferred_type) {
        return true;
    }
    samples.iter().any(|v| {
        v.as_str()
            .map(|s| {
                let b = s.as_bytes();
                b.len() >= 10
                    && b[..4].iter().all(|c| c.is_ascii_digit())
                    && b[4] == b'-'
                    && b[7] == b'-'
            })
            .unwrap_or(false)
    })
}

pub(crate) fn is_numeric_column(inferred_type: &str, samples: &[&Value]) -> bool {
    if NUMERIC_TYPES.contains(&inferred_type) {
        return true;
    }
    if samples.is_empty() {
        return false;
    }
    let numeric_count = samples
        .iter()
        .filter(|v| match v {
            Value::Number(_) => true,
            Value::String(s) => s.trim().parse::<f64>().is_ok(),
            _ => false,
        })
        .count();
    numeric_count as f64 > samples.len() as f64 * NUMERIC_SAMPLE_THRESHOLD
}

/// Classifies every result column as time, numeric or categorical. Time wins
/// over numeric so `year`/`month` grouping columns land where comparison
/// detection expects them.
pub(crate) fn profile_columns(result: &QueryResult) -> DataProfile {
    let mut profile = DataProfile {
        row_count: result.row_count,
        ..DataProfile::default()
    };

    for column in &result.columns {
        let samples = sample_values(result, &column.name);
        if is_time_column(&column.name, &column.inferred_type, &samples) {
            profile.time_columns.push(column.name.clone());
        } else if is_numeric_column(&column.inferred_type, &samples) {
            profile.numeric_columns.push(column.name.clone());
        } else {
            profile.categorical_columns.push(column.name.clone());
        }
    }
    profile
}

fn distinct_count(result: &QueryResult, column: &str) -> usize {
    result
        .data
        .iter()
        .filter_map(|row| row.get(column))
        .map(|v| v.to_string())
        .collect::<BTreeSet<_>>()
        .len()
}

#[derive(Debug, PartialEq)]
enum ComparisonPattern {
    YearOverYear {
        year: String,
        month: String,
    },
    CategoryComparison {
        category: String,
        other: String,
    },
}

/// Comparison shapes take precedence over the plain column-mix rules: a
/// year+month result with several years is a year-over-year series, and a
/// small categorical column next to another non-numeric column is a
/// category comparison.
fn detect_comparison(result: &QueryResult, profile: &DataProfile) -> Option<ComparisonPattern> {
    let find_named = |needle: &str| {
        result
            .columns
            .iter()
            .map(|c| c.name.clone())
            .find(|name| name.to_lowercase().contains(needle))
    };

    if let (Some(year), Some(month)) = (find_named("year"), find_named("month")) {
        if distinct_count(result, &year) > 1 {
            return Some(ComparisonPattern::YearOverYear { year, month });
        }
    }

    for category in &profile.categorical_columns {
        let distinct = distinct_count(result, category);
        if !(2..=10).contains(&distinct) {
            continue;
        }
        let other = profile
            .categorical_columns
            .iter()
            .chain(profile.time_columns.iter())
            .find(|c| *c != category);
        if let Some(other) = other {
            return Some(ComparisonPattern::CategoryComparison {
                category: category.clone(),
                other: other.clone(),
            });
        }
    }

    None
}

pub fn recommend_visualization(result: &QueryResult, _question: &str) -> VisualizationResponse {
    let profile = profile_columns(result);

    if result.data.is_empty() {
        return VisualizationResponse {
            recommendation: ChartRecommendation {
                chart_type: ChartType::Table,
                reason: "Unable to determine best visualization, showing data as table"
                    .to_string(),
                config: json!({}),
            },
            alternatives: Vec::new(),
        };
    }

    let recommendation = pick_chart(result, &profile);
    VisualizationResponse {
        alternatives: rank_alternatives(&profile),
        recommendation,
    }
}

fn pick_chart(result: &QueryResult, profile: &DataProfile) -> ChartRecommendation {
    let first_metric = profile.numeric_columns.first().cloned();

    if let Some(pattern) = detect_comparison(result, profile) {
        return match pattern {
            ComparisonPattern::YearOverYear { year, month } => ChartRecommendation {
                chart_type: ChartType::Line,
                reason: "Year-over-year comparison works best as one line per year".to_string(),
                config: json!({
                    "x_axis": month,
                    "y_axis": first_metric,
                    "series": year,
                }),
            },
            ComparisonPattern::CategoryComparison { category, other } => ChartRecommendation {
                chart_type: ChartType::GroupedBar,
                reason: format!(
                    "Grouped bars compare {} side by side across {}",
                    category, other
                ),
                config: json!({
                    "x_axis": other,
                    "series": category,
                    "y_axis": first_metric,
                }),
            },
        };
    }

    if !profile.time_columns.is_empty() && !profile.numeric_columns.is_empty() {
        return ChartRecommendation {
            chart_type: ChartType::Line,
            reason: "Line charts are ideal for showing trends over time".to_string(),
            config: json!({
                "x_axis": profile.time_columns[0],
                "y_axis": profile.numeric_columns[0],
            }),
        };
    }

    if !profile.categorical_columns.is_empty() && !profile.numeric_columns.is_empty() {
        let category = &profile.categorical_columns[0];
        let distinct = distinct_count(result, category);
        if (1..=10).contains(&distinct) && profile.row_count < 20 {
            return ChartRecommendation {
                chart_type: ChartType::Pie,
                reason: "Pie charts work well for showing parts of a whole with few categories"
                    .to_string(),
                config: json!({
                    "dimension": category,
                    "metric": profile.numeric_columns[0],
                }),
            };
        }
        return ChartRecommendation {
            chart_type: ChartType::Bar,
            reason: "Bar charts are excellent for comparing values across categories".to_string(),
            config: json!({
                "x_axis": category,
                "y_axis": profile.numeric_columns[0],
            }),
        };
    }

    if profile.numeric_columns.len() >= 2 {
        return ChartRecommendation {
            chart_type: ChartType::Scatter,
            reason: "Scatter plots reveal relationships between numeric variables".to_string(),
            config: json!({
                "x_axis": profile.numeric_columns[0],
                "y_axis": profile.numeric_columns[1],
            }),
        };
    }

    ChartRecommendation {
        chart_type: ChartType::Table,
        reason: "Tables provide a detailed view of all data".to_string(),
        config: json!({}),
    }
}

fn rank_alternatives(profile: &DataProfile) -> Vec<ChartAlternative> {
    let mut alternatives = Vec::new();

    if !profile.time_columns.is_empty() && !profile.numeric_columns.is_empty() {
        alternatives.push(ChartAlternative {
            chart_type: ChartType::Area,
            reason: "Area charts emphasize magnitude of change".to_string(),
        });
        alternatives.push(ChartAlternative {
            chart_type: ChartType::Bar,
            reason: "Bar charts can show discrete time periods".to_string(),
        });
    }

    if !profile.categorical_columns.is_empty() && !profile.numeric_columns.is_empty() {
        alternatives.push(ChartAlternative {
            chart_type: ChartType::HorizontalBar,
            reason: "Horizontal bars work well for long category names".to_string(),
        });
        if profile.numeric_columns.len() > 1 {
            alternatives.push(ChartAlternative {
                chart_type: ChartType::GroupedBar,
                reason: "Compare multiple metrics across categories".to_string(),
            });
        }
    }

    if profile.numeric_columns.len() >= 2 {
        alternatives.push(ChartAlternative {
            chart_type: ChartType::Heatmap,
            reason: "Heatmaps show patterns in multi-dimensional data".to_string(),
        });
    }

    alternatives.push(ChartAlternative {
        chart_type: ChartType::Table,
        reason: "View raw data in detail".to_string(),
    });

    alternatives.truncate(3);
    alternatives
}
