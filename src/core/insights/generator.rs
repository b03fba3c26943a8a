use crate::core::query::{QueryResult, QueryService};
use crate::core::schema::SchemaAnalyzer;
use crate::llm::{GenerationRequest, TextGenerator};
use crate::models::{DataSource, EngineType, Insight, InsightKind, InsightReport};
use crate::utils::cache::TtlCache;
use crate::utils::datasource::ColumnSchema;
use crate::utils::error::CoreError;
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

pub const INSIGHTS_CACHE_TTL: Duration = Duration::from_secs(1800);

/// Deviation threshold for the anomaly pass. Policy rather than a proven
/// cutoff; adjust per deployment.
pub const Z_SCORE_THRESHOLD: f64 = 2.0;

pub const MAX_INSIGHTS: usize = 5;

/// At most this many metric columns are analyzed per table, bounding query
/// volume on wide tables.
pub const MAX_METRIC_COLUMNS: usize = 3;

const TIME_NAME_PATTERNS: [&str; 5] = ["created_at", "updated_at", "date", "timestamp", "datetime"];
const METRIC_EXCLUDE_PATTERNS: [&str; 4] = ["id", "key", "uuid", "hash"];
const NUMERIC_TYPES: [&str; 12] = [
    "int",
    "integer",
    "bigint",
    "smallint",
    "tinyint",
    "mediumint",
    "float",
    "double",
    "double precision",
    "decimal",
    "numeric",
    "real",
];

/// Statistical scans over a source's numeric/time columns: aggregate
/// summaries, z-score anomalies and month-over-month trends. One failing
/// metric never blocks the others.
pub struct InsightsGenerator {
    analyzer: Arc<SchemaAnalyzer>,
    query: Arc<QueryService>,
    llm: Arc<dyn TextGenerator>,
    cache: TtlCache<InsightReport>,
}

impl InsightsGenerator {
    pub fn new(
        analyzer: Arc<SchemaAnalyzer>,
        query: Arc<QueryService>,
        llm: Arc<dyn TextGenerator>,
    ) -> Self {
        Self::with_cache(analyzer, query, llm, TtlCache::new(INSIGHTS_CACHE_TTL))
    }

    pub fn with_cache(
        analyzer: Arc<SchemaAnalyzer>,
        query: Arc<QueryService>,
        llm: Arc<dyn TextGenerator>,
        cache: TtlCache<InsightReport>,
    ) -> Self {
        Self {
            analyzer,
            query,
            llm,
            cache,
        }
    }

    pub async fn proactive_insights(&self, data_source: &DataSource) -> InsightReport {
        let cache_key = format!("proactive_insights:{}", data_source.id);
        if let Some(report) = self.cache.get(&cache_key).await {
            return report;
        }

        let report = match self.build_report(data_source).await {
            Ok(insights) => InsightReport {
                success: true,
                insights,
                generated_at: Utc::now(),
            },
            Err(e) => {
                tracing::error!(
                    data_source_id = %data_source.id,
                    error = %e,
                    "proactive insights generation failed"
                );
                InsightReport {
                    success: false,
                    insights: Vec::new(),
                    generated_at: Utc::now(),
                }
            }
        };
        self.cache.insert(cache_key, report.clone()).await;
        report
    }

    async fn build_report(&self, data_source: &DataSource) -> Result<Vec<Insight>, CoreError> {
        let schema = self.analyzer.schema_context(data_source).await?;
        let mut insights = Vec::new();

        for (table, columns) in &schema {
            let metrics = find_metric_columns(columns);
            for metric in &metrics {
                if let Some(insight) = self.metric_summary(data_source, table, metric).await {
                    insights.push(insight);
                }
            }

            if let Some(time_column) = find_time_column(columns) {
                for metric in &metrics {
                    if let Some(insight) = self
                        .detect_anomaly(data_source, table, time_column, metric)
                        .await
                    {
                        insights.push(insight);
                    }
                    if let Some(insight) = self
                        .analyze_trend(data_source, table, time_column, metric)
                        .await
                    {
                        insights.push(insight);
                    }
                }
            }
        }

        insights.sort_by_key(|i| i.priority);
        insights.truncate(MAX_INSIGHTS);
        Ok(insights)
    }

    async fn metric_summary(
        &self,
        data_source: &DataSource,
        table: &str,
        column: &str,
    ) -> Option<Insight> {
        let sql = format!(
            "SELECT COUNT({col}) AS metric_count, AVG({col}) AS average, MIN({col}) AS minimum, MAX({col}) AS maximum FROM {table} WHERE {col} IS NOT NULL",
            col = column,
            table = table,
        );
        let result = self.run_silently(data_source, &sql, 1).await?;
        let stats = result.data.first()?;

        let average = value_as_f64(stats.get("average")?)?;
        let minimum = value_as_f64(stats.get("minimum")?)?;
        let maximum = value_as_f64(stats.get("maximum")?)?;

        let display = title_case(column);
        Some(Insight {
            kind: InsightKind::MetricSummary,
            title: format!("{} Overview", display),
            description: format!(
                "The {} ranges from {:.2} to {:.2} with an average of {:.2}",
                display.to_lowercase(),
                minimum,
                maximum,
                average
            ),
            data: Value::Object(stats.clone()),
            suggested_question: format!("What is the average {}?", column),
            priority: 3,
        })
    }

    async fn detect_anomaly(
        &self,
        data_source: &DataSource,
        table: &str,
        time_column: &str,
        metric_column: &str,
    ) -> Option<Insight> {
        let engine = data_source.engine;
        let sql = format!(
            "WITH recent AS (
                SELECT AVG({m}) AS recent_avg FROM {t}
                WHERE {tc} >= {week_ago} AND {m} IS NOT NULL
            ),
            historical AS (
                SELECT AVG({m}) AS hist_avg, STDDEV({m}) AS hist_stddev FROM {t}
                WHERE {tc} >= {month_ago} AND {tc} < {week_ago} AND {m} IS NOT NULL
            )
            SELECT recent.recent_avg, historical.hist_avg, historical.hist_stddev
            FROM recent, historical",
            m = metric_column,
            t = table,
            tc = time_column,
            week_ago = days_ago_expr(engine, 7),
            month_ago = days_ago_expr(engine, 30),
        );
        let result = self.run_silently(data_source, &sql, 1).await?;
        let row = result.data.first()?;

        let recent_avg = value_as_f64(row.get("recent_avg")?)?;
        let hist_avg = value_as_f64(row.get("hist_avg")?)?;
        let hist_stddev = value_as_f64(row.get("hist_stddev")?)?;

        let signal = evaluate_anomaly(recent_avg, hist_avg, hist_stddev, Z_SCORE_THRESHOLD)?;
        let display = title_case(metric_column);
        Some(Insight {
            kind: InsightKind::Anomaly,
            title: format!("Unusual {}", display),
            description: format!(
                "{} has {} by {:.1}% in the last 7 days compared to the prior 23-day average",
                display,
                signal.direction,
                signal.change_pct.abs()
            ),
            data: json!({
                "recent_avg": recent_avg,
                "hist_avg": hist_avg,
                "hist_stddev": hist_stddev,
                "zscore": signal.z_score,
            }),
            suggested_question: format!("Show me recent changes in {}", metric_column),
            priority: 1,
        })
    }

    async fn analyze_trend(
        &self,
        data_source: &DataSource,
        table: &str,
        time_column: &str,
        metric_column: &str,
    ) -> Option<Insight> {
        let engine = data_source.engine;
        let bucket = month_bucket_expr(engine, time_column);
        let sql = format!(
            "WITH monthly AS (
                SELECT {bucket} AS month, SUM({m}) AS total FROM {t}
                WHERE {tc} >= {three_months_ago} AND {m} IS NOT NULL
                GROUP BY {bucket}
                ORDER BY month
            )
            SELECT month, total, LAG(total) OVER (ORDER BY month) AS prev_total FROM monthly",
            bucket = bucket,
            m = metric_column,
            t = table,
            tc = time_column,
            three_months_ago = months_ago_expr(engine, 3),
        );
        let result = self.run_silently(data_source, &sql, 10).await?;
        if result.data.len() < 2 {
            return None;
        }

        let points: Vec<(f64, Option<f64>)> = result
            .data
            .iter()
            .filter_map(|row| {
                let total = value_as_f64(row.get("total")?)?;
                let prev = row.get("prev_total").and_then(value_as_f64);
                Some((total, prev))
            })
            .collect();

        let avg_growth = average_growth(&points)?;
        let direction = if avg_growth > 0.0 { "growing" } else { "declining" };
        let display = title_case(metric_column);
        Some(Insight {
            kind: InsightKind::Trend,
            title: format!("{} Trend", display),
            description: format!(
                "{} is {} at an average rate of {:.1}% per month",
                display,
                direction,
                avg_growth.abs()
            ),
            data: json!({
                "average_growth": avg_growth,
                "months_analyzed": result.data.len(),
            }),
            suggested_question: format!("Show me the trend for {} over time", metric_column),
            priority: 2,
        })
    }

    /// Runs one analysis query; any failure is logged at debug and swallowed
    /// so the surrounding pass keeps going.
    async fn run_silently(
        &self,
        data_source: &DataSource,
        sql: &str,
        limit: usize,
    ) -> Option<QueryResult> {
        match self.query.execute_query(data_source, sql, Some(limit)).await {
            Ok(result) => Some(result),
            Err(e) => {
                tracing::debug!(error = %e.message, "insight query skipped");
                None
            }
        }
    }

    /// Short model-written summary of a result; degrades to a row-count
    /// sentence when the backend is unreachable.
    pub async fn explain_query_result(&self, result: &QueryResult, question: &str) -> String {
        let request = GenerationRequest::new(build_result_explanation_prompt(result, question))
            .with_max_tokens(150);
        match self.llm.generate(request).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "result explanation failed");
                format!("The query returned {} results.", result.row_count)
            }
        }
    }
}

fn build_result_explanation_prompt(result: &QueryResult, question: &str) -> String {
    let mut summary = format!("Found {} rows.\n", result.row_count);
    if !result.columns.is_empty() {
        let names: Vec<&str> = result.columns.iter().map(|c| c.name.as_str()).collect();
        summary.push_str(&format!("Columns: {}\n", names.join(", ")));
    }
    if let Some(first) = result.data.first() {
        summary.push_str(&format!(
            "Sample row: {}",
            serde_json::to_string(first).unwrap_or_default()
        ));
    }

    format!(
        r#"Based on this question: "{}"
And these query results:
{}

Provide a brief, conversational explanation of what the data shows.
Focus on key findings and insights relevant to the question.
Keep it under 3 sentences."#,
        question, summary
    )
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnomalySignal {
    pub z_score: f64,
    pub change_pct: f64,
    pub direction: &'static str,
}

/// Compares a recent window's mean against a historical window, normalized
/// by the historical standard deviation. `None` below the threshold or when
/// the statistics degenerate.
pub fn evaluate_anomaly(
    recent_avg: f64,
    hist_avg: f64,
    hist_stddev: f64,
    threshold: f64,
) -> Option<AnomalySignal> {
    if hist_stddev <= 0.0 || hist_avg == 0.0 {
        return None;
    }
    let z_score = ((recent_avg - hist_avg) / hist_stddev).abs();
    if z_score <= threshold {
        return None;
    }
    let change_pct = (recent_avg - hist_avg) / hist_avg * 100.0;
    Some(AnomalySignal {
        z_score,
        change_pct,
        direction: if change_pct > 0.0 { "increased" } else { "decreased" },
    })
}

/// Mean month-over-month growth rate in percent, over (total, previous
/// total) pairs from a LAG query. `None` without at least one usable pair.
pub fn average_growth(points: &[(f64, Option<f64>)]) -> Option<f64> {
    let rates: Vec<f64> = points
        .iter()
        .filter_map(|(total, prev)| {
            prev.filter(|p| *p > 0.0)
                .map(|p| (total - p) / p * 100.0)
        })
        .collect();
    if rates.is_empty() {
        return None;
    }
    Some(rates.iter().sum::<f64>() / rates.len() as f64)
}

/// Aggregate results come back as driver-typed JSON; numbers may be real
/// numbers or numeric strings depending on the engine's DECIMAL handling.
fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

pub fn find_time_column(columns: &[ColumnSchema]) -> Option<&str> {
    columns
        .iter()
        .find(|c| {
            let name = c.name.to_lowercase();
            TIME_NAME_PATTERNS.iter().any(|p| name.contains(p)) || is_time_type(&c.data_type)
        })
        .map(|c| c.name.as_str())
}

pub fn find_metric_columns(columns: &[ColumnSchema]) -> Vec<String> {
    columns
        .iter()
        .filter(|c| {
            let name = c.name.to_lowercase();
            let excluded = METRIC_EXCLUDE_PATTERNS.iter().any(|p| name.contains(p));
            !excluded && is_numeric_type(&c.data_type)
        })
        .take(MAX_METRIC_COLUMNS)
        .map(|c| c.name.clone())
        .collect()
}

fn is_time_type(data_type: &str) -> bool {
    let t = data_type.to_lowercase();
    t == "date" || t == "datetime" || t.starts_with("timestamp")
}

fn is_numeric_type(data_type: &str) -> bool {
    NUMERIC_TYPES.contains(&data_type.to_lowercase().as_str())
}

pub(crate) fn title_case(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn days_ago_expr(engine: EngineType, days: u32) -> String {
    match engine {
        EngineType::MySql | EngineType::MariaDb => {
            format!("DATE_SUB(CURRENT_DATE, INTERVAL {} DAY)", days)
        }
        EngineType::PostgreSql => format!("CURRENT_DATE - INTERVAL '{} days'", days),
    }
}

fn months_ago_expr(engine: EngineType, months: u32) -> String {
    match engine {
        EngineType::MySql | EngineType::MariaDb => {
            format!("DATE_SUB(CURRENT_DATE, INTERVAL {} MONTH)", months)
        }
        EngineType::PostgreSql => format!("CURRENT_DATE - INTERVAL '{} months'", months),
    }
}

fn month_bucket_expr(engine: EngineType, column: &str) -> String {
    match engine {
        EngineType::MySql | EngineType::MariaDb => {
            format!("DATE_FORMAT({}, '%Y-%m')", column)
        }
        EngineType::PostgreSql => format!("to_char({}, 'YYYY-MM')", column),
    }
}
