use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    MetricSummary,
    Anomaly,
    Trend,
}

/// One proactive finding over a data source. Priority 1 is most important;
/// reports are sorted ascending and truncated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Insight {
    pub kind: InsightKind,
    pub title: String,
    pub description: String,
    pub data: Value,
    pub suggested_question: String,
    pub priority: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsightReport {
    pub success: bool,
    pub insights: Vec<Insight>,
    pub generated_at: DateTime<Utc>,
}
