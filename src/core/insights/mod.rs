pub mod generator;

pub use generator::{
    average_growth, evaluate_anomaly, find_metric_columns, find_time_column, AnomalySignal,
    InsightsGenerator, INSIGHTS_CACHE_TTL, MAX_INSIGHTS, MAX_METRIC_COLUMNS, Z_SCORE_THRESHOLD,
};
pub(crate) use generator::title_case;
