pub mod analyzer;
pub mod relevance;

pub use analyzer::{SchemaAnalyzer, SchemaMap, MAX_SCHEMA_TABLES, SCHEMA_CACHE_TTL};
pub use relevance::RankingPolicy;
