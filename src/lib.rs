// datalens: natural-language business intelligence core.
// Connect relational sources, translate questions to SQL, execute them
// safely, and infer charts and insights from the results. Transport-agnostic:
// the surrounding application owns routing, auth and persistence.

pub mod core;
pub mod llm;
pub mod models;
pub mod utils;

// Re-export the types most embedders need.
pub use crate::core::connections::ConnectionManager;
pub use crate::core::insights::InsightsGenerator;
pub use crate::core::pipeline::{AskResponse, InsightPipeline};
pub use crate::core::query::{QueryError, QueryResult, QueryService, ResultColumn};
pub use crate::core::schema::{SchemaAnalyzer, SchemaMap};
pub use crate::core::translate::{NlSqlTranslator, Translation};
pub use crate::core::viz::{
    generate_chart_config, recommend_visualization, ChartType, VisualizationResponse,
};
pub use crate::llm::{GenerationRequest, OpenAiClient, TextGenerator};
pub use crate::models::{DataSource, DataSourceStatus, EngineType, SavedQuery, SavedQueryStore};
pub use crate::utils::config::Config;
pub use crate::utils::crypto::ConfigCipher;
pub use crate::utils::error::CoreError;
