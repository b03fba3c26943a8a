pub mod chart_config;
pub mod recommender;

pub use chart_config::generate_chart_config;
pub use recommender::{
    recommend_visualization, ChartAlternative, ChartRecommendation, ChartType,
    VisualizationResponse,
};
