pub mod data_source;
pub mod insight;
pub mod saved_query;

pub use data_source::{DataSource, DataSourceStatus, EngineType};
pub use insight::{Insight, InsightKind, InsightReport};
pub use saved_query::{InMemoryQueryStore, NewSavedQuery, SavedQuery, SavedQueryStore};
