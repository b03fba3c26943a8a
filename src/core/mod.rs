pub mod connections;
pub mod insights;
pub mod pipeline;
pub mod query;
pub mod schema;
pub mod translate;
pub mod viz;
