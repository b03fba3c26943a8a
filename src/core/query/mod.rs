pub mod service;
pub mod validator;

pub use service::{
    extract_columns, infer_value_type, QueryError, QueryResult, QueryService, ResultColumn,
    DEFAULT_ROW_LIMIT, MAX_ROW_LIMIT,
};
pub use validator::{append_limit, sanitize_error_message, validate_query};
