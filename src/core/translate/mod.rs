pub mod fallback;
pub mod parser;
pub mod prompt;
pub mod translator;

pub use parser::{extract_sql_and_title, parse_follow_up_questions, Extracted, DEFAULT_TITLE};
pub use translator::{NlSqlTranslator, Translation, TRANSLATION_CACHE_TTL};
