use crate::utils::error::CoreError;
use lazy_static::lazy_static;
use regex::Regex;

/// Keywords that disqualify a query outright. A defense-in-depth word-boundary
/// check, not a SQL parser: read-only access should additionally be enforced
/// by the database account itself.
const RESTRICTED_KEYWORDS: [&str; 11] = [
    "DROP", "DELETE", "TRUNCATE", "ALTER", "CREATE", "INSERT", "UPDATE", "GRANT", "REVOKE",
    "EXEC", "EXECUTE",
];

lazy_static! {
    static ref KEYWORD_PATTERNS: Vec<(&'static str, Regex)> = RESTRICTED_KEYWORDS
        .iter()
        .map(|kw| (*kw, Regex::new(&format!(r"(?i)\b{}\b", kw)).unwrap()))
        .collect();
    static ref LIMIT_CLAUSE: Regex = Regex::new(r"(?i)\bLIMIT\s+\d+").unwrap();
    static ref LINE_NUMBER: Regex = Regex::new(r"at line \d+").unwrap();
    static ref NEAR_CLAUSE: Regex = Regex::new(r#"near ['"].*['"]"#).unwrap();
    static ref PASSWORD_FRAGMENT: Regex = Regex::new(r"password=\S+").unwrap();
    static ref HOST_FRAGMENT: Regex = Regex::new(r"host=\S+").unwrap();
}

/// The single gate all SQL passes before execution, whether a user typed it
/// or the model generated it.
pub fn validate_query(sql: &str) -> Result<(), CoreError> {
    let sql = sql.trim();
    if sql.is_empty() {
        return Err(CoreError::ValidationFailure(
            "Query cannot be empty".to_string(),
        ));
    }

    for (keyword, pattern) in KEYWORD_PATTERNS.iter() {
        if pattern.is_match(sql) {
            return Err(CoreError::ValidationFailure(format!(
                "Query contains restricted keyword: {}",
                keyword
            )));
        }
    }

    Ok(())
}

/// Appends a row cap unless the query already carries its own LIMIT clause.
pub fn append_limit(sql: &str, limit: usize) -> String {
    if LIMIT_CLAUSE.is_match(sql) {
        sql.to_string()
    } else {
        format!("{} LIMIT {}", sql.trim_end(), limit)
    }
}

/// Strips engine error text of anything a caller should not see: positions,
/// query fragments, credentials. The only point where driver error text
/// becomes user-safe.
pub fn sanitize_error_message(message: &str) -> String {
    let message = LINE_NUMBER.replace_all(message, "");
    let message = NEAR_CLAUSE.replace_all(&message, "near [query]");
    let message = PASSWORD_FRAGMENT.replace_all(&message, "password=***");
    let message = HOST_FRAGMENT.replace_all(&message, "host=***");
    message.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_query_is_rejected() {
        assert!(validate_query("").is_err());
        assert!(validate_query("   \n ").is_err());
    }

    #[test]
    fn restricted_keywords_are_rejected_case_insensitively() {
        for sql in [
            "DROP TABLE users",
            "drop table users",
            "SELECT 1; delete FROM t",
            "update t set x = 1",
            "SELECT * FROM t WHERE EXISTS (SELECT 1) UNION SELECT * FROM grant",
        ] {
            assert!(validate_query(sql).is_err(), "should reject: {}", sql);
        }
    }

    #[test]
    fn keywords_inside_identifiers_do_not_trigger() {
        for sql in [
            "SELECT updated_at FROM orders",
            "SELECT UPDATED_AT, created_at FROM t",
            "SELECT * FROM grants_summary",
            "SELECT dropped_items FROM inventory",
            "SELECT executor_name FROM runs",
        ] {
            assert!(validate_query(sql).is_ok(), "should accept: {}", sql);
        }
    }

    #[test]
    fn plain_selects_pass() {
        assert!(validate_query("SELECT id, total FROM bookings WHERE total > 100").is_ok());
    }

    #[test]
    fn limit_is_appended_only_when_missing() {
        assert_eq!(
            append_limit("SELECT * FROM t", 1000),
            "SELECT * FROM t LIMIT 1000"
        );
        assert_eq!(
            append_limit("SELECT * FROM t LIMIT 5", 1000),
            "SELECT * FROM t LIMIT 5"
        );
        assert_eq!(
            append_limit("SELECT * FROM t limit 25", 1000),
            "SELECT * FROM t limit 25"
        );
        // a column named "limit" without a row count still gets the cap
        assert_eq!(
            append_limit("SELECT rate_limit FROM quotas", 10),
            "SELECT rate_limit FROM quotas LIMIT 10"
        );
    }

    #[test]
    fn error_messages_are_sanitized() {
        let raw = r#"syntax error near 'SELEC * FROM' at line 3 (password=hunter2 host=10.0.0.5)"#;
        let cleaned = sanitize_error_message(raw);
        assert!(!cleaned.contains("hunter2"));
        assert!(!cleaned.contains("10.0.0.5"));
        assert!(!cleaned.contains("at line 3"));
        assert!(cleaned.contains("near [query]"));
        assert!(cleaned.contains("password=***"));
        assert!(cleaned.contains("host=***"));
    }
}
