//! Extraction of SQL and a chart title from free-form model output. The
//! contract, in precedence order:
//!
//! 1. a `SQL:` segment runs until the first `TITLE:` marker or end of input;
//! 2. a `TITLE:` segment runs to the end of its line;
//! 3. with no `SQL:` marker, the whole cleaned response is taken as SQL;
//! 4. with no title, the default "Query Results" applies.
//!
//! Markdown fences and trailing semicolons are stripped in every path. This
//! is inherently fragile string matching, kept in one place so it can be
//! swapped for a structured-output contract if the backend grows one.

use lazy_static::lazy_static;
use regex::Regex;

pub const DEFAULT_TITLE: &str = "Query Results";
pub const MAX_TITLE_LEN: usize = 60;

lazy_static! {
    static ref SQL_SEGMENT: Regex = Regex::new(r"(?is)SQL:\s*(.+?)(?:TITLE:|$)").unwrap();
    static ref TITLE_SEGMENT: Regex = Regex::new(r"(?im)^.*TITLE:\s*(.+?)\s*$").unwrap();
    static ref CODE_FENCE: Regex = Regex::new(r"```(?:sql)?\s*").unwrap();
    static ref TRAILING_TITLE: Regex = Regex::new(r"(?is)\s*TITLE:.*$").unwrap();
    static ref NUMBERED_ITEM: Regex = Regex::new(r"^\d+\.\s*(.+)$").unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extracted {
    pub sql: String,
    pub title: String,
}

pub fn extract_sql_and_title(response: &str) -> Extracted {
    let mut sql = SQL_SEGMENT
        .captures(response)
        .map(|c| c[1].trim().to_string())
        .unwrap_or_default();
    let mut title = TITLE_SEGMENT
        .captures(response)
        .map(|c| c[1].trim().to_string())
        .unwrap_or_default();

    if sql.is_empty() {
        sql = response.to_string();
    }

    sql = CODE_FENCE.replace_all(&sql, "").to_string();
    sql = TRAILING_TITLE.replace(&sql, "").to_string();
    sql = sql.trim().trim_end_matches(';').trim().to_string();

    title = title.replace(['"', '\'', '`'], "").trim().to_string();
    if title.chars().count() > MAX_TITLE_LEN {
        title = title.chars().take(MAX_TITLE_LEN - 3).collect::<String>() + "...";
    }
    if title.is_empty() {
        title = DEFAULT_TITLE.to_string();
    }

    Extracted { sql, title }
}

/// Parses a numbered list out of a model reply, at most three entries.
pub fn parse_follow_up_questions(response: &str) -> Vec<String> {
    response
        .lines()
        .filter_map(|line| {
            NUMBERED_ITEM
                .captures(line.trim())
                .map(|c| c[1].trim().to_string())
        })
        .take(3)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labeled_segments_are_extracted() {
        let extracted = extract_sql_and_title("SQL: SELECT 1\nTITLE: Test");
        assert_eq!(extracted.sql, "SELECT 1");
        assert_eq!(extracted.title, "Test");
    }

    #[test]
    fn missing_title_falls_back_to_default() {
        let extracted = extract_sql_and_title("SELECT count(*) FROM bookings;");
        assert_eq!(extracted.sql, "SELECT count(*) FROM bookings");
        assert_eq!(extracted.title, DEFAULT_TITLE);
    }

    #[test]
    fn markdown_fences_are_stripped() {
        let extracted =
            extract_sql_and_title("SQL: ```sql\nSELECT total FROM orders\n```\nTITLE: Totals");
        assert_eq!(extracted.sql, "SELECT total FROM orders");
        assert_eq!(extracted.title, "Totals");
    }

    #[test]
    fn title_leaking_into_sql_is_pruned() {
        // model put everything on one line; the SQL segment swallows TITLE
        let extracted = extract_sql_and_title("SQL: SELECT 1 TITLE: One");
        assert_eq!(extracted.sql, "SELECT 1");
        assert_eq!(extracted.title, "One");
    }

    #[test]
    fn multiline_sql_is_preserved() {
        let response = "SQL: SELECT month, SUM(total) AS revenue\nFROM orders\nGROUP BY month\nTITLE: Monthly Revenue";
        let extracted = extract_sql_and_title(response);
        assert!(extracted.sql.contains("GROUP BY month"));
        assert_eq!(extracted.title, "Monthly Revenue");
    }

    #[test]
    fn long_titles_are_truncated() {
        let long_title = "A".repeat(100);
        let extracted = extract_sql_and_title(&format!("SQL: SELECT 1\nTITLE: {}", long_title));
        assert_eq!(extracted.title.chars().count(), MAX_TITLE_LEN);
        assert!(extracted.title.ends_with("..."));
    }

    #[test]
    fn quotes_are_removed_from_titles() {
        let extracted = extract_sql_and_title("SQL: SELECT 1\nTITLE: \"Revenue 'by' Region\"");
        assert_eq!(extracted.title, "Revenue by Region");
    }

    #[test]
    fn numbered_lists_parse_to_at_most_three() {
        let response = "1. What changed last week?\n2. Which region grew most?\nsome noise\n3. How does this compare to 2023?\n4. Extra";
        let questions = parse_follow_up_questions(response);
        assert_eq!(
            questions,
            vec![
                "What changed last week?",
                "Which region grew most?",
                "How does this compare to 2023?"
            ]
        );
    }

    #[test]
    fn non_list_reply_yields_nothing() {
        assert!(parse_follow_up_questions("no suggestions today").is_empty());
    }
}
