use crate::core::query::QueryResult;
use crate::core::schema::SchemaMap;

pub const SQL_SYSTEM_PROMPT: &str =
    "You are a SQL expert. Generate only valid SQL queries without explanations.";

/// Schema rendered as `Table: name / Columns: col (type)` blocks, compact
/// enough to keep prompts small even at the 50-table cap.
pub fn format_schema(schema: &SchemaMap) -> String {
    let mut formatted = String::new();
    for (table, columns) in schema {
        formatted.push_str(&format!("Table: {}\n", table));
        let column_list: Vec<String> = columns
            .iter()
            .map(|c| format!("{} ({})", c.name, c.data_type))
            .collect();
        formatted.push_str(&format!("Columns: {}\n\n", column_list.join(", ")));
    }
    formatted
}

pub fn build_translation_prompt(question: &str, schema: &SchemaMap) -> String {
    format!(
        r#"Given the following database schema:

{schema}
Generate a SQL query to answer this question: "{question}"

Also provide a concise chart title (max 50 characters) that clearly describes what the data shows.

Requirements:
- Use only the tables and columns available in the schema
- Include appropriate JOINs if multiple tables are needed
- Use aggregate functions where appropriate
- For date-based queries:
  - "last month" means the previous calendar month (use DATE_SUB or appropriate date functions)
  - "this month" means the current calendar month
  - "last year" means the previous calendar year
- For revenue/amount calculations, look for columns containing: amount, total, price, revenue, value
- Return the SQL query and chart title in this exact format:
  SQL: [your query here]
  TITLE: [your title here]
- Do NOT include semicolon at the end of SQL
- Do NOT add LIMIT clause (it will be added automatically)
- Make reasonable assumptions about column meanings based on their names

IMPORTANT - For comparison queries:
- When comparing different time periods (e.g., "2023 vs 2024", "compare X to Y"), include ALL dimensions in SELECT
- For year-over-year comparisons: SELECT year, month, metric ORDER BY month, year
- Include the comparison dimension (year, category, etc.) as a separate column
- Example: "compare 2023 to 2024" should return: SELECT YEAR(date) as year, MONTH(date) as month, SUM(revenue) as total FROM table WHERE YEAR(date) IN (2023, 2024) GROUP BY year, month ORDER BY month, year

Example patterns:
- For "revenue last month": SUM columns related to money/amounts where date is in previous month
- For "count of X": COUNT(*) or COUNT(DISTINCT column) as appropriate
- For "average X": AVG(column) for numeric values
- For "X vs Y": Structure data to show both X and Y as separate series

Title examples:
- "Monthly Revenue Comparison: 2023 vs 2024"
- "Top Products by Sales Volume"
- "Revenue by Region""#,
        schema = format_schema(schema),
        question = question
    )
}

pub fn build_explanation_prompt(question: &str, sql: &str) -> String {
    format!(
        "Explain in simple terms what this SQL query does to answer the question '{}':\n\n{}\n\nKeep the explanation brief and user-friendly.",
        question, sql
    )
}

pub fn build_follow_up_prompt(question: &str, result: &QueryResult) -> String {
    format!(
        r#"Based on this question: "{}"
And these results: {}

Suggest 3 follow-up questions that would provide additional insights.
Format as a simple numbered list without explanations."#,
        question,
        summarize_result(result)
    )
}

pub fn summarize_result(result: &QueryResult) -> String {
    if result.data.is_empty() {
        return "No results found".to_string();
    }
    let column_names: Vec<&str> = result.columns.iter().map(|c| c.name.as_str()).collect();
    format!(
        "Found {} rows with columns: {}",
        result.row_count,
        column_names.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::datasource::mock::column;

    #[test]
    fn schema_renders_one_block_per_table() {
        let mut schema = SchemaMap::new();
        schema.insert(
            "bookings".to_string(),
            vec![column("id", "int"), column("total", "decimal")],
        );
        let rendered = format_schema(&schema);
        assert_eq!(rendered, "Table: bookings\nColumns: id (int), total (decimal)\n\n");
    }

    #[test]
    fn prompt_embeds_schema_and_question() {
        let mut schema = SchemaMap::new();
        schema.insert("orders".to_string(), vec![column("amount", "decimal")]);
        let prompt = build_translation_prompt("total revenue last month", &schema);
        assert!(prompt.contains("Table: orders"));
        assert!(prompt.contains("total revenue last month"));
        assert!(prompt.contains("SQL:"));
        assert!(prompt.contains("TITLE:"));
    }
}
