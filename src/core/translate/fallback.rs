//! Rule-based query generation for when the model backend is unreachable.
//! Covers only the highest-traffic ask (revenue over the last month against
//! a reservations-style table); anything else reports the original failure.

use super::translator::Translation;
use crate::core::schema::SchemaMap;
use crate::utils::datasource::ColumnSchema;

const REVENUE_HINTS: [&str; 4] = ["revenue", "amount", "total", "price"];
const DATE_HINTS: [&str; 3] = ["date", "created", "time"];

pub fn generate_fallback_query(question: &str, schema: &SchemaMap) -> Option<Translation> {
    let question = question.to_lowercase();
    if !(question.contains("revenue") && question.contains("last month")) {
        return None;
    }

    let (table, columns) = schema
        .iter()
        .find(|(name, _)| name.to_lowercase().contains("reserv"))?;
    let revenue_column = find_column(columns, &REVENUE_HINTS)?;
    let date_column = find_column(columns, &DATE_HINTS)?;

    let sql = format!(
        "SELECT SUM({revenue}) AS total_revenue FROM {table} WHERE {date} >= DATE_SUB(CURRENT_DATE, INTERVAL 1 MONTH) AND {date} < CURRENT_DATE",
        revenue = revenue_column,
        table = table,
        date = date_column,
    );

    Some(Translation {
        sql,
        title: "Last Month Revenue".to_string(),
        explanation: "This query calculates the total revenue from the last month. (Note: this is a basic query generated offline - the AI service is currently unavailable)".to_string(),
    })
}

fn find_column<'a>(columns: &'a [ColumnSchema], hints: &[&str]) -> Option<&'a str> {
    columns
        .iter()
        .find(|c| {
            let name = c.name.to_lowercase();
            hints.iter().any(|hint| name.contains(hint))
        })
        .map(|c| c.name.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::datasource::mock::column;

    fn reservation_schema() -> SchemaMap {
        let mut schema = SchemaMap::new();
        schema.insert(
            "reservations".to_string(),
            vec![
                column("id", "int"),
                column("total_amount", "decimal"),
                column("created_at", "datetime"),
            ],
        );
        schema
    }

    #[test]
    fn revenue_last_month_produces_a_canned_aggregate() {
        let translation =
            generate_fallback_query("What was the revenue last month?", &reservation_schema())
                .unwrap();
        assert!(translation.sql.starts_with("SELECT SUM(total_amount)"));
        assert!(translation.sql.contains("FROM reservations"));
        assert!(translation.sql.contains("created_at"));
        assert_eq!(translation.title, "Last Month Revenue");
    }

    #[test]
    fn unrelated_questions_get_no_fallback() {
        assert!(generate_fallback_query("top customers by orders", &reservation_schema()).is_none());
    }

    #[test]
    fn missing_reservation_table_gets_no_fallback() {
        let mut schema = SchemaMap::new();
        schema.insert("widgets".to_string(), vec![column("price", "decimal")]);
        assert!(generate_fallback_query("revenue last month", &schema).is_none());
    }

    #[test]
    fn missing_date_column_gets_no_fallback() {
        let mut schema = SchemaMap::new();
        schema.insert(
            "reservations".to_string(),
            vec![column("total", "decimal")],
        );
        assert!(generate_fallback_query("revenue last month", &schema).is_none());
    }
}
