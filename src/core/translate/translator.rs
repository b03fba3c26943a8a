use super::fallback::generate_fallback_query;
use super::parser::{extract_sql_and_title, parse_follow_up_questions};
use super::prompt;
use crate::core::query::{validate_query, QueryResult};
use crate::core::schema::{SchemaAnalyzer, SchemaMap};
use crate::llm::{GenerationRequest, TextGenerator};
use crate::models::DataSource;
use crate::utils::cache::TtlCache;
use crate::utils::error::CoreError;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub const TRANSLATION_CACHE_TTL: Duration = Duration::from_secs(300);

const DEFAULT_EXPLANATION: &str = "This query retrieves data to answer your question.";

lazy_static! {
    static ref SELECT_START: Regex = Regex::new(r"(?i)^\s*SELECT\b").unwrap();
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Translation {
    pub sql: String,
    pub title: String,
    pub explanation: String,
}

/// Schema-grounded natural-language-to-SQL translation. State-free per call;
/// results are cached under a fingerprint of (question, data source).
pub struct NlSqlTranslator {
    analyzer: Arc<SchemaAnalyzer>,
    llm: Arc<dyn TextGenerator>,
    cache: TtlCache<Translation>,
}

impl NlSqlTranslator {
    pub fn new(analyzer: Arc<SchemaAnalyzer>, llm: Arc<dyn TextGenerator>) -> Self {
        Self::with_cache(analyzer, llm, TtlCache::new(TRANSLATION_CACHE_TTL))
    }

    pub fn with_cache(
        analyzer: Arc<SchemaAnalyzer>,
        llm: Arc<dyn TextGenerator>,
        cache: TtlCache<Translation>,
    ) -> Self {
        Self {
            analyzer,
            llm,
            cache,
        }
    }

    pub async fn translate(
        &self,
        question: &str,
        data_source: &DataSource,
    ) -> Result<Translation, CoreError> {
        let key = cache_key(question, data_source.id);
        self.cache
            .remember(&key, || async {
                let schema = self.analyzer.schema_context(data_source).await?;
                if schema.is_empty() {
                    return Err(CoreError::SchemaUnavailable(
                        "no schema information available for this data source; ensure it is properly connected"
                            .to_string(),
                    ));
                }
                self.translate_with_schema(question, &schema).await
            })
            .await
    }

    /// Translation against an already-fetched schema. Model outages fall
    /// back to the rule-based generator before the failure surfaces.
    pub(crate) async fn translate_with_schema(
        &self,
        question: &str,
        schema: &SchemaMap,
    ) -> Result<Translation, CoreError> {
        match self.generate_from_model(question, schema).await {
            Ok(translation) => Ok(translation),
            Err(e) if e.is_model_unavailable() => {
                tracing::warn!(error = %e, "model backend unreachable, trying rule-based fallback");
                generate_fallback_query(question, schema).ok_or(e)
            }
            Err(e) => {
                tracing::error!(question, error = %e, "translation failed");
                Err(e)
            }
        }
    }

    async fn generate_from_model(
        &self,
        question: &str,
        schema: &SchemaMap,
    ) -> Result<Translation, CoreError> {
        let request = GenerationRequest::new(prompt::build_translation_prompt(question, schema))
            .with_system(prompt::SQL_SYSTEM_PROMPT)
            .with_max_tokens(500);
        let response = self.llm.generate(request).await?;

        let extracted = extract_sql_and_title(&response);
        if extracted.sql.is_empty() {
            return Err(CoreError::ParseFailure(
                "model response contained no SQL".to_string(),
            ));
        }
        validate_generated_sql(&extracted.sql)?;

        let explanation = self.explain(question, &extracted.sql).await;
        Ok(Translation {
            sql: extracted.sql,
            title: extracted.title,
            explanation,
        })
    }

    async fn explain(&self, question: &str, sql: &str) -> String {
        let request = GenerationRequest::new(prompt::build_explanation_prompt(question, sql))
            .with_max_tokens(150);
        match self.llm.generate(request).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                tracing::debug!(error = %e, "explanation generation failed, using default");
                DEFAULT_EXPLANATION.to_string()
            }
        }
    }

    /// Up to three follow-up question suggestions; never fatal.
    pub async fn suggest_follow_ups(&self, question: &str, result: &QueryResult) -> Vec<String> {
        let request = GenerationRequest::new(prompt::build_follow_up_prompt(question, result))
            .with_max_tokens(300);
        match self.llm.generate(request).await {
            Ok(response) => parse_follow_up_questions(&response),
            Err(e) => {
                tracing::warn!(error = %e, "follow-up generation failed");
                Vec::new()
            }
        }
    }
}

/// Translator-specific checks on top of the shared validator: one statement,
/// SELECT only.
fn validate_generated_sql(sql: &str) -> Result<(), CoreError> {
    validate_query(sql)?;
    if sql.matches(';').count() > 1 {
        return Err(CoreError::ValidationFailure(
            "Multiple SQL statements detected".to_string(),
        ));
    }
    if !SELECT_START.is_match(sql) {
        return Err(CoreError::ValidationFailure(
            "Only SELECT queries are allowed".to_string(),
        ));
    }
    Ok(())
}

fn cache_key(question: &str, data_source_id: Uuid) -> String {
    let mut hasher = Sha256::new();
    hasher.update(question.as_bytes());
    hasher.update(data_source_id.as_bytes());
    format!("ai_query:{}", hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::connections::ConnectionManager;
    use crate::models::EngineType;
    use crate::utils::crypto::ConfigCipher;
    use crate::utils::datasource::mock::{column, table, MockConnector};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Scripted model backend; replays queued responses in order.
    struct ScriptedModel {
        responses: Mutex<VecDeque<Result<String, CoreError>>>,
    }

    impl ScriptedModel {
        fn replying(responses: Vec<Result<String, CoreError>>) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.into_iter().collect()),
            })
        }

        fn offline() -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(VecDeque::new()),
            })
        }
    }

    #[async_trait]
    impl TextGenerator for ScriptedModel {
        async fn generate(&self, _request: GenerationRequest) -> Result<String, CoreError> {
            self.responses.lock().unwrap().pop_front().unwrap_or_else(|| {
                Err(CoreError::ModelUnavailable(
                    "could not reach model backend".to_string(),
                ))
            })
        }
    }

    fn analyzer_with(mock: MockConnector) -> Arc<SchemaAnalyzer> {
        let manager = Arc::new(ConnectionManager::with_resolver(
            ConfigCipher::new(ConfigCipher::generate_key()),
            Box::new(move |_, _| Ok(Box::new(mock.clone()))),
        ));
        Arc::new(SchemaAnalyzer::with_caches(
            manager,
            TtlCache::disabled(),
            TtlCache::disabled(),
        ))
    }

    fn translator_with(llm: Arc<dyn TextGenerator>) -> NlSqlTranslator {
        let mock = MockConnector::healthy().with_tables(vec![table(
            "reservations",
            vec![
                column("id", "int"),
                column("total_amount", "decimal"),
                column("created_at", "datetime"),
            ],
        )]);
        NlSqlTranslator::with_cache(analyzer_with(mock), llm, TtlCache::disabled())
    }

    fn test_source() -> DataSource {
        DataSource::new(
            "db",
            EngineType::MySql,
            json!({"host": "h", "database": "d"}),
            Uuid::new_v4(),
        )
    }

    #[tokio::test]
    async fn well_formed_model_output_translates() {
        let llm = ScriptedModel::replying(vec![
            Ok("SQL: SELECT SUM(total_amount) AS revenue FROM reservations\nTITLE: Total Revenue".to_string()),
            Ok("Adds up all reservation amounts.".to_string()),
        ]);
        let translator = translator_with(llm);

        let translation = translator
            .translate("total revenue", &test_source())
            .await
            .unwrap();
        assert_eq!(
            translation.sql,
            "SELECT SUM(total_amount) AS revenue FROM reservations"
        );
        assert_eq!(translation.title, "Total Revenue");
        assert_eq!(translation.explanation, "Adds up all reservation amounts.");
    }

    #[tokio::test]
    async fn non_select_output_is_a_validation_failure() {
        let llm = ScriptedModel::replying(vec![Ok(
            "SQL: SHOW TABLES\nTITLE: Tables".to_string()
        )]);
        let translator = translator_with(llm);

        let err = translator
            .translate("list tables", &test_source())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::ValidationFailure(_)));
    }

    #[tokio::test]
    async fn restricted_keyword_in_output_is_a_validation_failure() {
        let llm = ScriptedModel::replying(vec![Ok(
            "SQL: DELETE FROM reservations\nTITLE: Cleanup".to_string(),
        )]);
        let translator = translator_with(llm);

        let err = translator
            .translate("clean old rows", &test_source())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::ValidationFailure(_)));
    }

    #[tokio::test]
    async fn offline_model_uses_fallback_for_revenue_questions() {
        let translator = translator_with(ScriptedModel::offline());

        let translation = translator
            .translate("show revenue for last month", &test_source())
            .await
            .unwrap();
        assert!(translation.sql.contains("SUM(total_amount)"));
        assert_eq!(translation.title, "Last Month Revenue");
    }

    #[tokio::test]
    async fn offline_model_without_fallback_match_surfaces_unavailable() {
        let translator = translator_with(ScriptedModel::offline());

        let err = translator
            .translate("top guests by visits", &test_source())
            .await
            .unwrap_err();
        assert!(err.is_model_unavailable());
    }

    #[tokio::test]
    async fn empty_schema_is_schema_unavailable() {
        let translator = NlSqlTranslator::with_cache(
            analyzer_with(MockConnector::healthy()),
            ScriptedModel::offline(),
            TtlCache::disabled(),
        );

        let err = translator
            .translate("anything", &test_source())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::SchemaUnavailable(_)));
    }

    #[tokio::test]
    async fn explanation_failure_degrades_to_default() {
        let llm = ScriptedModel::replying(vec![Ok(
            "SQL: SELECT id FROM reservations\nTITLE: Ids".to_string(),
        )]);
        let translator = translator_with(llm);

        let translation = translator.translate("ids", &test_source()).await.unwrap();
        assert_eq!(translation.explanation, DEFAULT_EXPLANATION);
    }

    #[tokio::test]
    async fn follow_up_failures_yield_empty_list() {
        let translator = translator_with(ScriptedModel::offline());
        let result = QueryResult {
            data: vec![],
            columns: vec![],
            row_count: 0,
            execution_time_ms: 1,
            limited: false,
        };
        assert!(translator
            .suggest_follow_ups("question", &result)
            .await
            .is_empty());
    }

    #[test]
    fn cache_keys_fingerprint_question_and_source() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(cache_key("q", a), cache_key("q", a));
        assert_ne!(cache_key("q", a), cache_key("q", b));
        assert_ne!(cache_key("q1", a), cache_key("q2", a));
    }
}
