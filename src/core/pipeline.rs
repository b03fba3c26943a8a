use crate::core::insights::InsightsGenerator;
use crate::core::query::{QueryResult, QueryService};
use crate::core::translate::NlSqlTranslator;
use crate::core::viz::{recommend_visualization, VisualizationResponse};
use crate::models::{DataSource, NewSavedQuery};
use crate::utils::error::CoreError;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

pub const MIN_QUESTION_LEN: usize = 3;
pub const MAX_QUESTION_LEN: usize = 500;

/// Everything the orchestration layer needs to render one answered
/// question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResponse {
    pub sql: String,
    pub title: String,
    pub explanation: String,
    pub result: QueryResult,
    pub visualization: VisualizationResponse,
    pub follow_up_questions: Vec<String>,
}

/// Composition of the core services into the ask-a-question flow:
/// translate, execute, recommend a chart, explain, suggest follow-ups, and
/// persist history for non-empty results.
pub struct InsightPipeline {
    translator: Arc<NlSqlTranslator>,
    query_service: Arc<QueryService>,
    insights: Arc<InsightsGenerator>,
}

impl InsightPipeline {
    pub fn new(
        translator: Arc<NlSqlTranslator>,
        query_service: Arc<QueryService>,
        insights: Arc<InsightsGenerator>,
    ) -> Self {
        Self {
            translator,
            query_service,
            insights,
        }
    }

    /// Wires the whole stack from environment configuration: cipher,
    /// connection manager, schema analyzer, model client, query service,
    /// translator and insights generator with their default caches.
    pub fn from_config(
        config: &crate::utils::config::Config,
        store: Arc<dyn crate::models::SavedQueryStore>,
    ) -> Result<Self, CoreError> {
        let cipher = crate::utils::crypto::ConfigCipher::from_encoded_key(&config.master_key)
            .map_err(|e| {
                CoreError::ConnectionFailure(format!("invalid datasource master key: {}", e))
            })?;
        let manager = Arc::new(crate::core::connections::ConnectionManager::new(cipher));
        let analyzer = Arc::new(crate::core::schema::SchemaAnalyzer::new(Arc::clone(&manager)));
        let llm: Arc<dyn crate::llm::TextGenerator> =
            Arc::new(crate::llm::OpenAiClient::from_config(config));
        let query_service = Arc::new(QueryService::new(manager, store));
        let translator = Arc::new(NlSqlTranslator::new(
            Arc::clone(&analyzer),
            Arc::clone(&llm),
        ));
        let insights = Arc::new(InsightsGenerator::new(
            analyzer,
            Arc::clone(&query_service),
            llm,
        ));
        Ok(Self::new(translator, query_service, insights))
    }

    pub fn insights(&self) -> &Arc<InsightsGenerator> {
        &self.insights
    }

    pub fn translator(&self) -> &Arc<NlSqlTranslator> {
        &self.translator
    }

    pub async fn ask_question(
        &self,
        question: &str,
        data_source: &DataSource,
    ) -> Result<AskResponse, CoreError> {
        let question = question.trim();
        let length = question.chars().count();
        if !(MIN_QUESTION_LEN..=MAX_QUESTION_LEN).contains(&length) {
            return Err(CoreError::ValidationFailure(format!(
                "question must be between {} and {} characters",
                MIN_QUESTION_LEN, MAX_QUESTION_LEN
            )));
        }

        let translation = self.translator.translate(question, data_source).await?;
        let result = self
            .query_service
            .execute_query(data_source, &translation.sql, None)
            .await?;

        let visualization = recommend_visualization(&result, question);
        let explanation = self.insights.explain_query_result(&result, question).await;
        let follow_up_questions = self.translator.suggest_follow_ups(question, &result).await;

        // Empty results are not worth a history entry.
        if result.row_count > 0 {
            let record = NewSavedQuery {
                user_id: data_source.user_id,
                data_source_id: data_source.id,
                name: question.chars().take(100).collect(),
                sql: translation.sql.clone(),
                result_metadata: json!({
                    "question": question,
                    "explanation": translation.explanation,
                }),
                execution_time_ms: result.execution_time_ms,
                row_count: result.row_count,
            };
            if let Err(e) = self.query_service.save_query(record).await {
                tracing::warn!(error = %e, "failed to persist query history");
            }
        }

        Ok(AskResponse {
            sql: translation.sql,
            title: translation.title,
            explanation,
            result,
            visualization,
            follow_up_questions,
        })
    }

    /// User-typed SQL path. The query service applies the shared validator
    /// before anything reaches a connector; successful runs are recorded
    /// with their column metadata.
    pub async fn run_user_query(
        &self,
        data_source: &DataSource,
        sql: &str,
        limit: Option<usize>,
    ) -> Result<QueryResult, CoreError> {
        crate::core::query::validate_query(sql)?;
        let result = self
            .query_service
            .execute_query(data_source, sql, limit)
            .await?;

        let record = NewSavedQuery {
            user_id: data_source.user_id,
            data_source_id: data_source.id,
            name: sql.chars().take(100).collect(),
            sql: sql.to_string(),
            result_metadata: json!({"columns": result.columns}),
            execution_time_ms: result.execution_time_ms,
            row_count: result.row_count,
        };
        if let Err(e) = self.query_service.save_query(record).await {
            tracing::warn!(error = %e, "failed to persist query history");
        }

        Ok(result)
    }
}
