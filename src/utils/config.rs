use std::env;

/// Runtime configuration for the pipeline's external collaborators: the
/// text-generation backend and the master key protecting stored connection
/// configurations.
#[derive(Debug, Clone)]
pub struct Config {
    pub llm_base_url: String,
    pub llm_api_key: String,
    pub llm_model: String,
    /// Base64-encoded 32-byte AES key for `ConfigCipher`.
    pub master_key: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();

        Config {
            llm_base_url: env::var("LLM_BASE_URL")
                .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
            llm_api_key: env::var("LLM_API_KEY").unwrap_or_default(),
            llm_model: env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string()),
            master_key: env::var("DATASOURCE_MASTER_KEY").unwrap_or_default(),
        }
    }
}
