//! Environment-driven configuration

use std::env;
use std::path::PathBuf;

use crate::error::Result;
use crate::types::{RecipeBackend, SessionKind};
use crate::upload::BackendConfig;

/// Everything the pipeline needs, read once from the environment
#[derive(Debug, Clone)]
pub struct ForgeConfig {
    /// Which model session realization to use
    pub session: SessionKind,
    /// Which recipe backend the run targets
    pub backend: RecipeBackend,
    /// ISO language code the model must answer in
    pub language: String,
    pub api_key: Option<String>,
    pub api_model: String,
    pub api_base_url: Option<String>,
    pub webdriver_url: String,
    pub tandoor: Option<BackendConfig>,
    pub mealie: Option<BackendConfig>,
    /// Where the finished document is persisted before upload
    pub audit_path: PathBuf,
}

impl ForgeConfig {
    pub fn from_env() -> Result<Self> {
        let session = env::var("MODEL_SESSION")
            .unwrap_or_else(|_| "api".to_string())
            .parse()?;
        let backend = env::var("RECIPE_BACKEND")
            .unwrap_or_else(|_| "tandoor".to_string())
            .parse()?;
        let language = env::var("LANGUAGE_CODE").unwrap_or_else(|_| "en".to_string());

        Ok(Self {
            session,
            backend,
            language,
            api_key: env::var("OPENAI_API_KEY").ok(),
            api_model: env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4.1-mini".to_string()),
            api_base_url: env::var("OPENAI_BASE_URL").ok(),
            webdriver_url: env::var("WEBDRIVER_URL")
                .unwrap_or_else(|_| "http://localhost:9515".to_string()),
            tandoor: backend_from_env("TANDOOR"),
            mealie: backend_from_env("MEALIE"),
            audit_path: env::var("FINAL_JSON_PATH")
                .unwrap_or_else(|_| "final_json.json".to_string())
                .into(),
        })
    }
}

fn backend_from_env(suffix: &str) -> Option<BackendConfig> {
    let base_url = env::var(format!("BASE_URL_{}", suffix)).ok()?;
    let token = env::var(format!("TOKEN_{}", suffix)).ok()?;
    Some(BackendConfig::new(base_url, token))
}
