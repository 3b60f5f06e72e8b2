//! API-backed model session
//!
//! Speaks the OpenAI chat-completions protocol and therefore also works
//! against OpenAI-compatible endpoints (OpenRouter, local gateways, etc.).
//! The full message history is kept for the run so that later per-step
//! prompts can rely on the model having seen earlier turns.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::ModelSession;
use crate::error::{RecipeForgeError, Result};

/// Model session realized as a direct chat-completions API call
pub struct ApiSession {
    client: Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
    history: Vec<ChatMessage>,
}

impl ApiSession {
    pub fn new(api_key: String, model: String, base_url: Option<String>) -> Result<Self> {
        if api_key.is_empty() {
            return Err(RecipeForgeError::config("API key is required"));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| RecipeForgeError::network(e.to_string(), None, None))?;

        Ok(Self {
            client,
            api_key,
            model,
            base_url: base_url.unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            temperature: 0.2,
            history: Vec::new(),
        })
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Intelligently constructs the full API URL
    fn build_url(&self, endpoint: &str) -> String {
        let base_url = self.base_url.trim_end_matches('/');
        if base_url.ends_with("/v1") {
            format!("{}{}", base_url, endpoint)
        } else {
            format!("{}/v1{}", base_url, endpoint)
        }
    }

    async fn complete(&mut self, content: &str) -> Result<String> {
        let mut messages = self.history.clone();
        messages.push(ChatMessage::user(content));

        let request = ChatRequest {
            model: self.model.clone(),
            messages,
            temperature: self.temperature,
        };

        let url = self.build_url("/chat/completions");
        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                RecipeForgeError::network(
                    format!("Failed to connect to API: {}", e),
                    None,
                    Some(url.clone()),
                )
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());

            let error_msg = match status.as_u16() {
                401 => format!(
                    "Authentication failed (401). Please check your API key for {}",
                    self.base_url
                ),
                429 => "Rate limit exceeded (429). Please try again later".to_string(),
                500..=599 => format!(
                    "Server error ({}). The API service is experiencing issues",
                    status
                ),
                _ => format!("API request failed ({}): {}", status, error_text),
            };

            return Err(RecipeForgeError::network(
                error_msg,
                Some(status.as_u16()),
                Some(url),
            ));
        }

        let completion: ChatResponse = response
            .json()
            .await
            .map_err(|e| RecipeForgeError::parse(e.to_string(), None))?;

        let reply = completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| RecipeForgeError::parse("No choices in API response", None))?;

        // Commit the turn only after a successful exchange
        self.history.push(ChatMessage::user(content));
        self.history.push(ChatMessage::assistant(&reply));

        Ok(reply)
    }
}

#[async_trait]
impl ModelSession for ApiSession {
    async fn initialize_chat(&mut self, caption: &str) -> Result<()> {
        self.history.clear();
        self.history.push(ChatMessage::system(&format!(
            "I'm going to ask you questions about this recipe. Please use \
             this recipe information as context for all your responses: {}",
            caption
        )));
        tracing::info!(model = %self.model, "chat initialized with recipe context");
        Ok(())
    }

    async fn send_raw_prompt(&mut self, prompt: &str) -> Option<String> {
        match self.complete(prompt).await {
            Ok(reply) => Some(reply),
            Err(err) => {
                tracing::warn!(error = %err, "chat completion failed");
                None
            }
        }
    }
}

// Chat-completions wire structures
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

impl ChatMessage {
    fn system(content: &str) -> Self {
        Self {
            role: "system".to_string(),
            content: content.to_string(),
        }
    }

    fn user(content: &str) -> Self {
        Self {
            role: "user".to_string(),
            content: content.to_string(),
        }
    }

    fn assistant(content: &str) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.to_string(),
        }
    }
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}
