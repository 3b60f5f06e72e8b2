//! Upload gateway for the recipe backends
//!
//! Accepts a finished target document plus an optional thumbnail and
//! reports a structured success or error result, never a panic: the caller
//! must be able to record "document built but upload failed" distinctly
//! from an extraction failure. Tandoor documents get their required fields
//! re-defaulted here even though the adapter already did so.

use reqwest::multipart::{Form, Part};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;

use crate::adapter::tandoor;
use crate::error::{RecipeForgeError, Result};
use crate::types::{RecipeBackend, TargetDocument};

/// Connection parameters for one recipe backend
#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub base_url: String,
    pub token: String,
}

impl BackendConfig {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            token: token.into(),
        }
    }
}

/// Structured upload result handed back to the job layer
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum UploadReport {
    Success {
        recipe_id: String,
        backend: RecipeBackend,
    },
    Error {
        error: String,
    },
}

/// HTTP client for the Tandoor and Mealie REST APIs
pub struct UploadClient {
    client: reqwest::Client,
    tandoor: Option<BackendConfig>,
    mealie: Option<BackendConfig>,
}

impl UploadClient {
    pub fn new(tandoor: Option<BackendConfig>, mealie: Option<BackendConfig>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| RecipeForgeError::network(e.to_string(), None, None))?;
        Ok(Self {
            client,
            tandoor,
            mealie,
        })
    }

    fn backend_config(&self, backend: RecipeBackend) -> Result<&BackendConfig> {
        let config = match backend {
            RecipeBackend::Tandoor => self.tandoor.as_ref(),
            RecipeBackend::Mealie => self.mealie.as_ref(),
        };
        config.ok_or_else(|| {
            RecipeForgeError::config(format!(
                "No base URL and token configured for backend: {}",
                backend
            ))
        })
    }

    /// Upload a finished document, then its thumbnail if one exists.
    /// Thumbnail failures are logged but do not fail the upload.
    pub async fn send(&self, document: &TargetDocument, thumbnail: Option<&Path>) -> UploadReport {
        match self.try_send(document, thumbnail).await {
            Ok(recipe_id) => {
                tracing::info!(backend = %document.backend, recipe_id = %recipe_id, "recipe uploaded");
                UploadReport::Success {
                    recipe_id,
                    backend: document.backend,
                }
            }
            Err(err) => {
                tracing::error!(backend = %document.backend, error = %err, "recipe upload failed");
                UploadReport::Error {
                    error: err.to_string(),
                }
            }
        }
    }

    async fn try_send(&self, document: &TargetDocument, thumbnail: Option<&Path>) -> Result<String> {
        let backend = document.backend;
        let config = self.backend_config(backend)?;

        let (endpoint, payload) = match backend {
            RecipeBackend::Tandoor => ("/api/recipe/", prepare_tandoor_payload(&document.body)),
            RecipeBackend::Mealie => ("/api/recipes/create/html-or-json", document.body.clone()),
        };

        let url = format!("{}{}", config.base_url.trim_end_matches('/'), endpoint);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&config.token)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(RecipeForgeError::upload(
                backend.to_string(),
                format!("create request failed ({}): {}", status, body),
            ));
        }

        let recipe_id = match backend {
            RecipeBackend::Tandoor => extract_tandoor_id(&body).ok_or_else(|| {
                RecipeForgeError::upload(backend.to_string(), "no recipe id in response")
            })?,
            // Mealie answers with the new recipe's slug as a quoted string
            RecipeBackend::Mealie => body.trim().trim_matches(|c| c == '"' || c == '\'').to_string(),
        };

        if let Some(path) = thumbnail {
            if path.exists() {
                if let Err(err) = self.upload_thumbnail(backend, config, &recipe_id, path).await {
                    tracing::error!(
                        backend = %backend,
                        recipe_id = %recipe_id,
                        error = %err,
                        "thumbnail upload failed"
                    );
                }
            } else {
                tracing::warn!(path = %path.display(), "thumbnail file does not exist, skipping");
            }
        }

        Ok(recipe_id)
    }

    async fn upload_thumbnail(
        &self,
        backend: RecipeBackend,
        config: &BackendConfig,
        recipe_id: &str,
        path: &Path,
    ) -> Result<()> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            RecipeForgeError::io(e.to_string(), Some(path.display().to_string()))
        })?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("jpg")
            .to_lowercase();
        let mime = format!(
            "image/{}",
            if extension == "jpg" { "jpeg" } else { extension.as_str() }
        );

        let base_url = config.base_url.trim_end_matches('/');
        let (url, form) = match backend {
            RecipeBackend::Tandoor => {
                let part = Part::bytes(bytes)
                    .file_name(
                        path.file_name()
                            .and_then(|n| n.to_str())
                            .unwrap_or("image.jpg")
                            .to_string(),
                    )
                    .mime_str(&mime)
                    .map_err(|e| RecipeForgeError::upload(backend.to_string(), e.to_string()))?;
                (
                    format!("{}/api/recipe/{}/image/", base_url, recipe_id),
                    Form::new().part("image", part),
                )
            }
            RecipeBackend::Mealie => {
                let part = Part::bytes(bytes)
                    .file_name(format!("image.{}", extension))
                    .mime_str(&mime)
                    .map_err(|e| RecipeForgeError::upload(backend.to_string(), e.to_string()))?;
                (
                    format!("{}/api/recipes/{}/image", base_url, recipe_id),
                    Form::new()
                        .part("image", part)
                        .text("extension", extension.clone()),
                )
            }
        };

        let response = self
            .client
            .put(&url)
            .bearer_auth(&config.token)
            .multipart(form)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(RecipeForgeError::upload(
                backend.to_string(),
                format!("thumbnail request failed ({})", response.status()),
            ));
        }
        tracing::info!(backend = %backend, recipe_id = %recipe_id, "thumbnail uploaded");
        Ok(())
    }
}

/// Belt-and-suspenders defaulting before the document goes on the wire
fn prepare_tandoor_payload(body: &Value) -> Value {
    match body {
        Value::Object(map) => {
            let mut payload = map.clone();
            tandoor::apply_required_defaults(&mut payload);
            Value::Object(payload)
        }
        other => other.clone(),
    }
}

fn extract_tandoor_id(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    match value.get("id")? {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}
