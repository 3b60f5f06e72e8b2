//! End-to-end extraction pipeline
//!
//! Composes the caption collaborator, the assembler and the upload gateway
//! into one run with three distinguishable terminal outcomes: aborted
//! before any document existed, document built but upload failed, and
//! success.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::adapter::SchemaAdapter;
use crate::assembler::RecipeAssembler;
use crate::error::{RecipeForgeError, Result};
use crate::session::ModelSession;
use crate::types::{Caption, Platform, TargetDocument};
use crate::upload::{UploadClient, UploadReport};

/// Collaborator that turns a post URL into caption text and a thumbnail.
/// The actual platform scraping lives outside this crate.
#[async_trait]
pub trait CaptionSource: Send + Sync {
    async fn fetch(&self, url: &str, platform: Platform) -> Result<Caption>;
}

/// Caption source backed by a pre-extracted text file, for CLI use and for
/// wiring an external scraper in through the filesystem.
pub struct FileCaptionSource {
    pub caption_path: PathBuf,
    pub thumbnail: Option<PathBuf>,
}

impl FileCaptionSource {
    pub fn new(caption_path: PathBuf, thumbnail: Option<PathBuf>) -> Self {
        Self {
            caption_path,
            thumbnail,
        }
    }
}

#[async_trait]
impl CaptionSource for FileCaptionSource {
    async fn fetch(&self, url: &str, _platform: Platform) -> Result<Caption> {
        let text = tokio::fs::read_to_string(&self.caption_path)
            .await
            .map_err(|e| {
                RecipeForgeError::io(
                    e.to_string(),
                    Some(self.caption_path.display().to_string()),
                )
            })?;
        if text.trim().is_empty() {
            return Err(RecipeForgeError::validation("caption file is empty"));
        }
        let mut caption = Caption::new(text, url);
        caption.thumbnail = self.thumbnail.clone();
        Ok(caption)
    }
}

/// Terminal outcome of one pipeline run
#[derive(Debug)]
pub enum PipelineOutcome {
    /// Failed before any document was produced; nothing was uploaded
    Aborted { error: String },
    /// A document was built and persisted, but the backend rejected it
    UploadFailed {
        document: TargetDocument,
        error: String,
    },
    /// Document uploaded, recipe created
    Uploaded {
        document: TargetDocument,
        recipe_id: String,
    },
}

/// Persist the finished document as a durable audit trail before upload.
pub fn write_audit(path: &Path, document: &TargetDocument) -> Result<()> {
    let pretty = serde_json::to_string_pretty(&document.body)?;
    std::fs::write(path, pretty)
        .map_err(|e| RecipeForgeError::io(e.to_string(), Some(path.display().to_string())))?;
    tracing::info!(path = %path.display(), "final document written");
    Ok(())
}

/// Run caption fetch, extraction, audit write and upload for one post.
#[allow(clippy::too_many_arguments)]
pub async fn run_pipeline<A, C>(
    source: &C,
    session: Box<dyn ModelSession>,
    adapter: A,
    uploader: &UploadClient,
    url: &str,
    platform: Platform,
    language: &str,
    audit_path: &Path,
) -> PipelineOutcome
where
    A: SchemaAdapter,
    C: CaptionSource,
{
    let caption = match source.fetch(url, platform).await {
        Ok(caption) => caption,
        Err(err) => {
            tracing::error!(url, error = %err, "no caption or image found");
            return PipelineOutcome::Aborted {
                error: format!("no caption or image found: {}", err),
            };
        }
    };
    tracing::info!(url, chars = caption.text.len(), "caption extracted");

    let mut assembler = RecipeAssembler::new(session, adapter, language);
    let document = match assembler.run(&caption).await {
        Ok(document) => document,
        Err(err) => {
            tracing::error!(url, error = %err, "extraction aborted");
            return PipelineOutcome::Aborted {
                error: err.to_string(),
            };
        }
    };

    // Observability only; a failed audit write never blocks the upload.
    if let Err(err) = write_audit(audit_path, &document) {
        tracing::warn!(error = %err, "failed to write audit file");
    }

    match uploader.send(&document, caption.thumbnail.as_deref()).await {
        UploadReport::Success { recipe_id, .. } => PipelineOutcome::Uploaded {
            document,
            recipe_id,
        },
        UploadReport::Error { error } => PipelineOutcome::UploadFailed { document, error },
    }
}
