//! Job tracking for extraction runs
//!
//! A thin in-memory status record the caller can poll while a run is in
//! flight. The tracker distinguishes three terminal outcomes: aborted
//! before any document existed, document built but upload failed, and
//! success.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::adapter::SchemaAdapter;
use crate::pipeline::{run_pipeline, CaptionSource, PipelineOutcome};
use crate::session::ModelSession;
use crate::types::{Platform, RecipeBackend};
use crate::upload::UploadClient;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

/// One tracked extraction job
#[derive(Debug, Clone, Serialize)]
pub struct Job {
    pub id: u64,
    pub url: String,
    pub platform: Platform,
    pub backend: RecipeBackend,
    pub status: JobStatus,
    pub progress: u8,
    pub message: String,
    pub result_url: Option<String>,
    pub recipe_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Thread-safe in-memory job registry
pub struct JobTracker {
    jobs: RwLock<HashMap<u64, Job>>,
    next_id: AtomicU64,
}

impl JobTracker {
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn create(&self, url: &str, platform: Platform, backend: RecipeBackend) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let job = Job {
            id,
            url: url.to_string(),
            platform,
            backend,
            status: JobStatus::Queued,
            progress: 0,
            message: "Queued".to_string(),
            result_url: None,
            recipe_id: None,
            created_at: Utc::now(),
            completed_at: None,
        };
        self.jobs.write().insert(id, job);
        id
    }

    pub fn update(&self, id: u64, status: JobStatus, progress: u8, message: &str) {
        let mut jobs = self.jobs.write();
        if let Some(job) = jobs.get_mut(&id) {
            job.status = status;
            job.progress = progress;
            job.message = message.to_string();
            if matches!(status, JobStatus::Completed | JobStatus::Failed) {
                job.completed_at = Some(Utc::now());
            }
        }
    }

    pub fn set_result(&self, id: u64, result_url: Option<String>, recipe_id: Option<String>) {
        let mut jobs = self.jobs.write();
        if let Some(job) = jobs.get_mut(&id) {
            job.result_url = result_url;
            job.recipe_id = recipe_id;
        }
    }

    pub fn get(&self, id: u64) -> Option<Job> {
        self.jobs.read().get(&id).cloned()
    }
}

impl Default for JobTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Validate that the URL plausibly belongs to the claimed platform
pub fn is_valid_url(url: &str, platform: Platform) -> bool {
    match platform {
        Platform::Instagram => url.contains("instagram.com"),
        Platform::Tiktok => url.contains("tiktok.com"),
    }
}

/// Process one tracked job end to end, updating its status record along
/// the way.
#[allow(clippy::too_many_arguments)]
pub async fn process_job<A, C>(
    tracker: &JobTracker,
    job_id: u64,
    source: &C,
    session: Box<dyn ModelSession>,
    adapter: A,
    uploader: &UploadClient,
    language: &str,
    audit_path: &Path,
) where
    A: SchemaAdapter,
    C: CaptionSource,
{
    let Some(job) = tracker.get(job_id) else {
        tracing::warn!(job_id, "job not found");
        return;
    };

    tracker.update(job_id, JobStatus::Processing, 10, "Starting job...");
    tracing::info!(job_id, url = %job.url, "starting job");

    if !is_valid_url(&job.url, job.platform) {
        tracing::warn!(job_id, url = %job.url, "invalid URL for platform");
        tracker.update(
            job_id,
            JobStatus::Failed,
            0,
            &format!("Invalid {} URL format", job.platform),
        );
        return;
    }

    tracker.update(job_id, JobStatus::Processing, 20, "Scraping content...");
    tracker.update(
        job_id,
        JobStatus::Processing,
        40,
        &format!("Processing for {}...", job.backend),
    );

    let outcome = run_pipeline(
        source,
        session,
        adapter,
        uploader,
        &job.url,
        job.platform,
        language,
        audit_path,
    )
    .await;

    tracker.update(job_id, JobStatus::Processing, 80, "Finishing up...");

    match outcome {
        PipelineOutcome::Aborted { error } => {
            tracing::error!(job_id, error = %error, "job aborted before document was built");
            tracker.update(job_id, JobStatus::Failed, 0, &format!("Error: {}", error));
        }
        PipelineOutcome::UploadFailed { error, .. } => {
            tracing::error!(job_id, error = %error, "document built but upload failed");
            tracker.update(
                job_id,
                JobStatus::Failed,
                0,
                &format!("Document built but upload failed: {}", error),
            );
        }
        PipelineOutcome::Uploaded { recipe_id, .. } => {
            tracing::info!(job_id, recipe_id = %recipe_id, "job completed");
            tracker.set_result(job_id, Some(job.url.clone()), Some(recipe_id));
            tracker.update(
                job_id,
                JobStatus::Completed,
                100,
                "Recipe successfully scraped and uploaded!",
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_validation_per_platform() {
        assert!(is_valid_url(
            "https://www.instagram.com/p/abc/",
            Platform::Instagram
        ));
        assert!(is_valid_url(
            "https://www.tiktok.com/@user/video/1",
            Platform::Tiktok
        ));
        assert!(!is_valid_url(
            "https://www.tiktok.com/@user/video/1",
            Platform::Instagram
        ));
        assert!(!is_valid_url("https://example.com/", Platform::Tiktok));
    }

    #[test]
    fn tracker_lifecycle() {
        let tracker = JobTracker::new();
        let id = tracker.create(
            "https://www.instagram.com/p/abc/",
            Platform::Instagram,
            RecipeBackend::Tandoor,
        );

        let job = tracker.get(id).unwrap();
        assert_eq!(job.status, JobStatus::Queued);
        assert!(job.completed_at.is_none());

        tracker.update(id, JobStatus::Processing, 40, "Processing for tandoor...");
        let job = tracker.get(id).unwrap();
        assert_eq!(job.status, JobStatus::Processing);
        assert_eq!(job.progress, 40);

        tracker.update(id, JobStatus::Completed, 100, "done");
        let job = tracker.get(id).unwrap();
        assert!(job.completed_at.is_some());
    }

    #[test]
    fn ids_are_unique() {
        let tracker = JobTracker::new();
        let a = tracker.create("u", Platform::Instagram, RecipeBackend::Mealie);
        let b = tracker.create("u", Platform::Instagram, RecipeBackend::Mealie);
        assert_ne!(a, b);
    }
}
