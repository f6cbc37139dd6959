use std::{sync::Arc, time::Duration};

use common::{
    config::AppConfig,
    db::SurrealDbClient,
    embedding::EmbeddingClient,
    error::AppError,
    llm::LlmClient,
    model::{artifact_revision::ArtifactRevision, event_job::EventJob, semantic_event::SemanticEvent},
    vector::VectorStoreClient,
};
use tracing::{error, info, warn};

use super::{reset_mentions_for_revision, ExtractionRunner};

/// Component 9: polls `event_jobs` for claimable work, runs extraction for
/// each, and writes the result atomically before marking the job done.
/// Transient failures are retried with backoff; permanent failures move the
/// job straight to `FAILED` without burning an attempt on the next poll.
pub struct ExtractionWorker {
    db: Arc<SurrealDbClient>,
    runner: ExtractionRunner,
    worker_id: String,
    poll_interval: Duration,
}

impl ExtractionWorker {
    pub fn new(
        db: Arc<SurrealDbClient>,
        vector: Arc<VectorStoreClient>,
        embedding: Arc<EmbeddingClient>,
        llm: Arc<LlmClient>,
        config: &AppConfig,
    ) -> Self {
        Self {
            db: db.clone(),
            runner: ExtractionRunner::new(db, vector, embedding, llm),
            worker_id: config.worker_id.clone(),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
        }
    }

    /// Runs forever, claiming and processing jobs until the process exits.
    pub async fn run_forever(&self) -> ! {
        loop {
            match self.tick().await {
                Ok(true) => {}
                Ok(false) => tokio::time::sleep(self.poll_interval).await,
                Err(e) => {
                    error!(error = %e, "worker tick failed outside job processing");
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }

    /// Claims and processes at most one job. Returns `true` if a job was
    /// claimed (so the caller can poll again immediately), `false` if the
    /// queue was empty.
    pub async fn tick(&self) -> Result<bool, AppError> {
        let Some(job) = EventJob::claim_one(&self.db, &self.worker_id).await? else {
            return Ok(false);
        };

        info!(job_id = %job.id, artifact_uid = %job.artifact_uid, revision_id = %job.revision_id, "claimed extraction job");

        if let Err(e) = self.process(&job).await {
            if e.is_transient() {
                warn!(job_id = %job.id, error = %e, "transient failure, scheduling retry");
                EventJob::retry_or_fail(&self.db, &job, e.code(), &e.to_string()).await?;
            } else {
                warn!(job_id = %job.id, error = %e, "permanent failure");
                EventJob::fail_permanently(&self.db, &job.id, e.code(), &e.to_string()).await?;
            }
        }

        Ok(true)
    }

    async fn process(&self, job: &EventJob) -> Result<(), AppError> {
        let revision =
            ArtifactRevision::find_by_uid_rev(&self.db, &job.artifact_uid, &job.revision_id)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(format!(
                        "artifact_revision {}/{} not found for job {}",
                        job.artifact_uid, job.revision_id, job.id
                    ))
                })?;

        // Clear any mentions left by a prior failed attempt so re-resolution
        // starts clean; entities themselves are left in place, since exact
        // and near-duplicate matching converges to the same rows on retry.
        reset_mentions_for_revision(&self.db, &job.artifact_uid, &job.revision_id).await?;

        let output = self
            .runner
            .run(&job.artifact_uid, &job.revision_id, revision.is_chunked)
            .await?;

        SemanticEvent::replace_extraction_result(
            &self.db,
            &job.artifact_uid,
            &job.revision_id,
            output.events,
            output.evidence,
            output.actors,
            output.subjects,
        )
        .await?;

        EventJob::mark_done(&self.db, &job.id).await?;
        info!(job_id = %job.id, "extraction job done");
        Ok(())
    }
}
