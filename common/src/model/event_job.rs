use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{db::SurrealDbClient, error::AppError, store::StoredObject, stored_object};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum JobStatus {
    Pending,
    Processing,
    Done,
    Failed,
}

stored_object!(EventJob, "event_jobs", {
    artifact_uid: String,
    revision_id: String,
    job_type: String,
    status: JobStatus,
    attempts: u32,
    max_attempts: u32,
    next_run_at: DateTime<Utc>,
    locked_at: Option<DateTime<Utc>>,
    locked_by: Option<String>,
    last_error_code: Option<String>,
    last_error_message: Option<String>
});

pub const JOB_TYPE_EXTRACT_EVENTS: &str = "extract_events";

impl EventJob {
    /// Enqueues an `extract_events` job for `(artifact_uid, revision_id)`,
    /// a no-op if one already exists per the `(uid, rev, job_type)`
    /// uniqueness constraint.
    pub async fn enqueue(
        db: &SurrealDbClient,
        artifact_uid: &str,
        revision_id: &str,
        max_attempts: u32,
    ) -> Result<Option<String>, AppError> {
        if let Some(existing) = Self::find_by_uid_rev(db, artifact_uid, revision_id).await? {
            return Ok(Some(existing.id));
        }

        let now = Utc::now();
        let job = EventJob {
            id: crate::ids::uuid(),
            created_at: now,
            updated_at: now,
            artifact_uid: artifact_uid.to_string(),
            revision_id: revision_id.to_string(),
            job_type: JOB_TYPE_EXTRACT_EVENTS.to_string(),
            status: JobStatus::Pending,
            attempts: 0,
            max_attempts,
            next_run_at: now,
            locked_at: None,
            locked_by: None,
            last_error_code: None,
            last_error_message: None,
        };

        match db.store_item(job.clone()).await {
            Ok(_) => Ok(Some(job.id)),
            Err(_) => {
                // Another caller won the uniqueness race; fall through to
                // the now-existing row so enqueue stays idempotent.
                let existing = Self::find_by_uid_rev(db, artifact_uid, revision_id).await?;
                Ok(existing.map(|j| j.id))
            }
        }
    }

    pub async fn find_by_uid_rev(
        db: &SurrealDbClient,
        artifact_uid: &str,
        revision_id: &str,
    ) -> Result<Option<Self>, AppError> {
        let mut response = db
            .client
            .query(
                "SELECT * FROM event_jobs WHERE artifact_uid = $uid AND revision_id = $rev AND job_type = $jt LIMIT 1",
            )
            .bind(("uid", artifact_uid.to_string()))
            .bind(("rev", revision_id.to_string()))
            .bind(("jt", JOB_TYPE_EXTRACT_EVENTS.to_string()))
            .await?;
        let rows: Vec<Self> = response.take(0)?;
        Ok(rows.into_iter().next())
    }

    /// Claims one `PENDING` job whose `next_run_at` has elapsed, atomically
    /// marking it `PROCESSING` under `worker_id` and incrementing `attempts`.
    pub async fn claim_one(
        db: &SurrealDbClient,
        worker_id: &str,
    ) -> Result<Option<Self>, AppError> {
        let now = Utc::now();
        let mut response = db
            .client
            .query(
                "UPDATE event_jobs SET
                    status = 'PROCESSING',
                    attempts = attempts + 1,
                    locked_at = $now,
                    locked_by = $worker,
                    updated_at = $now
                 WHERE status = 'PENDING' AND next_run_at <= $now
                 ORDER BY created_at ASC LIMIT 1
                 RETURN AFTER",
            )
            .bind(("now", now))
            .bind(("worker", worker_id.to_string()))
            .await?;
        let rows: Vec<Self> = response.take(0)?;
        Ok(rows.into_iter().next())
    }

    pub async fn mark_done(db: &SurrealDbClient, job_id: &str) -> Result<(), AppError> {
        db.client
            .query("UPDATE type::thing('event_jobs', $id) SET status = 'DONE', updated_at = $now")
            .bind(("id", job_id.to_string()))
            .bind(("now", Utc::now()))
            .await?;
        Ok(())
    }

    /// Returns a transiently-failed job to `PENDING` with exponential
    /// backoff, or moves it to terminal `FAILED` once `max_attempts` have
    /// been spent.
    pub async fn retry_or_fail(
        db: &SurrealDbClient,
        job: &Self,
        error_code: &str,
        error_message: &str,
    ) -> Result<(), AppError> {
        let now = Utc::now();
        if job.attempts >= job.max_attempts {
            db.client
                .query(
                    "UPDATE type::thing('event_jobs', $id) SET
                        status = 'FAILED', last_error_code = $code, last_error_message = $msg, updated_at = $now",
                )
                .bind(("id", job.id.clone()))
                .bind(("code", error_code.to_string()))
                .bind(("msg", error_message.to_string()))
                .bind(("now", now))
                .await?;
        } else {
            let backoff_secs = (30_i64 * 2_i64.pow(job.attempts.saturating_sub(1))).min(600);
            let next_run_at = now + chrono::Duration::seconds(backoff_secs);
            db.client
                .query(
                    "UPDATE type::thing('event_jobs', $id) SET
                        status = 'PENDING', next_run_at = $next, last_error_code = $code, last_error_message = $msg, updated_at = $now",
                )
                .bind(("id", job.id.clone()))
                .bind(("next", next_run_at))
                .bind(("code", error_code.to_string()))
                .bind(("msg", error_message.to_string()))
                .bind(("now", now))
                .await?;
        }
        Ok(())
    }

    /// Permanent failure: skips retry and moves straight to `FAILED`.
    pub async fn fail_permanently(
        db: &SurrealDbClient,
        job_id: &str,
        error_code: &str,
        error_message: &str,
    ) -> Result<(), AppError> {
        db.client
            .query(
                "UPDATE type::thing('event_jobs', $id) SET
                    status = 'FAILED', last_error_code = $code, last_error_message = $msg, updated_at = $now",
            )
            .bind(("id", job_id.to_string()))
            .bind(("code", error_code.to_string()))
            .bind(("msg", error_message.to_string()))
            .bind(("now", Utc::now()))
            .await?;
        Ok(())
    }

    /// Administrative reset used by forced re-extraction: clears the job
    /// back to `PENDING, attempts=0` so the worker picks it up again.
    pub async fn reset(db: &SurrealDbClient, job_id: &str) -> Result<(), AppError> {
        db.client
            .query(
                "UPDATE type::thing('event_jobs', $id) SET
                    status = 'PENDING', attempts = 0, next_run_at = $now, locked_at = NONE, locked_by = NONE, updated_at = $now",
            )
            .bind(("id", job_id.to_string()))
            .bind(("now", Utc::now()))
            .await?;
        Ok(())
    }

    pub async fn pending_count(db: &SurrealDbClient) -> Result<usize, AppError> {
        #[derive(Deserialize)]
        struct CountRow {
            count: usize,
        }
        let mut response = db
            .client
            .query("SELECT count() FROM event_jobs WHERE status = 'PENDING' OR status = 'PROCESSING' GROUP ALL")
            .await?;
        let rows: Vec<CountRow> = response.take(0)?;
        Ok(rows.into_iter().next().map_or(0, |r| r.count))
    }
}
