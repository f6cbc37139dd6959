use axum::{extract::State, Json};
use common::model::{
    artifact_revision::ArtifactRevision,
    entity::Entity,
    event_evidence::EventEvidence,
    event_job::{EventJob, JobStatus},
    semantic_event::SemanticEvent,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::{api_state::ApiState, error::ApiError};

#[derive(Debug, Deserialize, Default)]
pub struct StatusRequest {
    pub artifact_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub db_reachable: bool,
    pub artifact_revision_count: usize,
    pub semantic_event_count: usize,
    pub event_evidence_count: usize,
    pub entity_count: usize,
    pub pending_job_count: usize,
    pub job_status: Option<String>,
}

/// Probes a subsystem count, degrading to `0` and flagging `db_reachable`
/// false on failure rather than propagating — `status` must never fail.
async fn probe_count<F, Fut>(label: &str, db_reachable: &mut bool, f: F) -> usize
where
    F: FnOnce() -> Fut,
    Fut: std::future::Future<Output = Result<usize, common::error::AppError>>,
{
    match f().await {
        Ok(count) => count,
        Err(e) => {
            warn!(probe = label, error = %e, "status probe failed, degrading");
            *db_reachable = false;
            0
        }
    }
}

pub async fn status(
    State(state): State<ApiState>,
    Json(input): Json<StatusRequest>,
) -> Result<Json<StatusResponse>, ApiError> {
    let mut db_reachable = state.relational.ping().await.is_ok();

    let artifact_revision_count =
        probe_count("artifact_revision", &mut db_reachable, || {
            ArtifactRevision::count(&state.db)
        })
        .await;
    let semantic_event_count = probe_count("semantic_event", &mut db_reachable, || {
        SemanticEvent::count(&state.db)
    })
    .await;
    let event_evidence_count = probe_count("event_evidence", &mut db_reachable, || {
        EventEvidence::count(&state.db)
    })
    .await;
    let entity_count = probe_count("entity", &mut db_reachable, || Entity::count(&state.db)).await;
    let pending_job_count = probe_count("pending_jobs", &mut db_reachable, || {
        EventJob::pending_count(&state.db)
    })
    .await;

    let job_status = if let Some(artifact_id) = &input.artifact_id {
        match ArtifactRevision::find_by_artifact_id(&state.db, artifact_id).await {
            Ok(Some(revision)) => {
                match EventJob::find_by_uid_rev(
                    &state.db,
                    &revision.artifact_uid,
                    &revision.revision_id,
                )
                .await
                {
                    Ok(job) => job.map(|job| job_status_wire(job.status).to_string()),
                    Err(e) => {
                        warn!(error = %e, "job status probe failed, degrading");
                        db_reachable = false;
                        None
                    }
                }
            }
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "artifact lookup for status failed, degrading");
                db_reachable = false;
                None
            }
        }
    } else {
        None
    };

    Ok(Json(StatusResponse {
        db_reachable,
        artifact_revision_count,
        semantic_event_count,
        event_evidence_count,
        entity_count,
        pending_job_count,
        job_status,
    }))
}

/// `DONE` is the internal job-row status; the wire contract calls it
/// `COMPLETED`.
fn job_status_wire(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Pending => "PENDING",
        JobStatus::Processing => "PROCESSING",
        JobStatus::Done => "COMPLETED",
        JobStatus::Failed => "FAILED",
    }
}
