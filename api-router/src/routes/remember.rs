use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use ingestion_pipeline::coordinator::{IngestOutcome, IngestParams, IngestStatus};
use serde::{Deserialize, Serialize};

use crate::{api_state::ApiState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct RememberRequest {
    pub artifact_type: String,
    pub source_system: String,
    pub content: String,
    pub source_id: Option<String>,
    pub source_ts: Option<DateTime<Utc>>,
    pub sensitivity: Option<String>,
    pub visibility_scope: Option<String>,
    pub retention_policy: Option<String>,
    pub conversation_id: Option<String>,
    pub role: Option<String>,
    pub turn_index: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct RememberResponse {
    pub artifact_id: String,
    pub artifact_uid: String,
    pub revision_id: String,
    pub is_chunked: bool,
    pub chunk_count: usize,
    pub job_id: Option<String>,
    pub status: &'static str,
}

impl From<IngestOutcome> for RememberResponse {
    fn from(outcome: IngestOutcome) -> Self {
        Self {
            artifact_id: outcome.artifact_id,
            artifact_uid: outcome.artifact_uid,
            revision_id: outcome.revision_id,
            is_chunked: outcome.is_chunked,
            chunk_count: outcome.chunk_count,
            job_id: outcome.job_id,
            status: match outcome.status {
                IngestStatus::Stored => "stored",
                IngestStatus::Unchanged => "unchanged",
            },
        }
    }
}

pub async fn remember(
    State(state): State<ApiState>,
    Json(input): Json<RememberRequest>,
) -> Result<Json<RememberResponse>, ApiError> {
    let outcome = state
        .coordinator
        .ingest(
            &input.artifact_type,
            &input.source_system,
            &input.content,
            IngestParams {
                source_id: input.source_id,
                source_ts: input.source_ts,
                sensitivity: input.sensitivity,
                visibility_scope: input.visibility_scope,
                retention_policy: input.retention_policy,
                conversation_id: input.conversation_id,
                role: input.role,
                turn_index: input.turn_index,
            },
        )
        .await?;

    Ok(Json(outcome.into()))
}
