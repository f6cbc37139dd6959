use axum::{extract::State, Json};
use common::{
    error::AppError,
    model::{
        artifact_revision::ArtifactRevision, entity_mention::EntityMention,
        semantic_event::SemanticEvent,
    },
};
use serde::{Deserialize, Serialize};

use crate::{api_state::ApiState, error::ApiError};

#[derive(Debug, Deserialize)]
pub struct ForgetRequest {
    pub id: String,
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Serialize)]
pub struct ForgetResponse {
    pub id: String,
    pub deleted: bool,
}

pub async fn forget(
    State(state): State<ApiState>,
    Json(input): Json<ForgetRequest>,
) -> Result<Json<ForgetResponse>, ApiError> {
    if !input.confirm {
        return Err(ApiError::from(AppError::Validation(
            "forget requires confirm=true".into(),
        )));
    }

    if input.id.starts_with("evt_") {
        return Err(ApiError::from(AppError::Validation(
            "events are derived state; forget the source artifact instead".into(),
        )));
    }

    let revision = ArtifactRevision::find_by_artifact_id(&state.db, &input.id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("artifact {} not found", input.id)))?;
    let artifact_uid = revision.artifact_uid;

    // Order matters: event_actor/event_subject join through semantic_event,
    // so they must go before it, and the artifact_revision row goes last.
    SemanticEvent::delete_by_uid(&state.db, &artifact_uid).await?;
    EntityMention::delete_by_uid(&state.db, &artifact_uid).await?;
    state.vector.delete_by_artifact(&artifact_uid).await?;
    ArtifactRevision::delete_by_uid(&state.db, &artifact_uid).await?;

    Ok(Json(ForgetResponse {
        id: input.id,
        deleted: true,
    }))
}
