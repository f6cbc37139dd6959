use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use common::model::semantic_event::EventCategory;
use retrieval_pipeline::service::{RecallParams, RecallResult};
use serde::Deserialize;

use crate::{api_state::ApiState, error::ApiError};

fn default_limit() -> usize {
    10
}

fn default_graph_budget() -> usize {
    20
}

#[derive(Debug, Deserialize)]
pub struct RecallRequest {
    pub query: Option<String>,
    pub id: Option<String>,
    pub conversation_id: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub expand: bool,
    #[serde(default)]
    pub include_events: bool,
    #[serde(default)]
    pub include_entities: bool,
    #[serde(default = "default_graph_budget")]
    pub graph_budget: usize,
    #[serde(default)]
    pub graph_filters: Vec<String>,
    pub source: Option<String>,
    pub sensitivity: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
}

pub async fn recall(
    State(state): State<ApiState>,
    Json(input): Json<RecallRequest>,
) -> Result<Json<RecallResult>, ApiError> {
    let graph_filters = input
        .graph_filters
        .iter()
        .map(|raw| EventCategory::normalize(raw))
        .collect();

    let result = state
        .retrieval
        .recall(RecallParams {
            query: input.query,
            id: input.id,
            conversation_id: input.conversation_id,
            limit: input.limit,
            expand: input.expand,
            include_events: input.include_events,
            include_entities: input.include_entities,
            graph_budget: input.graph_budget,
            graph_filters,
            source: input.source,
            sensitivity: input.sensitivity,
            date_from: input.date_from,
            date_to: input.date_to,
        })
        .await?;

    Ok(Json(result))
}
