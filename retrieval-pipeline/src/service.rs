use std::{collections::HashSet, sync::Arc};

use chrono::{DateTime, Utc};
use common::{
    db::SurrealDbClient,
    embedding::EmbeddingClient,
    error::AppError,
    model::{
        artifact_revision::ArtifactRevision,
        entity::Entity,
        event_evidence::EventEvidence,
        semantic_event::{EventCategory, SemanticEvent},
    },
    vector::{Collection, VectorFilters, VectorHit, VectorStoreClient},
};

use tracing::warn;

use crate::{graph, rrf};

const GRAPH_SEED_LIMIT: usize = 5;
const OVER_FETCH_FACTOR: usize = 3;

#[derive(Debug, Clone, Default)]
pub struct RecallParams {
    pub query: Option<String>,
    pub id: Option<String>,
    pub conversation_id: Option<String>,
    pub limit: usize,
    pub expand: bool,
    pub include_events: bool,
    pub include_entities: bool,
    pub graph_budget: usize,
    pub graph_filters: Vec<EventCategory>,
    pub source: Option<String>,
    pub sensitivity: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct EventSummary {
    pub event_id: String,
    pub category: String,
    pub event_time: Option<DateTime<Utc>>,
    pub narrative: String,
    pub confidence: f32,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct RecallHit {
    pub id: String,
    pub artifact_uid: String,
    pub content: String,
    pub similarity: f32,
    pub source: Option<String>,
    pub sensitivity: Option<String>,
    pub events: Option<Vec<EventSummary>>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct RelatedHit {
    pub id: String,
    pub reason: String,
    pub content: String,
    pub events: Option<Vec<EventSummary>>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct EntitySummary {
    pub entity_id: String,
    pub canonical_name: String,
    #[serde(rename = "type")]
    pub entity_type: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ConversationTurn {
    pub role: Option<String>,
    pub turn_index: Option<i64>,
    pub ts: DateTime<Utc>,
    pub content: String,
}

#[derive(Debug, Clone, serde::Serialize, Default)]
pub struct RecallResult {
    pub results: Vec<RecallHit>,
    pub related: Vec<RelatedHit>,
    pub entities: Vec<EntitySummary>,
    pub total_count: usize,
    pub turns: Option<Vec<ConversationTurn>>,
}

/// Component 6: the `recall` half of the RPC facade. Runs the hybrid
/// retrieval algorithm of §4.6 — parallel collection fan-out, RRF merge,
/// artifact dedup, optional neighbor splicing and graph expansion.
pub struct RetrievalService {
    db: Arc<SurrealDbClient>,
    vector: Arc<VectorStoreClient>,
    embedding: Arc<EmbeddingClient>,
}

impl RetrievalService {
    pub fn new(
        db: Arc<SurrealDbClient>,
        vector: Arc<VectorStoreClient>,
        embedding: Arc<EmbeddingClient>,
    ) -> Self {
        Self {
            db,
            vector,
            embedding,
        }
    }

    pub async fn recall(&self, params: RecallParams) -> Result<RecallResult, AppError> {
        if let Some(conversation_id) = &params.conversation_id {
            return self.recall_conversation(conversation_id).await;
        }
        if let Some(id) = &params.id {
            return self.recall_by_id(id, &params).await;
        }
        let query = params
            .query
            .as_deref()
            .ok_or_else(|| AppError::Validation("recall requires query, id, or conversation_id".into()))?;
        self.recall_by_query(query, &params).await
    }

    async fn recall_conversation(&self, conversation_id: &str) -> Result<RecallResult, AppError> {
        let revisions = ArtifactRevision::find_by_conversation(&self.db, conversation_id).await?;
        let mut turns = Vec::with_capacity(revisions.len());
        for revision in revisions {
            let content = self
                .vector
                .content_for_revision(&revision.artifact_uid, &revision.revision_id)
                .await?
                .map(|c| c.text)
                .unwrap_or_default();
            turns.push(ConversationTurn {
                role: revision.role,
                turn_index: revision.turn_index,
                ts: revision.ingested_at,
                content,
            });
        }
        let total_count = turns.len();
        Ok(RecallResult {
            turns: Some(turns),
            total_count,
            ..Default::default()
        })
    }

    async fn recall_by_id(&self, id: &str, params: &RecallParams) -> Result<RecallResult, AppError> {
        if let Some(event_id) = id.strip_prefix("evt_").map(|_| id) {
            let events = SemanticEvent::find_by_ids(&self.db, &[event_id.to_string()]).await?;
            let Some(event) = events.into_iter().next() else {
                return Err(AppError::NotFound(format!("event {id} not found")));
            };
            let evidence = EventEvidence::find_by_event(&self.db, &event.id).await?;
            let content = evidence
                .first()
                .map(|e| e.quote.clone())
                .unwrap_or_default();
            let hit = RecallHit {
                id: event.id.clone(),
                artifact_uid: event.artifact_uid.clone(),
                content,
                similarity: 1.0,
                source: None,
                sensitivity: None,
                events: Some(vec![to_summary(&event)]),
            };
            return Ok(RecallResult {
                results: vec![hit],
                total_count: 1,
                ..Default::default()
            });
        }

        let revision = ArtifactRevision::find_by_artifact_id(&self.db, id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("artifact {id} not found")))?;
        let content = self
            .vector
            .content_for_revision(&revision.artifact_uid, &revision.revision_id)
            .await?;
        let text = content.map(|c| c.text).unwrap_or_default();

        let events = if params.include_events {
            Some(
                SemanticEvent::find_by_uid_rev(&self.db, &revision.artifact_uid, &revision.revision_id)
                    .await?
                    .iter()
                    .map(to_summary)
                    .collect(),
            )
        } else {
            None
        };

        let hit = RecallHit {
            id: revision.artifact_uid.clone(),
            artifact_uid: revision.artifact_uid,
            content: text,
            similarity: 1.0,
            source: Some(revision.source_system),
            sensitivity: revision.sensitivity,
            events,
        };
        Ok(RecallResult {
            results: vec![hit],
            total_count: 1,
            ..Default::default()
        })
    }

    async fn recall_by_query(
        &self,
        query: &str,
        params: &RecallParams,
    ) -> Result<RecallResult, AppError> {
        let limit = params.limit.clamp(1, 50);
        let embedding = self.embedding.embed(query).await?;

        let filters = VectorFilters {
            source: params.source.clone(),
            sensitivity: params.sensitivity.clone(),
            date_from: params.date_from,
            date_to: params.date_to,
        };
        let over_fetch = limit * OVER_FETCH_FACTOR;

        let (content_hits, chunk_hits) = tokio::try_join!(
            self.vector.query(Collection::Content, &embedding, over_fetch, &filters),
            self.vector.query(Collection::Chunks, &embedding, over_fetch, &filters),
        )?;

        let fused = rrf::fuse(&[content_hits, chunk_hits], 60);
        let deduped = rrf::dedup_by_artifact(fused);
        let top: Vec<(VectorHit, f32)> = deduped.into_iter().take(limit).collect();

        let mut results = Vec::with_capacity(top.len());
        let mut seed_events: Vec<SemanticEvent> = Vec::new();
        let mut seen_artifacts = HashSet::new();

        for (hit, score) in &top {
            let content = if hit.chunk_index.is_some() {
                self.splice_neighbors(hit).await?
            } else {
                hit.text.clone()
            };

            let events = if params.include_events || params.expand {
                SemanticEvent::find_by_uid_rev(&self.db, &hit.artifact_uid, &hit.revision_id).await?
            } else {
                Vec::new()
            };

            if seen_artifacts.insert(hit.artifact_uid.clone()) {
                seed_events.extend(events.iter().take(GRAPH_SEED_LIMIT).cloned());
            }

            results.push(RecallHit {
                id: hit.id.clone(),
                artifact_uid: hit.artifact_uid.clone(),
                content,
                similarity: *score,
                source: None,
                sensitivity: None,
                events: params.include_events.then(|| events.iter().map(to_summary).collect()),
            });
        }

        seed_events.truncate(GRAPH_SEED_LIMIT);

        let related = if params.expand {
            match graph::expand(
                &self.db,
                &seed_events,
                params.graph_budget.clamp(1, 50),
                &params.graph_filters,
            )
            .await
            {
                Ok(expanded) => expanded
                    .into_iter()
                    .map(|e| RelatedHit {
                        id: e.event.artifact_uid.clone(),
                        reason: e.reason,
                        content: e.event.narrative.clone(),
                        events: params.include_events.then(|| vec![to_summary(&e.event)]),
                    })
                    .collect(),
                Err(e) => {
                    warn!(error = %e, "graph expansion failed, returning primary results only");
                    Vec::new()
                }
            }
        } else {
            Vec::new()
        };

        let entities = if params.include_entities {
            self.collect_entities(&seed_events).await?
        } else {
            Vec::new()
        };

        let total_count = results.len();
        Ok(RecallResult {
            results,
            related,
            entities,
            total_count,
            turns: None,
        })
    }

    async fn splice_neighbors(&self, hit: &VectorHit) -> Result<String, AppError> {
        let Some(chunk_index) = hit.chunk_index else {
            return Ok(hit.text.clone());
        };
        let siblings = self
            .vector
            .sibling_chunks(&hit.artifact_uid, &hit.revision_id, chunk_index)
            .await?;
        Ok(siblings
            .into_iter()
            .map(|c| c.text)
            .collect::<Vec<_>>()
            .join("\n[CHUNK BOUNDARY]\n"))
    }

    async fn collect_entities(&self, events: &[SemanticEvent]) -> Result<Vec<EntitySummary>, AppError> {
        let mut ids: Vec<String> = Vec::new();
        for event in events {
            ids.push(event.subject.subject_ref.clone());
            for actor in &event.actors {
                ids.push(actor.actor_ref.clone());
            }
        }
        ids.sort();
        ids.dedup();
        let entities = Entity::find_by_ids(&self.db, &ids).await?;
        Ok(entities
            .into_iter()
            .map(|e| EntitySummary {
                entity_id: e.id,
                canonical_name: e.canonical_name,
                entity_type: e.entity_type.as_str().to_string(),
            })
            .collect())
    }
}

fn to_summary(event: &SemanticEvent) -> EventSummary {
    EventSummary {
        event_id: event.id.clone(),
        category: event.category.as_str().to_string(),
        event_time: event.event_time,
        narrative: event.narrative.clone(),
        confidence: event.confidence,
    }
}
