use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::{
    config::AppConfig,
    db::SurrealDbClient,
    embedding::EmbeddingClient,
    error::AppError,
    ids,
    model::{artifact_revision::{ArtifactRevision, ArtifactType}, event_job::EventJob},
    tokenizer,
    vector::{ChunkRow, ContentRow, VectorStoreClient},
};
use tracing::info;

use crate::chunking::chunk_text;

#[derive(Debug, Clone, Default)]
pub struct IngestParams {
    pub source_id: Option<String>,
    pub source_ts: Option<DateTime<Utc>>,
    pub sensitivity: Option<String>,
    pub visibility_scope: Option<String>,
    pub retention_policy: Option<String>,
    pub conversation_id: Option<String>,
    pub role: Option<String>,
    pub turn_index: Option<i64>,
}

const SHORT_TURN_TOKEN_LIMIT: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub enum IngestStatus {
    Stored,
    Unchanged,
}

#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub artifact_id: String,
    pub artifact_uid: String,
    pub revision_id: String,
    pub is_chunked: bool,
    pub chunk_count: usize,
    pub job_id: Option<String>,
    pub status: IngestStatus,
}

const MAX_CONTENT_BYTES: usize = 10 * 1024 * 1024;

/// Component 7: content-hash identity, duplicate detection, chunk
/// generation, vector write, relational revision write, job enqueue.
pub struct IngestionCoordinator {
    db: Arc<SurrealDbClient>,
    vector: Arc<VectorStoreClient>,
    embedding: Arc<EmbeddingClient>,
    config: AppConfig,
}

impl IngestionCoordinator {
    pub fn new(
        db: Arc<SurrealDbClient>,
        vector: Arc<VectorStoreClient>,
        embedding: Arc<EmbeddingClient>,
        config: AppConfig,
    ) -> Self {
        Self {
            db,
            vector,
            embedding,
            config,
        }
    }

    pub async fn ingest(
        &self,
        artifact_type: &str,
        source_system: &str,
        content: &str,
        params: IngestParams,
    ) -> Result<IngestOutcome, AppError> {
        let artifact_type: ArtifactType = artifact_type.parse()?;

        if content.is_empty() {
            return Err(AppError::Validation("content must not be empty".into()));
        }
        if content.len() > MAX_CONTENT_BYTES {
            return Err(AppError::Validation(
                "content exceeds the 10 MB ingestion limit".into(),
            ));
        }

        let artifact_uid = ids::artifact_uid(source_system, params.source_id.as_deref());
        let revision_id = ids::revision_id(content);
        let artifact_id = ids::artifact_id(content);

        if let Some(_existing) =
            ArtifactRevision::find_by_uid_rev(&self.db, &artifact_uid, &revision_id).await?
        {
            let existing_job = EventJob::find_by_uid_rev(&self.db, &artifact_uid, &revision_id).await?;
            return Ok(IngestOutcome {
                artifact_id,
                artifact_uid,
                revision_id,
                is_chunked: _existing.is_chunked,
                chunk_count: _existing.chunk_count,
                job_id: existing_job.map(|j| j.id),
                status: IngestStatus::Unchanged,
            });
        }

        let token_count = tokenizer::token_count(content)?;
        let is_chunked = token_count > self.config.single_piece_max;

        let chunks = if is_chunked {
            chunk_text(
                content,
                &artifact_id,
                self.config.chunk_target,
                self.config.chunk_overlap,
            )?
        } else {
            Vec::new()
        };

        // Step 5: embed everything before any write so a failure here
        // leaves both stores untouched.
        let content_embedding;
        let mut chunk_embeddings = Vec::new();
        if is_chunked {
            content_embedding = None;
            let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
            chunk_embeddings = self.embedding.embed_batch(&texts).await?;
        } else {
            content_embedding = Some(self.embedding.embed(content).await?);
        }

        // Step 6: vector store writes.
        let content_row = ContentRow {
            id: artifact_id.clone(),
            artifact_uid: artifact_uid.clone(),
            revision_id: revision_id.clone(),
            text: if is_chunked { String::new() } else { content.to_string() },
            embedding: content_embedding.unwrap_or_default(),
            source: Some(source_system.to_string()),
            sensitivity: params.sensitivity.clone(),
            source_ts: params.source_ts,
        };
        self.vector.insert_content(content_row).await?;

        for (chunk, embedding) in chunks.iter().zip(chunk_embeddings.into_iter()) {
            let row = ChunkRow {
                id: chunk.chunk_id.clone(),
                artifact_uid: artifact_uid.clone(),
                revision_id: revision_id.clone(),
                chunk_index: chunk.chunk_index,
                start_char: chunk.start_char,
                end_char: chunk.end_char,
                text: chunk.content.clone(),
                embedding,
                source: Some(source_system.to_string()),
                sensitivity: params.sensitivity.clone(),
                source_ts: params.source_ts,
            };
            self.vector.insert_chunk(row).await?;
        }

        // Step 7: relational transaction (demote previous latest + insert).
        let now = Utc::now();
        let revision = ArtifactRevision {
            id: revision_id.clone(),
            created_at: now,
            updated_at: now,
            artifact_uid: artifact_uid.clone(),
            revision_id: revision_id.clone(),
            artifact_id: artifact_id.clone(),
            artifact_type,
            source_system: source_system.to_string(),
            source_id: params.source_id.clone(),
            source_ts: params.source_ts,
            content_hash: revision_id.clone(),
            token_count,
            is_chunked,
            chunk_count: chunks.len(),
            sensitivity: params.sensitivity,
            visibility_scope: params.visibility_scope,
            retention_policy: params.retention_policy,
            is_latest: true,
            ingested_at: now,
            conversation_id: params.conversation_id,
            role: params.role.clone(),
            turn_index: params.turn_index,
        };
        ArtifactRevision::demote_and_insert(&self.db, revision).await?;

        // Short conversation turns are cheap, high-volume, and rarely carry
        // extractable events on their own; skip the job instead of flooding
        // the queue (§4.9's remember optimization path).
        let is_short_turn = token_count < SHORT_TURN_TOKEN_LIMIT
            && params.role.is_some()
            && params.turn_index.is_some();

        let job_id = if is_short_turn {
            None
        } else {
            EventJob::enqueue(
                &self.db,
                &artifact_uid,
                &revision_id,
                self.config.event_max_attempts,
            )
            .await?
        };

        info!(artifact_uid, revision_id, is_chunked, "ingested artifact");

        Ok(IngestOutcome {
            artifact_id,
            artifact_uid,
            revision_id,
            is_chunked,
            chunk_count: chunks.len(),
            job_id,
            status: IngestStatus::Stored,
        })
    }
}
