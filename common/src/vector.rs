use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{db::SurrealDbClient, error::AppError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collection {
    Content,
    Chunks,
}

impl Collection {
    fn table(self) -> &'static str {
        match self {
            Collection::Content => "content",
            Collection::Chunks => "chunks",
        }
    }
}

/// A row in the `content` collection: one per artifact revision, full text
/// for single-piece artifacts, empty text for chunked ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentRow {
    pub id: String,
    pub artifact_uid: String,
    pub revision_id: String,
    pub text: String,
    pub embedding: Vec<f32>,
    pub source: Option<String>,
    pub sensitivity: Option<String>,
    pub source_ts: Option<DateTime<Utc>>,
}

/// A row in the `chunks` collection: one per chunk of a chunked revision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRow {
    pub id: String,
    pub artifact_uid: String,
    pub revision_id: String,
    pub chunk_index: usize,
    pub start_char: usize,
    pub end_char: usize,
    pub text: String,
    pub embedding: Vec<f32>,
    pub source: Option<String>,
    pub sensitivity: Option<String>,
    pub source_ts: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct VectorFilters {
    pub source: Option<String>,
    pub sensitivity: Option<String>,
    pub date_from: Option<DateTime<Utc>>,
    pub date_to: Option<DateTime<Utc>>,
}

impl Default for VectorFilters {
    fn default() -> Self {
        Self {
            source: None,
            sensitivity: None,
            date_from: None,
            date_to: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VectorHit {
    pub id: String,
    pub artifact_uid: String,
    pub revision_id: String,
    pub text: String,
    pub chunk_index: Option<usize>,
    pub start_char: Option<usize>,
    pub end_char: Option<usize>,
    pub similarity: f32,
}

/// Vector store client: per-collection ANN index over caller-supplied
/// embeddings. SurrealDB's HNSW index backs both logical collections.
pub struct VectorStoreClient {
    db: Arc<SurrealDbClient>,
}

impl VectorStoreClient {
    pub fn new(db: Arc<SurrealDbClient>) -> Self {
        Self { db }
    }

    pub async fn insert_content(&self, row: ContentRow) -> Result<(), AppError> {
        self.db
            .client
            .query("CREATE type::thing('content', $id) CONTENT $row")
            .bind(("id", row.id.clone()))
            .bind(("row", row))
            .await?;
        Ok(())
    }

    pub async fn insert_chunk(&self, row: ChunkRow) -> Result<(), AppError> {
        self.db
            .client
            .query("CREATE type::thing('chunks', $id) CONTENT $row")
            .bind(("id", row.id.clone()))
            .bind(("row", row))
            .await?;
        Ok(())
    }

    pub async fn chunks_for_revision(
        &self,
        artifact_uid: &str,
        revision_id: &str,
    ) -> Result<Vec<ChunkRow>, AppError> {
        let mut response = self
            .db
            .client
            .query(
                "SELECT * FROM chunks WHERE artifact_uid = $uid AND revision_id = $rev ORDER BY chunk_index ASC",
            )
            .bind(("uid", artifact_uid.to_string()))
            .bind(("rev", revision_id.to_string()))
            .await?;
        Ok(response.take(0)?)
    }

    pub async fn content_for_revision(
        &self,
        artifact_uid: &str,
        revision_id: &str,
    ) -> Result<Option<ContentRow>, AppError> {
        let mut response = self
            .db
            .client
            .query("SELECT * FROM content WHERE artifact_uid = $uid AND revision_id = $rev LIMIT 1")
            .bind(("uid", artifact_uid.to_string()))
            .bind(("rev", revision_id.to_string()))
            .await?;
        let rows: Vec<ContentRow> = response.take(0)?;
        Ok(rows.into_iter().next())
    }

    /// Neighbor chunks at `chunk_index ± 1` for splicing into an expanded
    /// result (§4.6 step 7).
    pub async fn sibling_chunks(
        &self,
        artifact_uid: &str,
        revision_id: &str,
        chunk_index: usize,
    ) -> Result<Vec<ChunkRow>, AppError> {
        let lo = chunk_index.saturating_sub(1) as i64;
        let hi = chunk_index as i64 + 1;
        let mut response = self
            .db
            .client
            .query(
                "SELECT * FROM chunks
                 WHERE artifact_uid = $uid AND revision_id = $rev
                   AND chunk_index >= $lo AND chunk_index <= $hi
                 ORDER BY chunk_index ASC",
            )
            .bind(("uid", artifact_uid.to_string()))
            .bind(("rev", revision_id.to_string()))
            .bind(("lo", lo))
            .bind(("hi", hi))
            .await?;
        Ok(response.take(0)?)
    }

    pub async fn delete_by_artifact(&self, artifact_uid: &str) -> Result<(), AppError> {
        self.db
            .client
            .query(
                "DELETE content WHERE artifact_uid = $uid;
                 DELETE chunks WHERE artifact_uid = $uid;",
            )
            .bind(("uid", artifact_uid.to_string()))
            .await?;
        Ok(())
    }

    /// Nearest `limit` rows in `collection` to `embedding`, subject to
    /// `filters`. Used for the parallel multi-collection fan-out in recall.
    pub async fn query(
        &self,
        collection: Collection,
        embedding: &[f32],
        limit: usize,
        filters: &VectorFilters,
    ) -> Result<Vec<VectorHit>, AppError> {
        let table = collection.table();
        let mut conditions = vec![format!("embedding <|{limit},100|> $embedding")];
        if filters.source.is_some() {
            conditions.push("source = $source".to_string());
        }
        if filters.sensitivity.is_some() {
            conditions.push("sensitivity = $sensitivity".to_string());
        }
        if filters.date_from.is_some() {
            conditions.push("source_ts >= $date_from".to_string());
        }
        if filters.date_to.is_some() {
            conditions.push("source_ts <= $date_to".to_string());
        }

        let query_str = format!(
            "SELECT *, vector::similarity::cosine(embedding, $embedding) AS similarity
             FROM {table}
             WHERE {}
             ORDER BY similarity DESC
             LIMIT {limit}",
            conditions.join(" AND ")
        );

        let mut query = self.db.client.query(query_str).bind(("embedding", embedding.to_vec()));
        if let Some(source) = &filters.source {
            query = query.bind(("source", source.clone()));
        }
        if let Some(sensitivity) = &filters.sensitivity {
            query = query.bind(("sensitivity", sensitivity.clone()));
        }
        if let Some(date_from) = filters.date_from {
            query = query.bind(("date_from", date_from));
        }
        if let Some(date_to) = filters.date_to {
            query = query.bind(("date_to", date_to));
        }

        let mut response = query.await?;
        let rows: Vec<VectorHit> = response.take(0)?;
        Ok(rows)
    }
}
