use std::{ops::Deref, sync::Arc};

use futures::Stream;
use surrealdb::{
    engine::any::{connect, Any},
    opt::auth::Root,
    Notification, Surreal,
};

use crate::store::StoredObject;

/// Thin wrapper around the SurrealDB connection. SurrealDB backs both the
/// relational store and the vector store in this deployment: one physical
/// connection, two logical clients built on top of it
/// ([`crate::relational::RelationalStoreClient`] and
/// [`crate::vector::VectorStoreClient`]).
#[derive(Clone)]
pub struct SurrealDbClient {
    pub client: Surreal<Any>,
}

pub trait ProvidesDb {
    fn db(&self) -> &Arc<SurrealDbClient>;
}

impl SurrealDbClient {
    pub async fn new(
        address: &str,
        username: &str,
        password: &str,
        namespace: &str,
        database: &str,
    ) -> Result<Self, surrealdb::Error> {
        let db = connect(address).await?;
        db.signin(Root { username, password }).await?;
        db.use_ns(namespace).use_db(database).await?;
        Ok(SurrealDbClient { client: db })
    }

    /// Defines every table/index this system reads and writes. Safe to call
    /// repeatedly: `DEFINE ... IF NOT EXISTS` makes it idempotent across
    /// restarts, which is how the relational-store side of a fresh
    /// deployment bootstraps itself with no separate migration tool.
    pub async fn ensure_initialized(&self, embedding_dimensions: u32) -> Result<(), surrealdb::Error> {
        self.build_indexes(embedding_dimensions).await
    }

    pub async fn build_indexes(&self, embedding_dimensions: u32) -> Result<(), surrealdb::Error> {
        self.client
            .query(
                "DEFINE TABLE IF NOT EXISTS artifact_revision SCHEMALESS;
                 DEFINE INDEX IF NOT EXISTS idx_artifact_latest ON artifact_revision FIELDS artifact_uid, is_latest;
                 DEFINE INDEX IF NOT EXISTS idx_artifact_rev ON artifact_revision FIELDS artifact_uid, revision_id UNIQUE;

                 DEFINE TABLE IF NOT EXISTS event_jobs SCHEMALESS;
                 DEFINE INDEX IF NOT EXISTS idx_job_unique ON event_jobs FIELDS artifact_uid, revision_id, job_type UNIQUE;
                 DEFINE INDEX IF NOT EXISTS idx_job_pending ON event_jobs FIELDS status, next_run_at;

                 DEFINE TABLE IF NOT EXISTS semantic_event SCHEMALESS;
                 DEFINE INDEX IF NOT EXISTS idx_event_revision ON semantic_event FIELDS artifact_uid, revision_id;
                 DEFINE INDEX IF NOT EXISTS idx_event_category_time ON semantic_event FIELDS category, event_time;
                 DEFINE ANALYZER IF NOT EXISTS narrative_analyzer TOKENIZERS blank,class FILTERS lowercase,snowball(english);
                 DEFINE INDEX IF NOT EXISTS idx_event_narrative ON semantic_event FIELDS narrative SEARCH ANALYZER narrative_analyzer BM25;

                 DEFINE TABLE IF NOT EXISTS event_evidence SCHEMALESS;
                 DEFINE INDEX IF NOT EXISTS idx_evidence_event ON event_evidence FIELDS event_id;
                 DEFINE INDEX IF NOT EXISTS idx_evidence_revision ON event_evidence FIELDS artifact_uid, revision_id;

                 DEFINE TABLE IF NOT EXISTS entity SCHEMALESS;
                 DEFINE INDEX IF NOT EXISTS idx_entity_normalized ON entity FIELDS entity_type, normalized_name;

                 DEFINE TABLE IF NOT EXISTS entity_alias SCHEMALESS;
                 DEFINE INDEX IF NOT EXISTS idx_alias_unique ON entity_alias FIELDS entity_id, normalized_alias UNIQUE;

                 DEFINE TABLE IF NOT EXISTS entity_mention SCHEMALESS;
                 DEFINE INDEX IF NOT EXISTS idx_mention_revision ON entity_mention FIELDS artifact_uid, revision_id;

                 DEFINE TABLE IF NOT EXISTS event_actor SCHEMALESS;
                 DEFINE INDEX IF NOT EXISTS idx_actor_pk ON event_actor FIELDS event_id, entity_id UNIQUE;
                 DEFINE INDEX IF NOT EXISTS idx_actor_entity ON event_actor FIELDS entity_id;

                 DEFINE TABLE IF NOT EXISTS event_subject SCHEMALESS;
                 DEFINE INDEX IF NOT EXISTS idx_subject_pk ON event_subject FIELDS event_id, entity_id UNIQUE;
                 DEFINE INDEX IF NOT EXISTS idx_subject_entity ON event_subject FIELDS entity_id;

                 DEFINE TABLE IF NOT EXISTS content SCHEMALESS;
                 DEFINE TABLE IF NOT EXISTS chunks SCHEMALESS;
                 DEFINE INDEX IF NOT EXISTS idx_chunks_artifact ON chunks FIELDS artifact_uid, revision_id, chunk_index;",
            )
            .await?;

        let vector_indexes = format!(
            "DEFINE INDEX IF NOT EXISTS idx_content_embedding ON content FIELDS embedding HNSW DIMENSION {embedding_dimensions} DIST COSINE;
             DEFINE INDEX IF NOT EXISTS idx_chunks_embedding ON chunks FIELDS embedding HNSW DIMENSION {embedding_dimensions} DIST COSINE;
             DEFINE INDEX IF NOT EXISTS idx_entity_embedding ON entity FIELDS context_embedding HNSW DIMENSION {embedding_dimensions} DIST COSINE;"
        );
        self.client.query(vector_indexes).await?;

        Ok(())
    }

    pub async fn rebuild_indexes(&self) -> Result<(), surrealdb::Error> {
        self.client
            .query(
                "REBUILD INDEX IF EXISTS idx_content_embedding ON content;
                 REBUILD INDEX IF EXISTS idx_chunks_embedding ON chunks;
                 REBUILD INDEX IF EXISTS idx_entity_embedding ON entity;",
            )
            .await?;
        Ok(())
    }

    pub async fn store_item<T>(&self, item: T) -> Result<Option<T>, surrealdb::Error>
    where
        T: StoredObject + Send + Sync + 'static,
    {
        self.client
            .create((T::table_name(), item.get_id()))
            .content(item)
            .await
    }

    pub async fn get_item<T>(&self, id: &str) -> Result<Option<T>, surrealdb::Error>
    where
        T: for<'de> StoredObject,
    {
        self.client.select((T::table_name(), id)).await
    }

    pub async fn delete_item<T>(&self, id: &str) -> Result<Option<T>, surrealdb::Error>
    where
        T: for<'de> StoredObject,
    {
        self.client.delete((T::table_name(), id)).await
    }

    pub async fn listen<T>(
        &self,
    ) -> Result<impl Stream<Item = Result<Notification<T>, surrealdb::Error>>, surrealdb::Error>
    where
        T: for<'de> StoredObject + std::marker::Unpin,
    {
        self.client.select(T::table_name()).live().await
    }
}

impl Deref for SurrealDbClient {
    type Target = Surreal<Any>;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl SurrealDbClient {
    /// Creates an in-memory SurrealDB client for testing.
    pub async fn memory(namespace: &str, database: &str) -> Result<Self, surrealdb::Error> {
        let db = connect("mem://").await?;
        db.use_ns(namespace).use_db(database).await?;
        Ok(SurrealDbClient { client: db })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stored_object;
    use uuid::Uuid;

    stored_object!(Dummy, "dummy", {
        name: String
    });

    #[tokio::test]
    async fn initializes_and_round_trips_an_item() {
        let namespace = "test_ns";
        let database = &Uuid::new_v4().to_string();
        let db = SurrealDbClient::memory(namespace, database)
            .await
            .expect("failed to start in-memory surrealdb");

        db.ensure_initialized(8)
            .await
            .expect("failed to initialize schema");

        let dummy = Dummy {
            id: "abc".to_string(),
            name: "first".to_string(),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        };

        let stored = db.store_item(dummy.clone()).await.expect("store failed");
        assert!(stored.is_some());

        let fetched = db
            .get_item::<Dummy>(&dummy.id)
            .await
            .expect("fetch failed");
        assert_eq!(fetched, Some(dummy.clone()));

        let deleted = db
            .delete_item::<Dummy>(&dummy.id)
            .await
            .expect("delete failed");
        assert_eq!(deleted, Some(dummy));
    }

    #[tokio::test]
    async fn build_indexes_is_idempotent() {
        let db = SurrealDbClient::memory("test_ns", &Uuid::new_v4().to_string())
            .await
            .expect("failed to start in-memory surrealdb");

        db.build_indexes(8).await.expect("first build failed");
        db.build_indexes(8).await.expect("second build failed");
    }
}
