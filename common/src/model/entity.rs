use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    db::SurrealDbClient, error::AppError, model::semantic_event::EntityType, store::StoredObject,
    stored_object,
};

stored_object!(Entity, "entity", {
    entity_type: EntityType,
    canonical_name: String,
    normalized_name: String,
    role: Option<String>,
    organization: Option<String>,
    email: Option<String>,
    context_embedding: Vec<f32>,
    first_seen_artifact_uid: String,
    first_seen_revision_id: String,
    needs_review: bool
});

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntityVectorMatch {
    pub entity: Entity,
    pub similarity: f32,
}

/// Lowercases and collapses whitespace for exact-match lookup, per the
/// entity resolution pipeline's first step.
pub fn normalize_name(name: &str) -> String {
    name.trim()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

impl Entity {
    pub fn new(
        entity_type: EntityType,
        canonical_name: String,
        role: Option<String>,
        organization: Option<String>,
        email: Option<String>,
        context_embedding: Vec<f32>,
        first_seen_artifact_uid: String,
        first_seen_revision_id: String,
    ) -> Self {
        let now = Utc::now();
        let normalized_name = normalize_name(&canonical_name);
        Self {
            id: crate::ids::uuid(),
            created_at: now,
            updated_at: now,
            entity_type,
            canonical_name,
            normalized_name,
            role,
            organization,
            email,
            context_embedding,
            first_seen_artifact_uid,
            first_seen_revision_id,
            needs_review: false,
        }
    }

    pub async fn find_by_normalized_name(
        db: &SurrealDbClient,
        entity_type: EntityType,
        normalized_name: &str,
    ) -> Result<Vec<Self>, AppError> {
        let mut response = db
            .client
            .query(
                "SELECT * FROM entity WHERE entity_type = $etype AND normalized_name = $name",
            )
            .bind(("etype", entity_type))
            .bind(("name", normalized_name.to_string()))
            .await?;
        Ok(response.take(0)?)
    }

    /// Up to `limit` nearest entities of the same type, by cosine
    /// similarity of `context_embedding`, sorted descending.
    pub async fn vector_search(
        db: &SurrealDbClient,
        entity_type: EntityType,
        embedding: &[f32],
        limit: usize,
    ) -> Result<Vec<EntityVectorMatch>, AppError> {
        #[derive(Deserialize)]
        struct Row {
            #[serde(flatten)]
            entity: Entity,
            similarity: f32,
        }

        let query = format!(
            "SELECT *, vector::similarity::cosine(context_embedding, $embedding) AS similarity
             FROM entity
             WHERE entity_type = $etype
               AND context_embedding <|{limit},100|> $embedding
             ORDER BY similarity DESC"
        );
        let mut response = db
            .client
            .query(query)
            .bind(("embedding", embedding.to_vec()))
            .bind(("etype", entity_type))
            .await?;
        let rows: Vec<Row> = response.take(0)?;
        Ok(rows
            .into_iter()
            .map(|r| EntityVectorMatch {
                entity: r.entity,
                similarity: r.similarity,
            })
            .collect())
    }

    pub async fn find_by_ids(db: &SurrealDbClient, ids: &[String]) -> Result<Vec<Self>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut response = db
            .client
            .query("SELECT * FROM entity WHERE id IN $ids")
            .bind(("ids", ids.to_vec()))
            .await?;
        Ok(response.take(0)?)
    }

    pub async fn set_needs_review(
        db: &SurrealDbClient,
        entity_id: &str,
        needs_review: bool,
    ) -> Result<(), AppError> {
        db.client
            .query("UPDATE type::thing('entity', $id) SET needs_review = $flag, updated_at = $now")
            .bind(("id", entity_id.to_string()))
            .bind(("flag", needs_review))
            .bind(("now", Utc::now()))
            .await?;
        Ok(())
    }

    pub async fn count(db: &SurrealDbClient) -> Result<usize, AppError> {
        #[derive(Deserialize)]
        struct CountRow {
            count: usize,
        }
        let mut response = db.client.query("SELECT count() FROM entity GROUP ALL").await?;
        let rows: Vec<CountRow> = response.take(0)?;
        Ok(rows.into_iter().next().map_or(0, |r| r.count))
    }
}
