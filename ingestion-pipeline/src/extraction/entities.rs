use common::{
    db::SurrealDbClient,
    embedding::EmbeddingClient,
    error::AppError,
    llm::LlmClient,
    model::{
        entity::{normalize_name, Entity},
        entity_alias::EntityAlias,
        entity_mention::EntityMention,
        semantic_event::EntityType,
    },
};
use serde::Deserialize;
use serde_json::json;

use super::complete_json_with_retry;

const CANDIDATE_LIMIT: usize = 5;
const MIN_CANDIDATE_SIMILARITY: f32 = 0.85;
const AUTO_ACCEPT_SIMILARITY: f32 = 0.95;
const DISAMBIGUATION_CONFIDENCE_THRESHOLD: f32 = 0.8;

#[derive(Debug, Deserialize)]
struct DisambiguationResult {
    match_entity_id: Option<String>,
    confidence: f32,
}

fn disambiguation_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "match_entity_id": { "type": ["string", "null"] },
            "confidence": { "type": "number" }
        },
        "required": ["match_entity_id", "confidence"],
        "additionalProperties": false
    })
}

/// Component 8's per-surface-form pipeline: exact match, embedding-nearest
/// candidates, LLM disambiguation, create-new.
pub struct EntityResolver<'a> {
    db: &'a SurrealDbClient,
    embedding: &'a EmbeddingClient,
    llm: &'a LlmClient,
}

pub struct ResolveInput<'a> {
    pub surface_form: &'a str,
    pub entity_type: EntityType,
    pub role: Option<&'a str>,
    pub organization: Option<&'a str>,
    pub email: Option<&'a str>,
    pub artifact_uid: &'a str,
    pub revision_id: &'a str,
    pub start_char: usize,
    pub end_char: usize,
}

impl<'a> EntityResolver<'a> {
    pub fn new(db: &'a SurrealDbClient, embedding: &'a EmbeddingClient, llm: &'a LlmClient) -> Self {
        Self { db, embedding, llm }
    }

    pub async fn resolve(&self, input: ResolveInput<'_>) -> Result<String, AppError> {
        let entity_id = self.resolve_inner(&input).await?;

        self.db
            .store_item(EntityMention::new(
                Some(entity_id.clone()),
                input.artifact_uid.to_string(),
                input.revision_id.to_string(),
                input.surface_form.to_string(),
                input.start_char,
                input.end_char,
            ))
            .await?;

        Ok(entity_id)
    }

    async fn resolve_inner(&self, input: &ResolveInput<'_>) -> Result<String, AppError> {
        let normalized = normalize_name(input.surface_form);

        // Step 1: exact match, first by canonical name then by alias.
        let exact = Entity::find_by_normalized_name(self.db, input.entity_type, &normalized).await?;
        if exact.len() == 1 {
            return Ok(exact[0].id.clone());
        }
        if exact.is_empty() {
            let alias_rows = EntityAlias::find_by_normalized_alias(self.db, &normalized).await?;
            if alias_rows.len() == 1 {
                return Ok(alias_rows[0].entity_id.clone());
            }
        }

        // Step 2: embedding-nearest candidates.
        let context = build_context_string(input);
        let embedding = self.embedding.embed(&context).await?;
        let candidates = Entity::vector_search(self.db, input.entity_type, &embedding, CANDIDATE_LIMIT)
            .await?
            .into_iter()
            .filter(|m| m.similarity >= MIN_CANDIDATE_SIMILARITY)
            .collect::<Vec<_>>();

        if let Some(best) = candidates.first() {
            if best.similarity >= AUTO_ACCEPT_SIMILARITY {
                return Ok(best.entity.id.clone());
            }
        }

        // Step 3: LLM disambiguation among remaining candidates.
        if !candidates.is_empty() {
            if let Some(entity_id) = self.disambiguate(&context, &candidates).await? {
                return Ok(entity_id);
            }
        }

        // Step 4: create new; flag for review if there was a near-miss
        // candidate that disambiguation failed to confirm.
        let needs_review = !candidates.is_empty();
        let mut entity = Entity::new(
            input.entity_type,
            input.surface_form.to_string(),
            input.role.map(str::to_string),
            input.organization.map(str::to_string),
            input.email.map(str::to_string),
            embedding,
            input.artifact_uid.to_string(),
            input.revision_id.to_string(),
        );
        entity.needs_review = needs_review;
        let entity_id = entity.id.clone();
        self.db.store_item(entity).await?;
        Ok(entity_id)
    }

    async fn disambiguate(
        &self,
        surface_context: &str,
        candidates: &[common::model::entity::EntityVectorMatch],
    ) -> Result<Option<String>, AppError> {
        let candidate_descriptions: Vec<_> = candidates
            .iter()
            .map(|c| {
                json!({
                    "entity_id": c.entity.id,
                    "canonical_name": c.entity.canonical_name,
                    "role": c.entity.role,
                    "organization": c.entity.organization,
                    "similarity": c.similarity,
                })
            })
            .collect();

        let user_message = format!(
            "Surface form context:\n{surface_context}\n\nCandidates:\n{}",
            serde_json::to_string(&candidate_descriptions).unwrap_or_default()
        );

        let parsed: DisambiguationResult = complete_json_with_retry(
            self.llm,
            "entity_disambiguation",
            "Decide whether the surface form refers to one of the candidate entities",
            disambiguation_schema(),
            "You disambiguate whether a newly seen surface form refers to an existing \
             entity. Respond with the candidate entity_id and your confidence, or null \
             if none match.",
            &user_message,
            "disambiguation response",
        )
        .await?;

        if parsed.confidence >= DISAMBIGUATION_CONFIDENCE_THRESHOLD {
            Ok(parsed.match_entity_id)
        } else {
            Ok(None)
        }
    }
}

fn build_context_string(input: &ResolveInput<'_>) -> String {
    format!(
        "{} | {} | {} | {} | {}",
        input.surface_form,
        input.entity_type.as_str(),
        input.role.unwrap_or(""),
        input.organization.unwrap_or(""),
        input.email.unwrap_or(""),
    )
}

