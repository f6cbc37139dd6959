pub mod entities;
pub mod prompts;
pub mod worker;

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Utc};
use common::{
    db::SurrealDbClient,
    embedding::EmbeddingClient,
    error::AppError,
    ids,
    llm::LlmClient,
    model::{
        entity_alias::EntityAlias,
        entity_mention::EntityMention,
        event_actor::EventActor,
        event_evidence::EventEvidence,
        event_subject::EventSubjectRow,
        semantic_event::{EntityType, EventActorRef, EventCategory, EventSubject, SemanticEvent},
    },
    vector::VectorStoreClient,
};
use tracing::warn;

use self::{
    entities::{EntityResolver, ResolveInput},
    prompts::{
        prompt_a_schema, prompt_b_schema, user_message_for_canonicalization,
        user_message_for_chunk, PromptAResult, PromptBResult, RawEntityA, RawEventB,
        PROMPT_A_SYSTEM_MESSAGE, PROMPT_B_SYSTEM_MESSAGE,
    },
};

const MAX_QUOTE_WORDS: usize = 25;
const MAX_NARRATIVE_SENTENCES: usize = 2;

/// Truncates `slice` to at most `max_words` words, returning a byte-prefix
/// so the result stays a contiguous substring of `slice`.
fn truncate_words(slice: &str, max_words: usize) -> &str {
    let mut count = 0;
    let mut prev_was_space = true;
    for (i, ch) in slice.char_indices() {
        if ch.is_whitespace() {
            prev_was_space = true;
        } else {
            if prev_was_space {
                count += 1;
                if count > max_words {
                    return slice[..i].trim_end();
                }
            }
            prev_was_space = false;
        }
    }
    slice
}

/// Truncates `narrative` to at most `max_sentences` sentences (cut after the
/// `max_sentences`-th `.`/`!`/`?`), leaving shorter narratives untouched.
fn truncate_narrative(narrative: &str, max_sentences: usize) -> String {
    let mut count = 0;
    for (i, ch) in narrative.char_indices() {
        if matches!(ch, '.' | '!' | '?') {
            count += 1;
            if count == max_sentences {
                return narrative[..=i].trim().to_string();
            }
        }
    }
    narrative.trim().to_string()
}

/// Runs a strict-JSON completion and parses it as `T`, retrying the
/// completion once (not counted against the job's `max_attempts`) if the
/// response fails schema parsing. A second failure escalates to a
/// non-transient error so the job fails permanently rather than retrying
/// through the general backoff loop (§4.4/§7).
pub(crate) async fn complete_json_with_retry<T: serde::de::DeserializeOwned>(
    llm: &LlmClient,
    schema_name: &str,
    schema_description: &str,
    schema: serde_json::Value,
    system_message: &str,
    user_message: &str,
    context: &str,
) -> Result<T, AppError> {
    for attempt in 0..2 {
        let raw = llm
            .complete_json(
                schema_name,
                schema_description,
                schema.clone(),
                system_message,
                user_message,
            )
            .await?;
        match serde_json::from_str(&raw) {
            Ok(parsed) => return Ok(parsed),
            Err(e) => {
                warn!(attempt, context, error = %e, "llm response failed schema validation");
                if attempt == 1 {
                    return Err(AppError::Processing(format!(
                        "{context}: exhausted retry on schema validation failure: {e}"
                    )));
                }
            }
        }
    }
    Err(AppError::Processing(format!(
        "{context}: exhausted retry on schema validation failure"
    )))
}

pub struct ExtractionOutput {
    pub events: Vec<SemanticEvent>,
    pub evidence: Vec<EventEvidence>,
    pub actors: Vec<EventActor>,
    pub subjects: Vec<EventSubjectRow>,
}

/// Component 8: runs Prompt A over every chunk (or the whole artifact when
/// unchunked), canonicalizes with Prompt B, re-validates evidence offsets
/// against the source text, and resolves every actor/subject/entity
/// reference to a durable entity row.
pub struct ExtractionRunner {
    db: Arc<SurrealDbClient>,
    vector: Arc<VectorStoreClient>,
    embedding: Arc<EmbeddingClient>,
    llm: Arc<LlmClient>,
}

impl ExtractionRunner {
    pub fn new(
        db: Arc<SurrealDbClient>,
        vector: Arc<VectorStoreClient>,
        embedding: Arc<EmbeddingClient>,
        llm: Arc<LlmClient>,
    ) -> Self {
        Self {
            db,
            vector,
            embedding,
            llm,
        }
    }

    pub async fn run(
        &self,
        artifact_uid: &str,
        revision_id: &str,
        is_chunked: bool,
    ) -> Result<ExtractionOutput, AppError> {
        let texts = if is_chunked {
            self.vector
                .chunks_for_revision(artifact_uid, revision_id)
                .await?
                .into_iter()
                .map(|c| (Some(c.id), c.text))
                .collect::<Vec<_>>()
        } else {
            let content = self
                .vector
                .content_for_revision(artifact_uid, revision_id)
                .await?
                .ok_or_else(|| AppError::NotFound("content row for revision not found".into()))?;
            vec![(None, content.text)]
        };

        if texts.is_empty() {
            return Err(AppError::Processing(
                "no stored text found for revision".into(),
            ));
        }

        let mut per_chunk = Vec::with_capacity(texts.len());
        let mut chunk_text_by_id: HashMap<Option<String>, String> = HashMap::new();
        let mut raw_entities: Vec<(Option<String>, RawEntityA)> = Vec::new();
        for (chunk_id, text) in &texts {
            let parsed: PromptAResult = complete_json_with_retry(
                &self.llm,
                "chunk_extraction",
                "Extract entities and semantic events from a text chunk",
                prompt_a_schema(),
                PROMPT_A_SYSTEM_MESSAGE,
                &user_message_for_chunk(text),
                "prompt A response",
            )
            .await?;
            for entity in &parsed.entities {
                raw_entities.push((chunk_id.clone(), entity.clone()));
            }
            chunk_text_by_id.insert(chunk_id.clone(), text.clone());
            per_chunk.push((chunk_id.clone(), parsed));
        }

        let canonical_events: Vec<RawEventB> = if per_chunk.len() == 1 && is_chunked {
            // Single-chunk artifacts still benefit from no canonicalization pass.
            per_chunk
                .pop()
                .map(|(chunk_id, result)| {
                    result
                        .events
                        .into_iter()
                        .map(|e| RawEventB {
                            category: e.category,
                            subject: e.subject,
                            actors: e.actors,
                            event_time: e.event_time,
                            narrative: e.narrative,
                            confidence: e.confidence,
                            evidence: vec![prompts::RawEvidenceB {
                                quote: e.evidence.quote,
                                start_char: e.evidence.start_char,
                                end_char: e.evidence.end_char,
                                chunk_id: chunk_id.clone(),
                            }],
                        })
                        .collect()
                })
                .unwrap_or_default()
        } else if !is_chunked {
            per_chunk
                .pop()
                .map(|(_, result)| {
                    result
                        .events
                        .into_iter()
                        .map(|e| RawEventB {
                            category: e.category,
                            subject: e.subject,
                            actors: e.actors,
                            event_time: e.event_time,
                            narrative: e.narrative,
                            confidence: e.confidence,
                            evidence: vec![prompts::RawEvidenceB {
                                quote: e.evidence.quote,
                                start_char: e.evidence.start_char,
                                end_char: e.evidence.end_char,
                                chunk_id: None,
                            }],
                        })
                        .collect()
                })
                .unwrap_or_default()
        } else {
            let user_message = user_message_for_canonicalization(&per_chunk);
            let parsed: PromptBResult = complete_json_with_retry(
                &self.llm,
                "canonicalize_events",
                "Merge duplicate events extracted from different chunks of one document",
                prompt_b_schema(),
                PROMPT_B_SYSTEM_MESSAGE,
                &user_message,
                "prompt B response",
            )
            .await?;
            parsed.events
        };

        let resolver = EntityResolver::new(&self.db, &self.embedding, &self.llm);
        let extraction_run_id = ids::uuid();

        // Resolve Prompt A's entity list up front so its aliases land in
        // entity_alias even when the entity isn't referenced by any event.
        for (chunk_id, raw_entity) in &raw_entities {
            let entity_type: EntityType = raw_entity.entity_type.parse()?;
            let text_len = chunk_text_by_id
                .get(chunk_id)
                .map(String::len)
                .unwrap_or_default();
            let entity_id = resolver
                .resolve(ResolveInput {
                    surface_form: &raw_entity.name,
                    entity_type,
                    role: None,
                    organization: None,
                    email: None,
                    artifact_uid,
                    revision_id,
                    start_char: 0,
                    end_char: text_len,
                })
                .await?;
            for alias in &raw_entity.aliases {
                EntityAlias::upsert(&self.db, &entity_id, alias).await?;
            }
        }

        let mut events = Vec::new();
        let mut evidence_rows = Vec::new();
        let mut actor_rows = Vec::new();
        let mut subject_rows = Vec::new();

        for raw_event in canonical_events {
            let category = EventCategory::normalize(&raw_event.category);
            let subject_type: EntityType = raw_event.subject.subject_type.parse()?;

            // Re-validate each evidence span against the chunk/content text it
            // claims to come from; drop spans that don't survive the check
            // rather than trusting unverified LLM offsets (§4.4).
            let mut valid_evidence = Vec::new();
            for ev in &raw_event.evidence {
                let source_text = chunk_text_by_id.get(&ev.chunk_id).or_else(|| {
                    if chunk_text_by_id.len() == 1 {
                        chunk_text_by_id.values().next()
                    } else {
                        None
                    }
                });
                let Some(source_text) = source_text else {
                    warn!(chunk_id = ?ev.chunk_id, "evidence references unknown chunk, dropping");
                    continue;
                };
                let start = ev.start_char.max(0) as usize;
                let end = ev.end_char.max(0) as usize;
                if start >= end || end > source_text.len() {
                    warn!(start, end, "evidence offsets out of bounds, dropping");
                    continue;
                }
                if !source_text.is_char_boundary(start) || !source_text.is_char_boundary(end) {
                    warn!(start, end, "evidence offsets not on char boundary, dropping");
                    continue;
                }
                let source_slice = &source_text[start..end];
                if source_slice != ev.quote {
                    warn!(start, end, "evidence quote is not a substring of its source, dropping");
                    continue;
                }
                let truncated = truncate_words(source_slice, MAX_QUOTE_WORDS);
                let end = start + truncated.len();
                valid_evidence.push((ev.chunk_id.clone(), start, end, truncated.to_string()));
            }

            if valid_evidence.is_empty() {
                warn!("event has no surviving evidence, dropping event");
                continue;
            }

            let subject_entity_id = resolver
                .resolve(ResolveInput {
                    surface_form: &raw_event.subject.subject_ref,
                    entity_type: subject_type,
                    role: None,
                    organization: None,
                    email: None,
                    artifact_uid,
                    revision_id,
                    start_char: valid_evidence[0].1,
                    end_char: valid_evidence[0].2,
                })
                .await?;

            let mut actor_refs = Vec::new();
            let mut resolved_actors = Vec::new();
            for actor in &raw_event.actors {
                let role = actor.role.parse()?;
                let actor_entity_id = resolver
                    .resolve(ResolveInput {
                        surface_form: &actor.actor_ref,
                        entity_type: EntityType::Person,
                        role: Some(actor.role.as_str()),
                        organization: None,
                        email: None,
                        artifact_uid,
                        revision_id,
                        start_char: valid_evidence[0].1,
                        end_char: valid_evidence[0].2,
                    })
                    .await?;
                actor_refs.push(EventActorRef {
                    actor_ref: actor_entity_id.clone(),
                    role,
                });
                resolved_actors.push((actor_entity_id, role));
            }

            let event_time: Option<DateTime<Utc>> = raw_event
                .event_time
                .as_deref()
                .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
                .map(|d| d.with_timezone(&Utc));

            let now = Utc::now();
            let event_id = ids::event_id();
            let event = SemanticEvent {
                id: event_id.clone(),
                created_at: now,
                updated_at: now,
                artifact_uid: artifact_uid.to_string(),
                revision_id: revision_id.to_string(),
                category,
                event_time,
                narrative: truncate_narrative(&raw_event.narrative, MAX_NARRATIVE_SENTENCES),
                subject: EventSubject {
                    subject_type,
                    subject_ref: subject_entity_id.clone(),
                },
                actors: actor_refs,
                confidence: raw_event.confidence.clamp(0.0, 1.0),
                extraction_run_id: extraction_run_id.clone(),
            };

            for (chunk_id, start, end, quote) in valid_evidence {
                evidence_rows.push(EventEvidence {
                    id: ids::uuid(),
                    created_at: now,
                    updated_at: now,
                    event_id: event_id.clone(),
                    artifact_uid: artifact_uid.to_string(),
                    revision_id: revision_id.to_string(),
                    chunk_id,
                    start_char: start,
                    end_char: end,
                    quote,
                });
            }

            subject_rows.push(EventSubjectRow::new(event_id.clone(), subject_entity_id));
            for (actor_entity_id, role) in resolved_actors {
                actor_rows.push(EventActor::new(event_id.clone(), actor_entity_id, role));
            }

            events.push(event);
        }

        Ok(ExtractionOutput {
            events,
            evidence: evidence_rows,
            actors: actor_rows,
            subjects: subject_rows,
        })
    }
}

pub async fn reset_mentions_for_revision(
    db: &SurrealDbClient,
    artifact_uid: &str,
    revision_id: &str,
) -> Result<(), AppError> {
    EntityMention::delete_by_uid_rev(db, artifact_uid, revision_id).await
}
