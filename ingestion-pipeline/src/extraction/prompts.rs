use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub static PROMPT_A_SYSTEM_MESSAGE: &str = "You are a precise information extraction system. \
Given a chunk of text, extract named entities and structured semantic events. \
Only report facts directly supported by the text. Evidence character offsets are relative \
to the chunk text provided. Quotes must be at most 25 words.";

pub static PROMPT_B_SYSTEM_MESSAGE: &str = "You canonicalize semantic events extracted \
independently from chunks of the same document. Merge events only when they describe the \
same occurrence; when in doubt, keep them separate. Each canonical event keeps the evidence \
entries from every chunk that supported it, retaining each evidence's chunk_id and offsets.";

pub fn prompt_a_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "entities": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "type": { "type": "string" },
                        "aliases": { "type": "array", "items": { "type": "string" } }
                    },
                    "required": ["name", "type", "aliases"],
                    "additionalProperties": false
                }
            },
            "events": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "category": { "type": "string" },
                        "subject": {
                            "type": "object",
                            "properties": {
                                "type": { "type": "string" },
                                "ref": { "type": "string" }
                            },
                            "required": ["type", "ref"],
                            "additionalProperties": false
                        },
                        "actors": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "properties": {
                                    "ref": { "type": "string" },
                                    "role": { "type": "string" }
                                },
                                "required": ["ref", "role"],
                                "additionalProperties": false
                            }
                        },
                        "event_time": { "type": ["string", "null"] },
                        "narrative": { "type": "string" },
                        "evidence": {
                            "type": "object",
                            "properties": {
                                "quote": { "type": "string" },
                                "start_char": { "type": "integer" },
                                "end_char": { "type": "integer" }
                            },
                            "required": ["quote", "start_char", "end_char"],
                            "additionalProperties": false
                        },
                        "confidence": { "type": "number" }
                    },
                    "required": ["category", "subject", "actors", "event_time", "narrative", "evidence", "confidence"],
                    "additionalProperties": false
                }
            }
        },
        "required": ["entities", "events"],
        "additionalProperties": false
    })
}

pub fn prompt_b_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "events": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "category": { "type": "string" },
                        "subject": {
                            "type": "object",
                            "properties": {
                                "type": { "type": "string" },
                                "ref": { "type": "string" }
                            },
                            "required": ["type", "ref"],
                            "additionalProperties": false
                        },
                        "actors": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "properties": {
                                    "ref": { "type": "string" },
                                    "role": { "type": "string" }
                                },
                                "required": ["ref", "role"],
                                "additionalProperties": false
                            }
                        },
                        "event_time": { "type": ["string", "null"] },
                        "narrative": { "type": "string" },
                        "confidence": { "type": "number" },
                        "evidence": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "properties": {
                                    "quote": { "type": "string" },
                                    "start_char": { "type": "integer" },
                                    "end_char": { "type": "integer" },
                                    "chunk_id": { "type": ["string", "null"] }
                                },
                                "required": ["quote", "start_char", "end_char", "chunk_id"],
                                "additionalProperties": false
                            }
                        }
                    },
                    "required": ["category", "subject", "actors", "event_time", "narrative", "confidence", "evidence"],
                    "additionalProperties": false
                }
            }
        },
        "required": ["events"],
        "additionalProperties": false
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSubject {
    #[serde(rename = "type")]
    pub subject_type: String,
    #[serde(rename = "ref")]
    pub subject_ref: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawActor {
    #[serde(rename = "ref")]
    pub actor_ref: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEvidenceA {
    pub quote: String,
    pub start_char: i64,
    pub end_char: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEventA {
    pub category: String,
    pub subject: RawSubject,
    pub actors: Vec<RawActor>,
    pub event_time: Option<String>,
    pub narrative: String,
    pub evidence: RawEvidenceA,
    pub confidence: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEntityA {
    pub name: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub aliases: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptAResult {
    pub entities: Vec<RawEntityA>,
    pub events: Vec<RawEventA>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEvidenceB {
    pub quote: String,
    pub start_char: i64,
    pub end_char: i64,
    pub chunk_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEventB {
    pub category: String,
    pub subject: RawSubject,
    pub actors: Vec<RawActor>,
    pub event_time: Option<String>,
    pub narrative: String,
    pub confidence: f32,
    pub evidence: Vec<RawEvidenceB>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptBResult {
    pub events: Vec<RawEventB>,
}

pub fn user_message_for_chunk(chunk_text: &str) -> String {
    format!("Chunk text:\n{chunk_text}")
}

pub fn user_message_for_canonicalization(per_chunk_results: &[(Option<String>, PromptAResult)]) -> String {
    let payload: Vec<Value> = per_chunk_results
        .iter()
        .map(|(chunk_id, result)| {
            json!({
                "chunk_id": chunk_id,
                "entities": result.entities,
                "events": result.events,
            })
        })
        .collect();
    serde_json::to_string(&payload).unwrap_or_default()
}
