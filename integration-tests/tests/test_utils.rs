use std::sync::Arc;

use common::{config::testing::test_config, db::SurrealDbClient};
use uuid::Uuid;

/// Fresh in-memory database with the full schema applied, isolated per test
/// by a random database name under a shared namespace.
pub async fn setup_test_db() -> Arc<SurrealDbClient> {
    let namespace = "test_ns";
    let database = Uuid::new_v4().to_string();

    let db = SurrealDbClient::memory(namespace, &database)
        .await
        .expect("failed to start in-memory surrealdb");
    db.ensure_initialized(8)
        .await
        .expect("failed to initialize schema");

    Arc::new(db)
}

/// An `AppConfig` pointed at `base_url` instead of a real LLM/embedding
/// provider, so ingestion and extraction exercise their full code paths
/// against [`spawn_mock_model_server`] instead of the network.
pub fn config_with_model_server(base_url: &str) -> common::config::AppConfig {
    common::config::AppConfig {
        openai_base_url: base_url.to_string(),
        ..test_config()
    }
}

/// A canned entity/event extraction response shaped like [Prompt
/// A](ingestion_pipeline::coordinator), used by every test that exercises
/// the extraction worker rather than asserting on a specific document.
pub fn canned_chunk_extraction_response() -> serde_json::Value {
    serde_json::json!({
        "entities": [
            { "name": "Alice", "type": "person", "aliases": [] }
        ],
        "events": [
            {
                "category": "commitment",
                "subject": { "type": "person", "ref": "Alice" },
                "actors": [ { "ref": "Alice", "role": "owner" } ],
                "event_time": null,
                "narrative": "Alice committed to ship the API by Friday.",
                "evidence": {
                    "quote": "Alice committed to ship the API by Friday.",
                    "start_char": 0,
                    "end_char": 43
                },
                "confidence": 0.9
            }
        ]
    })
}

/// Starts a local OpenAI-compatible HTTP server standing in for both the
/// chat-completions and embeddings endpoints, bound to an ephemeral port.
/// Returns the base URL to hand to [`config_with_model_server`] and the
/// task the server runs on, which is dropped (and the server with it) at
/// the end of the test.
pub async fn spawn_mock_model_server() -> (String, tokio::task::JoinHandle<()>) {
    use axum::{routing::post, Json, Router};
    use serde_json::Value;

    async fn chat_completions(Json(body): Json<Value>) -> Json<Value> {
        let schema_name = body
            .get("response_format")
            .and_then(|f| f.get("json_schema"))
            .and_then(|s| s.get("name"))
            .and_then(|n| n.as_str())
            .unwrap_or_default();

        let content = match schema_name {
            "chunk_extraction" => canned_chunk_extraction_response(),
            "canonicalize_events" => serde_json::json!({ "events": [] }),
            "entity_disambiguation" => serde_json::json!({ "match_entity_id": null, "confidence": 0.0 }),
            _ => serde_json::json!({}),
        };

        Json(serde_json::json!({
            "id": "chatcmpl-mock",
            "object": "chat.completion",
            "created": 0,
            "model": "gpt-4o-mini",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": content.to_string(),
                    "refusal": null
                },
                "finish_reason": "stop",
                "logprobs": null
            }],
            "usage": { "prompt_tokens": 0, "completion_tokens": 0, "total_tokens": 0 }
        }))
    }

    async fn embeddings(Json(body): Json<Value>) -> Json<Value> {
        let dimensions = body
            .get("dimensions")
            .and_then(serde_json::Value::as_u64)
            .unwrap_or(8) as usize;
        let input_count = body
            .get("input")
            .and_then(|i| i.as_array())
            .map(Vec::len)
            .unwrap_or(1);

        let data: Vec<Value> = (0..input_count)
            .map(|index| {
                serde_json::json!({
                    "object": "embedding",
                    "index": index,
                    "embedding": vec![0.1_f32; dimensions]
                })
            })
            .collect();

        Json(serde_json::json!({
            "object": "list",
            "data": data,
            "model": "text-embedding-3-large",
            "usage": { "prompt_tokens": 0, "total_tokens": 0 }
        }))
    }

    let app = Router::new()
        .route("/v1/chat/completions", post(chat_completions))
        .route("/v1/embeddings", post(embeddings));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind mock model server");
    let addr = listener.local_addr().expect("failed to read local addr");

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    (format!("http://{addr}/v1"), handle)
}
