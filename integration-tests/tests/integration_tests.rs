use std::sync::Arc;

use api_router::{api_routes_v1, api_state::ApiState};
use axum::http::StatusCode;
use axum_test::TestServer;
use common::{
    db::SurrealDbClient,
    embedding::EmbeddingClient,
    llm::LlmClient,
    vector::VectorStoreClient,
};
use ingestion_pipeline::extraction::worker::ExtractionWorker;
use serde_json::json;

mod test_utils;
use test_utils::{config_with_model_server, setup_test_db, spawn_mock_model_server};

/// Everything a test needs: the router under test plus the bits required
/// to drive the extraction worker against the same in-memory database.
struct Harness {
    server: TestServer,
    db: Arc<SurrealDbClient>,
    worker: ExtractionWorker,
    _model_server: tokio::task::JoinHandle<()>,
}

async fn harness() -> Harness {
    let db = setup_test_db().await;
    let (base_url, model_server) = spawn_mock_model_server().await;
    let config = config_with_model_server(&base_url);

    let api_state = ApiState::new(config.clone(), db.clone());
    let app = api_routes_v1(&api_state).with_state(api_state);
    let server = TestServer::new(app).expect("failed to start test server");

    let vector = Arc::new(VectorStoreClient::new(db.clone()));
    let embedding = Arc::new(EmbeddingClient::new(&config));
    let llm = Arc::new(LlmClient::new(&config));
    let worker = ExtractionWorker::new(db.clone(), vector, embedding, llm, &config);

    Harness {
        server,
        db,
        worker,
        _model_server: model_server,
    }
}

#[tokio::test]
async fn remember_then_recall_finds_the_stored_content() {
    let harness = harness().await;

    let remember = harness
        .server
        .post("/v1/remember")
        .json(&json!({
            "artifact_type": "note",
            "source_system": "eval",
            "content": "The pricing decision is freemium for launch."
        }))
        .await;
    remember.assert_status_ok();
    let body: serde_json::Value = remember.json();
    assert_eq!(body["status"], "stored");
    let artifact_uid = body["artifact_uid"].as_str().unwrap().to_string();

    let recall = harness
        .server
        .post("/v1/recall")
        .json(&json!({ "query": "pricing model", "limit": 5 }))
        .await;
    recall.assert_status_ok();
    let recall_body: serde_json::Value = recall.json();
    let results = recall_body["results"].as_array().unwrap();
    assert!(!results.is_empty());
    assert_eq!(results[0]["artifact_uid"], artifact_uid);
    assert!(results[0]["content"]
        .as_str()
        .unwrap()
        .contains("freemium"));
}

#[tokio::test]
async fn remembering_identical_content_twice_is_unchanged() {
    let harness = harness().await;
    let payload = json!({
        "artifact_type": "note",
        "source_system": "eval",
        "content": "Alice decided to use Postgres."
    });

    let first = harness.server.post("/v1/remember").json(&payload).await;
    first.assert_status_ok();
    let first_body: serde_json::Value = first.json();
    assert_eq!(first_body["status"], "stored");

    let second = harness.server.post("/v1/remember").json(&payload).await;
    second.assert_status_ok();
    let second_body: serde_json::Value = second.json();
    assert_eq!(second_body["status"], "unchanged");
    assert_eq!(second_body["artifact_uid"], first_body["artifact_uid"]);
    assert_eq!(second_body["revision_id"], first_body["revision_id"]);
}

#[tokio::test]
async fn status_reports_a_pending_job_until_the_worker_runs_it() {
    let harness = harness().await;

    let remember = harness
        .server
        .post("/v1/remember")
        .json(&json!({
            "artifact_type": "note",
            "source_system": "eval",
            "content": "Alice committed to ship the API by Friday."
        }))
        .await;
    remember.assert_status_ok();
    let artifact_id = remember.json::<serde_json::Value>()["artifact_id"]
        .as_str()
        .unwrap()
        .to_string();

    let status_before = harness
        .server
        .post("/v1/status")
        .json(&json!({ "artifact_id": artifact_id }))
        .await;
    status_before.assert_status_ok();
    assert_eq!(status_before.json::<serde_json::Value>()["job_status"], "PENDING");

    let claimed = harness.worker.tick().await.expect("worker tick failed");
    assert!(claimed);

    let status_after = harness
        .server
        .post("/v1/status")
        .json(&json!({ "artifact_id": artifact_id }))
        .await;
    status_after.assert_status_ok();
    assert_eq!(status_after.json::<serde_json::Value>()["job_status"], "COMPLETED");
}

#[tokio::test]
async fn extraction_produces_an_event_visible_through_recall() {
    let harness = harness().await;

    let remember = harness
        .server
        .post("/v1/remember")
        .json(&json!({
            "artifact_type": "note",
            "source_system": "eval",
            "content": "Alice committed to ship the API by Friday."
        }))
        .await;
    remember.assert_status_ok();
    let artifact_id = remember.json::<serde_json::Value>()["artifact_id"]
        .as_str()
        .unwrap()
        .to_string();

    assert!(harness.worker.tick().await.expect("worker tick failed"));

    let recall = harness
        .server
        .post("/v1/recall")
        .json(&json!({ "id": artifact_id, "include_events": true }))
        .await;
    recall.assert_status_ok();
    let recall_body: serde_json::Value = recall.json();
    let events = recall_body["results"][0]["events"].as_array().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0]["category"], "Commitment");
}

#[tokio::test]
async fn forget_requires_confirm() {
    let harness = harness().await;
    let remember = harness
        .server
        .post("/v1/remember")
        .json(&json!({
            "artifact_type": "note",
            "source_system": "eval",
            "content": "Ephemeral note."
        }))
        .await;
    let artifact_id = remember.json::<serde_json::Value>()["artifact_id"]
        .as_str()
        .unwrap()
        .to_string();

    let forget = harness
        .server
        .post("/v1/forget")
        .json(&json!({ "id": artifact_id }))
        .expect_failure()
        .await;
    assert_eq!(forget.status_code(), StatusCode::BAD_REQUEST);
    assert_eq!(
        forget.json::<serde_json::Value>()["error"]["code"],
        "VALIDATION_ERROR"
    );
}

#[tokio::test]
async fn forget_cascades_across_events_entities_and_vector_rows() {
    let harness = harness().await;

    let remember = harness
        .server
        .post("/v1/remember")
        .json(&json!({
            "artifact_type": "note",
            "source_system": "eval",
            "content": "Alice committed to ship the API by Friday."
        }))
        .await;
    let artifact_id = remember.json::<serde_json::Value>()["artifact_id"]
        .as_str()
        .unwrap()
        .to_string();

    assert!(harness.worker.tick().await.expect("worker tick failed"));

    let forget = harness
        .server
        .post("/v1/forget")
        .json(&json!({ "id": artifact_id, "confirm": true }))
        .await;
    forget.assert_status_ok();
    assert_eq!(forget.json::<serde_json::Value>()["deleted"], true);

    let recall_after = harness
        .server
        .post("/v1/recall")
        .json(&json!({ "id": artifact_id }))
        .expect_failure()
        .await;
    assert_eq!(recall_after.status_code(), StatusCode::NOT_FOUND);

    assert_eq!(
        common::model::semantic_event::SemanticEvent::count(&harness.db)
            .await
            .unwrap(),
        0
    );
    assert_eq!(
        common::model::artifact_revision::ArtifactRevision::count(&harness.db)
            .await
            .unwrap(),
        0
    );
}

#[tokio::test]
async fn bearer_token_is_enforced_when_configured() {
    let db = setup_test_db().await;
    let (base_url, _model_server) = spawn_mock_model_server().await;
    let mut config = config_with_model_server(&base_url);
    config.api_auth_token = Some("secret-token".to_string());

    let api_state = ApiState::new(config, db);
    let app = api_routes_v1(&api_state).with_state(api_state);
    let server = TestServer::new(app).expect("failed to start test server");

    let unauthorized = server
        .post("/v1/status")
        .json(&json!({}))
        .expect_failure()
        .await;
    assert_eq!(unauthorized.status_code(), StatusCode::BAD_REQUEST);

    let authorized = server
        .post("/v1/status")
        .authorization_bearer("secret-token")
        .json(&json!({}))
        .await;
    authorized.assert_status_ok();
}
