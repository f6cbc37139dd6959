mod cases;
mod judge;

use std::sync::Arc;

use common::{
    config::get_config, db::SurrealDbClient, embedding::EmbeddingClient, llm::LlmClient,
    vector::VectorStoreClient,
};
use ingestion_pipeline::coordinator::{IngestParams, IngestionCoordinator};
use retrieval_pipeline::service::{RecallParams, RetrievalService};
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();

    let config = get_config()?;

    let db = Arc::new(
        SurrealDbClient::new(
            &config.surrealdb_address,
            &config.surrealdb_username,
            &config.surrealdb_password,
            &config.surrealdb_namespace,
            &config.surrealdb_database,
        )
        .await?,
    );
    db.ensure_initialized(config.embedding_dimensions).await?;

    let vector = Arc::new(VectorStoreClient::new(db.clone()));
    let embedding = Arc::new(EmbeddingClient::new(&config));
    let llm = LlmClient::new(&config);

    let coordinator = IngestionCoordinator::new(db.clone(), vector.clone(), embedding.clone(), config.clone());
    let retrieval = RetrievalService::new(db.clone(), vector, embedding);

    let mut passed = 0;
    let mut total = 0;

    for case in cases::corpus() {
        total += 1;
        let outcome = coordinator
            .ingest(
                case.artifact_type,
                case.source_system,
                case.content,
                IngestParams::default(),
            )
            .await?;
        info!(case = case.name, artifact_uid = %outcome.artifact_uid, "ingested eval case");

        let result = retrieval
            .recall(RecallParams {
                query: Some(case.query.to_string()),
                limit: 5,
                include_events: true,
                ..Default::default()
            })
            .await?;

        let observed = serde_json::to_string_pretty(&result)?;
        let verdict = judge::judge(&llm, case.query, case.expected_outcome, &observed).await?;

        if verdict.pass {
            passed += 1;
            info!(case = case.name, "PASS: {}", verdict.reason);
        } else {
            warn!(case = case.name, "FAIL: {}", verdict.reason);
        }
    }

    println!("evaluations: {passed}/{total} cases passed");
    Ok(())
}
