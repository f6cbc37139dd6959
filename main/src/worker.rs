use std::sync::Arc;

use common::{
    config::get_config, db::SurrealDbClient, embedding::EmbeddingClient, llm::LlmClient,
    vector::VectorStoreClient,
};
use ingestion_pipeline::extraction::worker::ExtractionWorker;
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
    let llm = Arc::new(LlmClient::new(&config));

    let worker = ExtractionWorker::new(db, vector, embedding, llm, &config);
    worker.run_forever().await
}
