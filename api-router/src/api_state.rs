use std::sync::Arc;

use common::{
    config::AppConfig, db::SurrealDbClient, embedding::EmbeddingClient,
    relational::RelationalStoreClient, vector::VectorStoreClient,
};
use ingestion_pipeline::coordinator::IngestionCoordinator;
use retrieval_pipeline::service::RetrievalService;

#[derive(Clone)]
pub struct ApiState {
    pub config: AppConfig,
    pub db: Arc<SurrealDbClient>,
    pub relational: Arc<RelationalStoreClient>,
    pub vector: Arc<VectorStoreClient>,
    pub coordinator: Arc<IngestionCoordinator>,
    pub retrieval: Arc<RetrievalService>,
}

impl ApiState {
    pub fn new(config: AppConfig, db: Arc<SurrealDbClient>) -> Self {
        let relational = Arc::new(RelationalStoreClient::new(db.clone()));
        let vector = Arc::new(VectorStoreClient::new(db.clone()));
        let embedding = Arc::new(EmbeddingClient::new(&config));

        let coordinator = Arc::new(IngestionCoordinator::new(
            db.clone(),
            vector.clone(),
            embedding.clone(),
            config.clone(),
        ));
        let retrieval = Arc::new(RetrievalService::new(db.clone(), vector.clone(), embedding));

        Self {
            config,
            db,
            relational,
            vector,
            coordinator,
            retrieval,
        }
    }
}
