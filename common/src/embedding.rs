use async_openai::types::CreateEmbeddingRequestArgs;
use tokio_retry::{
    strategy::{jitter, ExponentialBackoff},
    Retry,
};
use tracing::debug;

use crate::{config::AppConfig, error::AppError};

/// Single and batch embedding generation against the configured provider,
/// with exponential-backoff retry on transient transport errors.
pub struct EmbeddingClient {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
    dimensions: u32,
    retry_count: usize,
}

impl EmbeddingClient {
    pub fn new(config: &AppConfig) -> Self {
        let openai_config = async_openai::config::OpenAIConfig::new()
            .with_api_key(&config.openai_api_key)
            .with_api_base(&config.openai_base_url);
        Self {
            client: async_openai::Client::with_config(openai_config),
            model: config.embedding_model.clone(),
            dimensions: config.embedding_dimensions,
            retry_count: config.retry_count as usize,
        }
    }

    pub async fn embed(&self, input: &str) -> Result<Vec<f32>, AppError> {
        let strategy = ExponentialBackoff::from_millis(100)
            .max_delay(std::time::Duration::from_secs(5))
            .map(jitter)
            .take(self.retry_count);

        Retry::spawn(strategy, || self.embed_once(input)).await
    }

    async fn embed_once(&self, input: &str) -> Result<Vec<f32>, AppError> {
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .dimensions(self.dimensions)
            .input([input])
            .build()?;

        let response = self.client.embeddings().create(request).await?;

        let embedding = response
            .data
            .into_iter()
            .next()
            .ok_or_else(|| AppError::LlmParsing("no embedding data received".into()))?
            .embedding;

        debug!(dimensions = embedding.len(), "generated embedding");
        Ok(embedding)
    }

    /// Batches `inputs` in groups of at most 100 texts per the embedding
    /// provider's per-request bound (§6).
    pub async fn embed_batch(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, AppError> {
        const MAX_BATCH: usize = 100;
        let mut out = Vec::with_capacity(inputs.len());
        for batch in inputs.chunks(MAX_BATCH) {
            let strategy = ExponentialBackoff::from_millis(100)
                .max_delay(std::time::Duration::from_secs(5))
                .map(jitter)
                .take(self.retry_count);
            let embeddings = Retry::spawn(strategy, || self.embed_batch_once(batch)).await?;
            out.extend(embeddings);
        }
        Ok(out)
    }

    async fn embed_batch_once(&self, inputs: &[String]) -> Result<Vec<Vec<f32>>, AppError> {
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .dimensions(self.dimensions)
            .input(inputs.to_vec())
            .build()?;

        let response = self.client.embeddings().create(request).await?;
        Ok(response.data.into_iter().map(|d| d.embedding).collect())
    }
}
