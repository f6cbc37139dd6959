use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_embedding_model() -> String {
    "text-embedding-3-large".to_string()
}

fn default_embedding_dimensions() -> u32 {
    3072
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_embedding_timeout_secs() -> u64 {
    30
}

fn default_llm_timeout_secs() -> u64 {
    120
}

fn default_retry_count() -> u32 {
    3
}

fn default_embedding_batch_size() -> usize {
    100
}

fn default_single_piece_max() -> usize {
    1200
}

fn default_chunk_target() -> usize {
    900
}

fn default_chunk_overlap() -> usize {
    100
}

fn default_worker_id() -> String {
    "worker-1".to_string()
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_event_max_attempts() -> u32 {
    5
}

fn default_http_port() -> u16 {
    8080
}

fn default_rrf_k() -> u32 {
    60
}

/// Process configuration, loaded once at start and shared behind `Arc`.
#[derive(Clone, Deserialize, Debug)]
pub struct AppConfig {
    pub openai_api_key: String,
    #[serde(default = "default_base_url")]
    pub openai_base_url: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
    #[serde(default = "default_embedding_dimensions")]
    pub embedding_dimensions: u32,
    #[serde(default = "default_llm_model")]
    pub llm_model: String,
    #[serde(default = "default_embedding_timeout_secs")]
    pub embedding_timeout_secs: u64,
    #[serde(default = "default_llm_timeout_secs")]
    pub llm_timeout_secs: u64,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_embedding_batch_size")]
    pub embedding_batch_size: usize,

    #[serde(default = "default_single_piece_max")]
    pub single_piece_max: usize,
    #[serde(default = "default_chunk_target")]
    pub chunk_target: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    pub surrealdb_address: String,
    pub surrealdb_username: String,
    pub surrealdb_password: String,
    pub surrealdb_namespace: String,
    pub surrealdb_database: String,

    #[serde(default = "default_worker_id")]
    pub worker_id: String,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_event_max_attempts")]
    pub event_max_attempts: u32,

    #[serde(default = "default_http_port")]
    pub http_port: u16,
    #[serde(default)]
    pub api_auth_token: Option<String>,

    #[serde(default = "default_rrf_k")]
    pub rrf_k: u32,

    #[serde(default)]
    pub ingest_max_body_bytes: Option<usize>,
}

/// Loads configuration from `config.{toml,json,...}` (if present) layered
/// under environment variables, mirroring how every other ambient concern
/// in this workspace prefers the `config` crate over hand-rolled env parsing.
pub fn get_config() -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::with_name("config").required(false))
        .add_source(Environment::default())
        .build()?;

    config.try_deserialize()
}

#[cfg(any(test, feature = "test-utils"))]
pub mod testing {
    use super::AppConfig;

    /// An `AppConfig` suitable for unit/integration tests: points at no real
    /// network services, only at the in-memory SurrealDB engine.
    pub fn test_config() -> AppConfig {
        AppConfig {
            openai_api_key: "test-key".to_string(),
            openai_base_url: "http://localhost:0".to_string(),
            embedding_model: "text-embedding-3-large".to_string(),
            embedding_dimensions: 8,
            llm_model: "gpt-4o-mini".to_string(),
            embedding_timeout_secs: 30,
            llm_timeout_secs: 120,
            retry_count: 1,
            embedding_batch_size: 100,
            single_piece_max: 1200,
            chunk_target: 900,
            chunk_overlap: 100,
            surrealdb_address: "mem://".to_string(),
            surrealdb_username: String::new(),
            surrealdb_password: String::new(),
            surrealdb_namespace: "test_ns".to_string(),
            surrealdb_database: "test_db".to_string(),
            worker_id: "test-worker".to_string(),
            poll_interval_ms: 50,
            event_max_attempts: 5,
            http_port: 0,
            api_auth_token: None,
            rrf_k: 60,
            ingest_max_body_bytes: Some(10 * 1024 * 1024),
        }
    }
}
