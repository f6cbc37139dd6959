use async_openai::types::{
    ChatCompletionRequestSystemMessage, ChatCompletionRequestUserMessage,
    CreateChatCompletionRequestArgs, ResponseFormat, ResponseFormatJsonSchema,
};
use serde_json::Value;

use crate::{config::AppConfig, error::AppError};

/// Strict-JSON chat completion client shared by Prompt A (per-chunk
/// extraction), Prompt B (cross-chunk canonicalization), and entity
/// disambiguation. Every call uses `temperature=0` and a named JSON schema
/// response format, per the extraction contract.
pub struct LlmClient {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    model: String,
}

impl LlmClient {
    pub fn new(config: &AppConfig) -> Self {
        let openai_config = async_openai::config::OpenAIConfig::new()
            .with_api_key(&config.openai_api_key)
            .with_api_base(&config.openai_base_url);
        Self {
            client: async_openai::Client::with_config(openai_config),
            model: config.llm_model.clone(),
        }
    }

    /// Runs one strict-JSON-schema chat completion and returns the raw
    /// response text. Schema violations surface through `serde_json`
    /// parsing at the call site, which the caller (Prompt A/B/disambiguation)
    /// treats as a transient failure eligible for a single retry (§4.4).
    pub async fn complete_json(
        &self,
        schema_name: &str,
        schema_description: &str,
        schema: Value,
        system_message: &str,
        user_message: &str,
    ) -> Result<String, AppError> {
        let response_format = ResponseFormat::JsonSchema {
            json_schema: ResponseFormatJsonSchema {
                description: Some(schema_description.to_string()),
                name: schema_name.to_string(),
                schema: Some(schema),
                strict: Some(true),
            },
        };

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .temperature(0.0)
            .messages([
                ChatCompletionRequestSystemMessage::from(system_message).into(),
                ChatCompletionRequestUserMessage::from(user_message).into(),
            ])
            .response_format(response_format)
            .build()?;

        let response = self.client.chat().create(request).await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AppError::LlmParsing("no content in llm response".into()))
    }
}
