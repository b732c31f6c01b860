//! services/api/src/adapters/generation_llm.rs
//!
//! This module contains the adapter for the text-generation LLM.
//! It implements the `TextGenerationService` port from the `core` crate and is
//! shared by the lesson plan, notes, image prompt and Q&A flows.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use coursegen_core::{
    domain::GenerationRequest,
    ports::{PortError, PortResult, TextGenerationService},
};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

const SYSTEM_INSTRUCTIONS: &str = "You are an experienced university educator who writes clear, \
well-structured teaching material. Follow the requested output format exactly.";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `TextGenerationService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiGenerationAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiGenerationAdapter {
    /// Creates a new `OpenAiGenerationAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }

    /// Builds the client from an API key and an optional base URL override.
    ///
    /// The client makes exactly one attempt per request: rate limits and
    /// server errors come back to the caller instead of being retried.
    pub fn from_api_key(api_key: &str, api_base: Option<&str>, model: String) -> Self {
        let mut config = OpenAIConfig::new().with_api_key(api_key);
        if let Some(base) = api_base {
            config = config.with_api_base(base);
        }
        let client = Client::with_config(config).with_backoff(single_attempt());
        Self::new(client, model)
    }
}

/// A backoff policy whose budget is already spent, so every error is final.
fn single_attempt() -> ExponentialBackoff {
    ExponentialBackoffBuilder::new()
        .with_max_elapsed_time(Some(Duration::ZERO))
        .build()
}

/// Sorts a client error into the port taxonomy.
fn classify_error(err: OpenAIError) -> PortError {
    match err {
        OpenAIError::ApiError(api) => {
            let detail = api.to_string();
            let kind = api.r#type.clone().unwrap_or_default();
            if detail.contains("rate_limit") || kind.contains("insufficient_quota") {
                PortError::RateLimited(api.message)
            } else if detail.contains("invalid_api_key") || api.message.contains("API key") {
                PortError::Upstream(format!("API key rejected: {}", api.message))
            } else {
                PortError::Upstream(api.message)
            }
        }
        OpenAIError::Reqwest(e) => PortError::Upstream(e.to_string()),
        other => PortError::Unexpected(other.to_string()),
    }
}

//=========================================================================================
// `TextGenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl TextGenerationService for OpenAiGenerationAdapter {
    /// Sends the prompt as a single user turn and returns the first choice.
    async fn generate(&self, request: &GenerationRequest) -> PortResult<String> {
        let params = request.params();
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_INSTRUCTIONS)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(request.prompt())
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let chat_request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(params.temperature)
            .max_completion_tokens(params.max_tokens)
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        info!(
            flow = request.flow().name(),
            prompt_chars = request.prompt().len(),
            max_tokens = params.max_tokens,
            "Sending generation request"
        );
        let started = Instant::now();

        // Call the API and manually map the error if it occurs, which respects the orphan rule.
        let response = self
            .client
            .chat()
            .create(chat_request)
            .await
            .map_err(|e| {
                let mapped = classify_error(e);
                warn!(flow = request.flow().name(), "Generation request failed: {}", mapped);
                mapped
            })?;

        debug!(flow = request.flow().name(), elapsed = ?started.elapsed(), "Generation finished");

        // Extract the text content from the first choice in the response.
        let content = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| {
                PortError::Upstream("Generation LLM returned no choices in its response.".to_string())
            })?
            .message
            .content
            .ok_or_else(|| {
                PortError::Upstream("Generation LLM response contained no text content.".to_string())
            })?;

        Ok(content.trim().to_string())
    }
}
