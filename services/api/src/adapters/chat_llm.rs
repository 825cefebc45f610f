//! services/api/src/adapters/chat_llm.rs
//!
//! This module contains the adapter for chat-completion backends.
//! It implements the `GenerationService` port from the `core` crate.

use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use backoff::ExponentialBackoffBuilder;
use learning_assistant_core::{
    domain::{GenerationParams, GenerationResult, OutputMode},
    ports::GenerationService,
};
use tracing::debug;

const SYSTEM_INSTRUCTIONS: &str = "You are a helpful AI learning assistant. \
Follow the user's formatting instructions exactly and answer with complete sentences.";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `GenerationService` using an OpenAI-compatible
/// chat-completion API. Chat models finish their sentences, so the output is
/// passed through untouched.
#[derive(Clone)]
pub struct OpenAiChatAdapter {
    client: Client<OpenAIConfig>,
    timeout: Duration,
}

impl OpenAiChatAdapter {
    /// Creates a new `OpenAiChatAdapter`.
    ///
    /// The client's retry policy is replaced so each call makes exactly one
    /// attempt; rate-limit responses surface as failures.
    pub fn new(client: Client<OpenAIConfig>, timeout: Duration) -> Self {
        let single_attempt = ExponentialBackoffBuilder::new()
            .with_max_elapsed_time(Some(Duration::ZERO))
            .build();
        Self {
            client: client.with_backoff(single_attempt),
            timeout,
        }
    }

    fn build_request(
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<async_openai::types::CreateChatCompletionRequest, OpenAIError> {
        let messages = vec![
            ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content(SYSTEM_INSTRUCTIONS)
                    .build()?,
            ),
            ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(prompt)
                    .build()?,
            ),
        ];

        CreateChatCompletionRequestArgs::default()
            .model(&params.model)
            .messages(messages)
            .max_tokens(params.max_tokens)
            .temperature(params.temperature)
            .n(1)
            .build()
    }
}

//=========================================================================================
// `GenerationService` Trait Implementation
//=========================================================================================

#[async_trait]
impl GenerationService for OpenAiChatAdapter {
    async fn generate(&self, prompt: &str, params: &GenerationParams) -> GenerationResult {
        let request = match Self::build_request(prompt, params) {
            Ok(request) => request,
            Err(e) => return GenerationResult::failure(format!("invalid request: {}", e)),
        };

        debug!("Sending chat completion request to model {}", params.model);
        let chat = self.client.chat();
        let response = match tokio::time::timeout(self.timeout, chat.create(request)).await {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => return GenerationResult::failure(e.to_string()),
            Err(_) => {
                return GenerationResult::failure(format!(
                    "backend did not answer within {}s",
                    self.timeout.as_secs()
                ))
            }
        };

        // Always take the first candidate.
        GenerationResult::from_completion(
            response
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content),
        )
    }

    fn output_mode(&self) -> OutputMode {
        OutputMode::PassThrough
    }
}
