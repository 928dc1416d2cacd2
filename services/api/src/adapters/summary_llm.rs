//! services/api/src/adapters/summary_llm.rs
//!
//! This module contains the adapter for the summarizing LLM.
//! It implements the `SummaryService` port from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use inkpost_core::ports::{PortError, PortResult, SummaryService};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `SummaryService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiSummaryAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiSummaryAdapter {
    /// Creates a new `OpenAiSummaryAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

//=========================================================================================
// `SummaryService` Trait Implementation
//=========================================================================================

#[async_trait]
impl SummaryService for OpenAiSummaryAdapter {
    /// Produces a two-to-three sentence preview blurb for a post body.
    async fn summarize(&self, text: &str) -> PortResult<String> {
        // Long posts are cut down; a preview blurb does not need the tail.
        let preview = text.chars().take(8000).collect::<String>();

        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(
                    "You are a summarization assistant for a blog platform. Summarize the given \
                     blog post into a preview blurb of two or three sentences that makes a reader \
                     want to open it. Respond with ONLY the summary, no quotes, no heading.",
                )
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(preview)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .max_tokens(150u32)
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|content| content.trim().to_string())
            .ok_or_else(|| {
                PortError::Unexpected("summary LLM returned no text content".to_string())
            })
    }
}
