//! services/api/src/adapters/draft_llm.rs
//!
//! This module contains the adapter for the draft-writing LLM.
//! It implements the `DraftService` port from the `core` crate.

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
use inkpost_core::ports::{DraftService, PortError, PortResult};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `DraftService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiDraftAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiDraftAdapter {
    /// Creates a new `OpenAiDraftAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

//=========================================================================================
// `DraftService` Trait Implementation
//=========================================================================================

#[async_trait]
impl DraftService for OpenAiDraftAdapter {
    /// Generates a complete post draft in markdown for an admin to edit.
    async fn generate_draft(&self, topic: &str, notes: Option<&str>) -> PortResult<String> {
        let mut prompt = format!("Write a blog post about: {}", topic);
        if let Some(notes) = notes {
            prompt.push_str(&format!("\n\nNotes from the author to work in:\n{}", notes));
        }

        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(
                    "You are a writing assistant for a blog platform. Draft a complete blog post \
                     in markdown: a short introduction, two to four sections with headings, and a \
                     closing paragraph. Write in a clear, personal voice. Respond with ONLY the \
                     markdown body, no title line and no commentary.",
                )
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(prompt)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
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
            .ok_or_else(|| PortError::Unexpected("draft LLM returned no text content".to_string()))
    }
}
