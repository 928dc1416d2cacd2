//! services/api/src/adapters/seo_llm.rs
//!
//! This module contains the adapter for the SEO-description LLM.
//! It implements the `SeoService` port from the `core` crate.

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
use inkpost_core::ports::{PortError, PortResult, SeoService};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `SeoService` using an OpenAI-compatible LLM.
#[derive(Clone)]
pub struct OpenAiSeoAdapter {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiSeoAdapter {
    /// Creates a new `OpenAiSeoAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String) -> Self {
        Self { client, model }
    }
}

//=========================================================================================
// `SeoService` Trait Implementation
//=========================================================================================

#[async_trait]
impl SeoService for OpenAiSeoAdapter {
    /// Writes the `<meta name="description">` text for a post page.
    async fn meta_description(&self, title: &str, text: &str) -> PortResult<String> {
        let preview = text.chars().take(4000).collect::<String>();

        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(
                    "You are an SEO assistant for a blog platform. Write a meta description for \
                     the given post: at most 155 characters, active voice, no quotes and no \
                     trailing ellipsis. Respond with ONLY the description.",
                )
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(format!("TITLE: {}\n\nPOST:\n{}", title, preview))
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .max_tokens(60u32)
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
            .ok_or_else(|| PortError::Unexpected("SEO LLM returned no text content".to_string()))
    }
}
