//! services/api/src/adapters/tag_llm.rs
//!
//! Adapter for the tag-suggesting LLM, implementing the `TagSuggestionService`
//! port from the `core` crate.

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use inkpost_core::ports::{PortError, PortResult, TagSuggestionService};

pub struct OpenAiTagAdapter {
    client: Client<OpenAIConfig>,
}

impl OpenAiTagAdapter {
    pub fn new(client: Client<OpenAIConfig>) -> Self {
        Self { client }
    }

    fn parse_tags(content: &str) -> Vec<String> {
        content
            .split(',')
            .map(|t| t.trim().trim_start_matches('#').to_ascii_lowercase())
            .filter(|t| !t.is_empty())
            .collect()
    }
}

#[async_trait]
impl TagSuggestionService for OpenAiTagAdapter {
    async fn suggest_tags(&self, text: &str) -> PortResult<Vec<String>> {
        let preview = text.chars().take(4000).collect::<String>();

        let messages = vec![
            ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessageArgs::default()
                    .content("You are a tagging assistant for a blog platform. Suggest 3 to 6 short topic tags for the given post. Respond with ONLY a comma-separated list of lowercase tags, no hashes, no explanation.")
                    .build()
                    .map_err(|e| PortError::Unexpected(e.to_string()))?
            ),
            ChatCompletionRequestMessage::User(
                ChatCompletionRequestUserMessageArgs::default()
                    .content(format!("Suggest tags for this post:\n\n{}", preview))
                    .build()
                    .map_err(|e| PortError::Unexpected(e.to_string()))?
            ),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model("gpt-4o-mini")
            .messages(messages)
            .max_tokens(40u32)
            .temperature(0.7)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .ok_or_else(|| PortError::Unexpected("No tags generated".to_string()))?;

        Ok(Self::parse_tags(&content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_tags_normalizes_the_list() {
        assert_eq!(
            OpenAiTagAdapter::parse_tags("Rust, #web-dev , ASYNC,, databases"),
            vec!["rust", "web-dev", "async", "databases"]
        );
    }
}
