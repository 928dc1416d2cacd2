//! services/api/src/adapters/moderation_llm.rs
//!
//! This module contains the adapter for the external content classifier.
//! It implements the `ContentClassifier` port from the `core` crate.

const SYSTEM_INSTRUCTIONS: &str = r#"You are the content moderator for a public blog platform.

You will receive the raw text of a blog post or reader comment. Classify it into exactly one of three verdicts:

- "approved": ordinary content that is fine to show publicly.
- "flagged": content that should be withheld - spam, advertising, scams, harassment, hate, sexual content involving minors, or instructions for serious harm. Give a short reason.
- "needs review": content you are unsure about, or that needs human judgement (borderline insults, medical or legal claims, possible self-harm references). Give a short reason.

Respond with ONLY a JSON object, no prose and no code fences:
{"verdict": "approved" | "flagged" | "needs review", "reason": "<short reason, omit for approved>"}"#;

use std::time::Duration;

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
use inkpost_core::moderation::Verdict;
use inkpost_core::ports::{ContentClassifier, PortError, PortResult};
use serde::Deserialize;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `ContentClassifier` using an OpenAI-compatible LLM.
///
/// The call sits on the critical path of content submission, so it is capped
/// with an explicit timeout; the caller treats a timeout like any other
/// classifier failure and falls back to the pending status.
#[derive(Clone)]
pub struct OpenAiModerationAdapter {
    client: Client<OpenAIConfig>,
    model: String,
    call_timeout: Duration,
}

/// The wire shape the classifier is instructed to produce.
#[derive(Deserialize)]
struct RawVerdict {
    verdict: String,
    reason: Option<String>,
}

impl OpenAiModerationAdapter {
    /// Creates a new `OpenAiModerationAdapter`.
    pub fn new(client: Client<OpenAIConfig>, model: String, call_timeout: Duration) -> Self {
        Self {
            client,
            model,
            call_timeout,
        }
    }

    /// Parses the model's JSON reply into a verdict. Models occasionally wrap
    /// JSON in a markdown fence despite instructions, so that is stripped first.
    fn parse_verdict(raw: &str) -> PortResult<Verdict> {
        let trimmed = raw
            .trim()
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim();

        let RawVerdict { verdict, reason } = serde_json::from_str(trimmed)
            .map_err(|e| PortError::Unexpected(format!("malformed classifier reply: {}", e)))?;
        let reason = reason
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| "no reason given".to_string());

        match verdict.as_str() {
            "approved" => Ok(Verdict::Approved),
            "flagged" => Ok(Verdict::Flagged { reason }),
            "needs review" | "needs_review" => Ok(Verdict::NeedsReview { reason }),
            other => Err(PortError::Unexpected(format!(
                "unknown classifier verdict '{}'",
                other
            ))),
        }
    }
}

//=========================================================================================
// `ContentClassifier` Trait Implementation
//=========================================================================================

#[async_trait]
impl ContentClassifier for OpenAiModerationAdapter {
    async fn classify(&self, text: &str) -> PortResult<Verdict> {
        let messages = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(SYSTEM_INSTRUCTIONS)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(text)
                .build()
                .map_err(|e| PortError::Unexpected(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(messages)
            .temperature(0.0)
            .n(1)
            .build()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;

        let response = tokio::time::timeout(self.call_timeout, self.client.chat().create(request))
            .await
            .map_err(|_| {
                PortError::Unexpected(format!(
                    "classifier call timed out after {}s",
                    self.call_timeout.as_secs()
                ))
            })?
            .map_err(|e: OpenAIError| PortError::Unexpected(e.to_string()))?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                PortError::Unexpected("classifier returned no text content".to_string())
            })?;

        Self::parse_verdict(&content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_the_three_verdicts() {
        assert_eq!(
            OpenAiModerationAdapter::parse_verdict(r#"{"verdict": "approved"}"#).unwrap(),
            Verdict::Approved
        );
        assert_eq!(
            OpenAiModerationAdapter::parse_verdict(
                r#"{"verdict": "flagged", "reason": "spam"}"#
            )
            .unwrap(),
            Verdict::Flagged {
                reason: "spam".to_string()
            }
        );
        assert_eq!(
            OpenAiModerationAdapter::parse_verdict(
                r#"{"verdict": "needs review", "reason": "medical claim"}"#
            )
            .unwrap(),
            Verdict::NeedsReview {
                reason: "medical claim".to_string()
            }
        );
    }

    #[test]
    fn tolerates_a_markdown_fence() {
        let fenced = "```json\n{\"verdict\": \"flagged\", \"reason\": \"spam\"}\n```";
        assert_eq!(
            OpenAiModerationAdapter::parse_verdict(fenced).unwrap(),
            Verdict::Flagged {
                reason: "spam".to_string()
            }
        );
    }

    #[test]
    fn rejects_unknown_verdicts_and_garbage() {
        assert!(OpenAiModerationAdapter::parse_verdict(r#"{"verdict": "maybe"}"#).is_err());
        assert!(OpenAiModerationAdapter::parse_verdict("the post looks fine to me").is_err());
    }
}
