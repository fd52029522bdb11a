//! Request translator
//!
//! Wraps the LLM call that turns one chat message into transformation
//! descriptors, and classifies what can go wrong.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::LlmConfig;
use crate::domain::DescriptorGroup;
use crate::llm::{CompletionRequest, LlmClient, LlmError};

/// Wait hint used when a rate-limited provider gives none
pub const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(20);

/// Failures that surface to the caller
///
/// Unparseable model output is not here: it degrades to an empty result.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TranslateError {
    #[error("Message is required.")]
    EmptyMessage,

    #[error("Rate limit exceeded. Please wait a moment and try again.")]
    RateLimited { retry_after: Duration },

    #[error("AI model temporarily unavailable. Please try again.")]
    Unavailable(String),

    #[error("Failed to process request.")]
    Failed(String),
}

impl TranslateError {
    /// Underlying cause, when there is one worth reporting
    pub fn details(&self) -> Option<&str> {
        match self {
            Self::Unavailable(d) | Self::Failed(d) => Some(d),
            _ => None,
        }
    }
}

/// The outcome of a successful call
#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    pub group: DescriptorGroup,
}

impl Translation {
    pub fn empty() -> Self {
        Self {
            group: DescriptorGroup::empty(),
        }
    }

    /// True when the model understood nothing
    pub fn is_empty(&self) -> bool {
        self.group.is_empty()
    }

    /// The parameters in their wire shape (object or array)
    pub fn params(&self) -> Value {
        self.group.to_value()
    }
}

/// Turns natural-language edit requests into descriptor groups
pub struct Translator {
    llm: Arc<dyn LlmClient>,
    system_prompt: String,
    temperature: f32,
    max_tokens: u32,
    fallback_retry: Duration,
}

impl Translator {
    pub fn new(llm: Arc<dyn LlmClient>, system_prompt: impl Into<String>) -> Self {
        debug!("Translator::new: called");
        Self {
            llm,
            system_prompt: system_prompt.into(),
            temperature: 0.2,
            max_tokens: 2048,
            fallback_retry: DEFAULT_RETRY_AFTER,
        }
    }

    /// Apply sampling settings and the rate-limit fallback hint
    pub fn with_settings(mut self, config: &LlmConfig, fallback_retry: Duration) -> Self {
        self.temperature = config.temperature;
        self.max_tokens = config.max_tokens;
        self.fallback_retry = fallback_retry;
        self
    }

    /// Translate one message
    ///
    /// Blank input is rejected before any call is made.
    pub async fn translate(&self, text: &str) -> Result<Translation, TranslateError> {
        let text = text.trim();
        debug!(text_len = text.len(), "Translator::translate: called");
        if text.is_empty() {
            debug!("Translator::translate: empty message");
            return Err(TranslateError::EmptyMessage);
        }

        let request = CompletionRequest {
            system_prompt: self.system_prompt.clone(),
            message: text.to_string(),
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            json_only: true,
        };

        let response = self.llm.complete(request).await.map_err(|e| self.classify(e))?;
        let raw = response.content.unwrap_or_default();
        info!(
            provider = %self.llm.describe(),
            output_tokens = response.usage.output_tokens,
            "Translator::translate: model replied"
        );
        debug!(%raw, "Translator::translate: raw output");

        Ok(Translation {
            group: parse_output(&raw),
        })
    }

    fn classify(&self, error: LlmError) -> TranslateError {
        debug!(%error, "Translator::classify: called");
        match error {
            LlmError::RateLimited { retry_after } => TranslateError::RateLimited {
                retry_after: retry_after.unwrap_or(self.fallback_retry),
            },
            LlmError::ModelUnavailable { .. } => TranslateError::Unavailable(error.to_string()),
            other => TranslateError::Failed(other.to_string()),
        }
    }
}

/// Parse model output into a descriptor group
///
/// Anything that is not an object or an array of objects is logged and
/// treated as "understood nothing".
pub fn parse_output(raw: &str) -> DescriptorGroup {
    debug!(raw_len = raw.len(), "parse_output: called");
    let body = strip_code_fence(raw.trim());
    if body.is_empty() {
        debug!("parse_output: empty output");
        return DescriptorGroup::empty();
    }

    match serde_json::from_str::<DescriptorGroup>(body) {
        Ok(group) => group,
        Err(e) => {
            warn!(error = %e, %raw, "parse_output: malformed model output, ignoring");
            DescriptorGroup::empty()
        }
    }
}

/// Models sometimes wrap JSON in a markdown fence despite instructions
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Descriptor;
    use crate::llm::CompletionResponse;
    use crate::llm::client::mock::MockLlmClient;
    use serde_json::json;

    fn translator(mock: MockLlmClient) -> (Translator, Arc<MockLlmClient>) {
        let mock = Arc::new(mock);
        (Translator::new(mock.clone(), "system"), mock)
    }

    #[tokio::test]
    async fn test_remove_background() {
        let (t, _) = translator(MockLlmClient::with_texts(&[r#"{"aiRemoveBackground": true}"#]));
        let result = t.translate("Remove the background").await.unwrap();

        assert_eq!(result.params(), json!({"aiRemoveBackground": true}));
        assert_eq!(
            result.group.into_steps(),
            vec![Descriptor::from_value(json!({"aiRemoveBackground": true})).unwrap()]
        );
    }

    #[tokio::test]
    async fn test_array_output_keeps_steps() {
        let (t, _) = translator(MockLlmClient::with_texts(&[
            r#"[{"aiRemoveBackground": true}, {"aiDropShadow": true}]"#,
        ]));
        let result = t.translate("cut out and shadow").await.unwrap();
        assert_eq!(result.group.into_steps().len(), 2);
    }

    #[tokio::test]
    async fn test_empty_message_makes_no_call() {
        let (t, mock) = translator(MockLlmClient::with_texts(&["{}"]));
        assert_eq!(t.translate("   ").await, Err(TranslateError::EmptyMessage));
        assert_eq!(mock.call_count(), 0);
    }

    #[tokio::test]
    async fn test_message_is_trimmed_and_prompt_sent() {
        let (t, mock) = translator(MockLlmClient::with_texts(&["{}"]));
        t.translate("  Crop to face \n").await.unwrap();

        let request = mock.last_request().unwrap();
        assert_eq!(request.message, "Crop to face");
        assert_eq!(request.system_prompt, "system");
        assert!(request.json_only);
    }

    #[tokio::test]
    async fn test_unparseable_output_is_empty_not_error() {
        let (t, _) = translator(MockLlmClient::with_texts(&["Sure! I'd love to help"]));
        let result = t.translate("make it pop").await.unwrap();
        assert!(result.is_empty());
        assert_eq!(result.params(), json!({}));
    }

    #[tokio::test]
    async fn test_empty_object_means_not_understood() {
        let (t, _) = translator(MockLlmClient::with_texts(&["{}"]));
        assert!(t.translate("hello").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_content_is_empty() {
        let (t, _) = translator(MockLlmClient::new(vec![Ok(CompletionResponse::default())]));
        assert!(t.translate("hello").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_rate_limit_uses_provider_hint() {
        let (t, _) = translator(MockLlmClient::new(vec![Err(LlmError::RateLimited {
            retry_after: Some(Duration::from_secs(5)),
        })]));
        assert_eq!(
            t.translate("blur").await,
            Err(TranslateError::RateLimited {
                retry_after: Duration::from_secs(5)
            })
        );
    }

    #[tokio::test]
    async fn test_rate_limit_falls_back_to_default_hint() {
        let (t, _) = translator(MockLlmClient::new(vec![Err(LlmError::RateLimited { retry_after: None })]));
        assert_eq!(
            t.translate("blur").await,
            Err(TranslateError::RateLimited {
                retry_after: DEFAULT_RETRY_AFTER
            })
        );
    }

    #[tokio::test]
    async fn test_unavailable_and_failed_stay_distinct() {
        let (t, _) = translator(MockLlmClient::new(vec![
            Err(LlmError::ModelUnavailable {
                status: 404,
                message: "models/x is not found".to_string(),
            }),
            Err(LlmError::ApiError {
                status: 400,
                message: "bad request".to_string(),
            }),
        ]));

        let first = t.translate("blur").await.unwrap_err();
        assert!(matches!(first, TranslateError::Unavailable(_)));

        let second = t.translate("blur").await.unwrap_err();
        assert!(matches!(second, TranslateError::Failed(_)));
        assert!(second.details().unwrap().contains("bad request"));
    }

    #[test]
    fn test_parse_output_shapes() {
        assert!(parse_output("").is_empty());
        assert!(parse_output("[]").is_empty());
        assert!(parse_output("42").is_empty());
        assert!(parse_output(r#""blur""#).is_empty());
        assert!(parse_output(r#"[{"blur": 1}, 2]"#).is_empty());
        assert!(!parse_output(r#"{"blur": 1}"#).is_empty());
    }

    #[test]
    fn test_parse_output_strips_fence() {
        let group = parse_output("```json\n{\"grayscale\": true}\n```");
        assert_eq!(group.to_value(), json!({"grayscale": true}));
    }
}
