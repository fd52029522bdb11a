//! Provider-neutral request and response types

use serde::{Deserialize, Serialize};

/// A single-turn completion request
///
/// The translator never carries conversation state between calls: every
/// request is one system prompt plus one user message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub system_prompt: String,
    pub message: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Ask the provider to emit JSON only
    pub json_only: bool,
}

impl CompletionRequest {
    pub fn new(system_prompt: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            message: message.into(),
            temperature: 0.2,
            max_tokens: 2048,
            json_only: true,
        }
    }
}

/// Provider reply
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub content: Option<String>,
    pub usage: TokenUsage,
}

impl CompletionResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            usage: TokenUsage::default(),
        }
    }
}

/// Token accounting reported by the provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}
