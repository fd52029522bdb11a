//! Google Gemini API client implementation
//!
//! Uses the `generateContent` endpoint with a system instruction and, for
//! JSON-only requests, `responseMimeType: application/json`.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

use super::http::send_with_retry;
use super::{CompletionRequest, CompletionResponse, LlmClient, LlmError, TokenUsage};
use crate::config::LlmConfig;

/// Gemini API client
pub struct GeminiClient {
    model: String,
    api_key: String,
    base_url: String,
    http: Client,
    max_tokens: u32,
}

impl GeminiClient {
    /// Create a new client from configuration
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        debug!(model = %config.model, "GeminiClient::from_config: called");
        let api_key = config.get_api_key().map_err(|e| LlmError::Config(e.to_string()))?;

        let timeout = Duration::from_millis(config.timeout_ms);
        let http = Client::builder().timeout(timeout).build().map_err(LlmError::Network)?;

        Ok(Self {
            model: config.model.clone(),
            api_key,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
            max_tokens: config.max_tokens,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }

    /// Build the request body for the Gemini API
    fn build_request_body(&self, request: &CompletionRequest) -> serde_json::Value {
        debug!(%self.model, %request.max_tokens, "build_request_body: called");

        let mut generation_config = serde_json::json!({
            "temperature": request.temperature,
            "maxOutputTokens": request.max_tokens.min(self.max_tokens),
        });
        if request.json_only {
            generation_config["responseMimeType"] = serde_json::json!("application/json");
        }

        serde_json::json!({
            "systemInstruction": { "parts": [{ "text": request.system_prompt }] },
            "contents": [{ "role": "user", "parts": [{ "text": request.message }] }],
            "generationConfig": generation_config,
        })
    }

    /// Parse the Gemini API response
    ///
    /// Text parts of the first candidate are concatenated; a response with no
    /// candidates (e.g. blocked by safety settings) has no content.
    fn parse_response(&self, api_response: GeminiResponse) -> CompletionResponse {
        debug!(
            candidate_count = api_response.candidates.len(),
            "parse_response: called"
        );
        let content = api_response.candidates.into_iter().next().and_then(|c| {
            let text: String = c.content?.parts.into_iter().filter_map(|p| p.text).collect();
            if text.is_empty() { None } else { Some(text) }
        });

        let usage = api_response
            .usage_metadata
            .map(|u| TokenUsage {
                input_tokens: u.prompt_token_count,
                output_tokens: u.candidates_token_count,
            })
            .unwrap_or_default();

        CompletionResponse { content, usage }
    }
}

#[async_trait]
impl LlmClient for GeminiClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        debug!(%self.model, %request.max_tokens, "complete: called");
        let url = self.endpoint();
        let body = self.build_request_body(&request);

        let response = send_with_retry("gemini", || {
            self.http
                .post(url.clone())
                .header("x-goog-api-key", &self.api_key)
                .header("content-type", "application/json")
                .json(&body)
        })
        .await?;

        let api_response: GeminiResponse = response.json().await?;
        Ok(self.parse_response(api_response))
    }

    fn describe(&self) -> String {
        format!("gemini/{}", self.model)
    }
}

// Gemini API response types

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<GeminiUsage>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GeminiClient {
        GeminiClient {
            model: "gemini-2.5-flash-lite".to_string(),
            api_key: "test-key".to_string(),
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            http: Client::new(),
            max_tokens: 1024,
        }
    }

    #[test]
    fn test_endpoint() {
        assert_eq!(
            client().endpoint(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.5-flash-lite:generateContent"
        );
    }

    #[test]
    fn test_build_request_body() {
        let body = client().build_request_body(&CompletionRequest::new("vocabulary", "Remove the background"));

        assert_eq!(body["systemInstruction"]["parts"][0]["text"], "vocabulary");
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Remove the background");
        assert_eq!(body["generationConfig"]["responseMimeType"], "application/json");
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 1024);
    }

    #[test]
    fn test_parse_response_joins_parts() {
        let raw = r#"{
            "candidates": [{"content": {"role": "model", "parts": [{"text": "[{\"aiRemoveBackground\": true},"}, {"text": " {\"aiDropShadow\": true}]"}]}}],
            "usageMetadata": {"promptTokenCount": 900, "candidatesTokenCount": 20}
        }"#;
        let api: GeminiResponse = serde_json::from_str(raw).unwrap();
        let resp = client().parse_response(api);

        assert_eq!(
            resp.content.as_deref(),
            Some(r#"[{"aiRemoveBackground": true}, {"aiDropShadow": true}]"#)
        );
        assert_eq!(resp.usage.input_tokens, 900);
    }

    #[test]
    fn test_parse_response_without_candidates() {
        let api: GeminiResponse = serde_json::from_str(r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#).unwrap();
        assert!(client().parse_response(api).content.is_none());
    }
}
