//! Gemini `generateContent` adapter: the default provider.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{CompletionProvider, LlmError, RetryPolicy};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Sampling parameters sent as `generationConfig`.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub max_output_tokens: u32,
}

impl GenerationConfig {
    /// Near-deterministic config used for structured extraction and scoring.
    pub fn structured() -> Self {
        Self {
            temperature: 0.1,
            top_p: 0.95,
            top_k: 40,
            max_output_tokens: 8192,
        }
    }

    /// Warmer, shorter config for free-text cover letters.
    pub fn creative() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.95,
            top_k: 40,
            max_output_tokens: 1000,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

impl GenerateResponse {
    fn text(&self) -> Option<String> {
        let parts = &self.candidates.first()?.content.as_ref()?.parts;
        let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
        (!text.is_empty()).then_some(text)
    }
}

#[derive(Clone)]
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
    generation: GenerationConfig,
    retry: RetryPolicy,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .context("Failed to build Gemini HTTP client")?;

        Ok(Self {
            client,
            api_key,
            model,
            generation: GenerationConfig::structured(),
            retry: RetryPolicy::on_overload(),
        })
    }

    pub fn with_generation(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }

    async fn generate_once(&self, prompt: &str) -> Result<String, LlmError> {
        let url = format!("{GEMINI_API_BASE}/{}:generateContent", self.model);
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
            generation_config: self.generation,
        };

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await
            .map_err(LlmError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::from_status(status.as_u16(), body));
        }

        let parsed: GenerateResponse = response.json().await.map_err(LlmError::from_transport)?;
        let text = parsed.text().ok_or(LlmError::EmptyContent)?;
        debug!("Gemini ({}) returned {} chars", self.model, text.len());
        Ok(text)
    }
}

#[async_trait]
impl CompletionProvider for GeminiClient {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        if self.api_key.is_empty() {
            return Err(LlmError::NotConfigured("GEMINI_API_KEY"));
        }
        self.retry
            .run("Gemini", || self.generate_once(prompt))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_config_uses_camel_case() {
        let json = serde_json::to_value(GenerationConfig::structured()).unwrap();
        assert_eq!(json["maxOutputTokens"], 8192);
        assert_eq!(json["topK"], 40);
        assert!(json.get("max_output_tokens").is_none());
    }

    #[test]
    fn test_response_text_joins_parts_of_first_candidate() {
        let raw = r#"{
            "candidates": [
                {"content": {"parts": [{"text": "{\"a\":"}, {"text": " 1}"}]}},
                {"content": {"parts": [{"text": "ignored"}]}}
            ]
        }"#;
        let parsed: GenerateResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.text().as_deref(), Some("{\"a\": 1}"));
    }

    #[test]
    fn test_response_without_candidates_has_no_text() {
        let parsed: GenerateResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.text().is_none());
    }

    #[tokio::test]
    async fn test_missing_key_fails_without_network() {
        let client = GeminiClient::new(String::new(), "gemini-1.5-flash".into()).unwrap();
        let err = client.complete("hi").await.unwrap_err();
        assert!(matches!(err, LlmError::NotConfigured("GEMINI_API_KEY")));
    }
}
