//! OpenAI-compatible chat-completions adapter.
//!
//! Serves four selectors with different endpoints and policies:
//! - `gpt4`     : api.openai.com, model from `CHATGPT_MODEL`
//! - `deepseek` : NVIDIA-hosted, model from `DEEPSEEK_MODEL`
//! - `llama`    : NVIDIA-hosted, model from `LLAMA_MODEL`
//! - `nvidia`   : NVIDIA integrate endpoint, Llama 4 Maverick, 20s per call, retried on timeout

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{CompletionProvider, LlmError, RetryPolicy};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const NVIDIA_MAVERICK_MODEL: &str = "meta/llama-4-maverick-17b-128e-instruct";
const NVIDIA_CALL_TIMEOUT: Duration = Duration::from_secs(20);
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
const MAX_TOKENS: u32 = 2000;
const TEMPERATURE: f32 = 0.1;

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

#[derive(Clone)]
pub struct OpenAiCompatClient {
    name: &'static str,
    client: Client,
    base_url: String,
    api_key: String,
    /// Env var that supplies `api_key`, reported when it is missing.
    key_var: &'static str,
    model: String,
    retry: RetryPolicy,
}

impl OpenAiCompatClient {
    fn build(
        name: &'static str,
        base_url: &str,
        api_key: String,
        key_var: &'static str,
        model: String,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .with_context(|| format!("Failed to build HTTP client for {name}"))?;

        Ok(Self {
            name,
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            key_var,
            model,
            retry,
        })
    }

    pub fn gpt4(api_key: String, model: String) -> Result<Self> {
        Self::build(
            "gpt4",
            OPENAI_BASE_URL,
            api_key,
            "OPENAI_API_KEY",
            model,
            DEFAULT_TIMEOUT,
            RetryPolicy::none(),
        )
    }

    pub fn deepseek(api_key: String, base_url: &str, model: String) -> Result<Self> {
        Self::build(
            "deepseek",
            base_url,
            api_key,
            "NVIDIA_API_KEY",
            model,
            DEFAULT_TIMEOUT,
            RetryPolicy::none(),
        )
    }

    pub fn llama(api_key: String, base_url: &str, model: String) -> Result<Self> {
        Self::build(
            "llama",
            base_url,
            api_key,
            "NVIDIA_API_KEY",
            model,
            DEFAULT_TIMEOUT,
            RetryPolicy::none(),
        )
    }

    pub fn nvidia_maverick(api_key: String, base_url: &str) -> Result<Self> {
        Self::build(
            "nvidia",
            base_url,
            api_key,
            "NVIDIA_API_KEY",
            NVIDIA_MAVERICK_MODEL.to_string(),
            NVIDIA_CALL_TIMEOUT,
            RetryPolicy::on_timeout(),
        )
    }

    async fn chat_once(&self, prompt: &str) -> Result<String, LlmError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .header("accept", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(LlmError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(LlmError::from_status(status.as_u16(), message));
        }

        let parsed: ChatResponse = response.json().await.map_err(LlmError::from_transport)?;
        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|t| !t.trim().is_empty())
            .ok_or(LlmError::EmptyContent)?;

        debug!("{} ({}) returned {} chars", self.name, self.model, text.len());
        Ok(text)
    }
}

#[async_trait]
impl CompletionProvider for OpenAiCompatClient {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        if self.api_key.is_empty() {
            return Err(LlmError::NotConfigured(self.key_var));
        }
        self.retry.run(self.name, || self.chat_once(prompt)).await
    }
}
