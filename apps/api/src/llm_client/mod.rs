/// LLM Client: the single point of entry for every external text-generation call.
///
/// ARCHITECTURAL RULE: No other module may talk to a provider API directly.
/// Parsing, scoring and cover letters all go through a `CompletionProvider` held by the
/// `ProviderRegistry`, which is built once in `main` and injected through `AppState`.
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub mod gemini;
pub mod openai;
pub mod prompts;
pub mod retry;

pub use gemini::GeminiClient;
pub use openai::OpenAiCompatClient;
pub use retry::RetryPolicy;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Provider overloaded: {0}")]
    Overloaded(String),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Provider not configured: {0}")]
    NotConfigured(&'static str),

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("No JSON object found in LLM response")]
    NoJsonObject,

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

impl LlmError {
    /// Maps a transport failure, keeping timeouts distinguishable for retry decisions.
    pub fn from_transport(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            LlmError::Timeout(e.to_string())
        } else {
            LlmError::Http(e)
        }
    }

    /// Maps a non-success HTTP status and body onto the error taxonomy.
    pub fn from_status(status: u16, body: String) -> Self {
        let lowered = body.to_lowercase();
        match status {
            504 => LlmError::Timeout(body),
            429 | 503 => LlmError::Overloaded(body),
            _ if lowered.contains("overloaded") => LlmError::Overloaded(body),
            _ => LlmError::Api {
                status,
                message: body,
            },
        }
    }

    pub fn is_overloaded(&self) -> bool {
        matches!(self, LlmError::Overloaded(_))
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, LlmError::Timeout(_))
    }
}

/// One external text-generation service. Takes a single user prompt, returns the raw text.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Calls the provider and deserializes the first JSON object found in its reply.
/// The prompt must instruct the model to return JSON.
pub async fn call_json<T: DeserializeOwned>(
    provider: &dyn CompletionProvider,
    prompt: &str,
) -> Result<T, LlmError> {
    let text = provider.complete(prompt).await?;
    if text.trim().is_empty() {
        return Err(LlmError::EmptyContent);
    }

    let json = extract_json_object(&text).ok_or(LlmError::NoJsonObject)?;
    debug!("{} returned {} bytes of JSON", provider.name(), json.len());
    serde_json::from_str(&json).map_err(LlmError::Parse)
}

/// Identifier of the provider a caller asked for.
/// Unknown or missing selectors fall back to the default (`Gemini`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelKind {
    #[default]
    Gemini,
    Gpt4,
    DeepSeek,
    Llama,
    Nvidia,
}

impl ModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelKind::Gemini => "gemini",
            ModelKind::Gpt4 => "gpt4",
            ModelKind::DeepSeek => "deepseek",
            ModelKind::Llama => "llama",
            ModelKind::Nvidia => "nvidia",
        }
    }

    /// Lenient parse used for form input.
    pub fn from_selector(selector: Option<&str>) -> Self {
        selector
            .and_then(|s| s.parse().ok())
            .unwrap_or_default()
    }
}

impl FromStr for ModelKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "gemini" => Ok(ModelKind::Gemini),
            "gpt4" => Ok(ModelKind::Gpt4),
            "deepseek" => Ok(ModelKind::DeepSeek),
            "llama" => Ok(ModelKind::Llama),
            "nvidia" => Ok(ModelKind::Nvidia),
            other => Err(format!("unknown model type '{other}'")),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// All provider adapters, owned by the composition root.
#[derive(Clone)]
pub struct ProviderRegistry {
    pub gemini: Arc<dyn CompletionProvider>,
    pub gpt4: Arc<dyn CompletionProvider>,
    pub deepseek: Arc<dyn CompletionProvider>,
    pub llama: Arc<dyn CompletionProvider>,
    pub nvidia: Arc<dyn CompletionProvider>,
    /// Default provider with a warmer, shorter generation config for free-text letters.
    pub cover_letter: Arc<dyn CompletionProvider>,
}

impl ProviderRegistry {
    /// Adapter used to extract structured resume fields.
    pub fn for_parsing(&self, model: ModelKind) -> &dyn CompletionProvider {
        match model {
            ModelKind::Gemini => self.gemini.as_ref(),
            ModelKind::Gpt4 => self.gpt4.as_ref(),
            ModelKind::DeepSeek => self.deepseek.as_ref(),
            ModelKind::Llama => self.llama.as_ref(),
            ModelKind::Nvidia => self.nvidia.as_ref(),
        }
    }

    /// Adapter used for fit scoring. The NVIDIA integration has no scoring prompt of its own
    /// and scores with the default provider.
    pub fn for_scoring(&self, model: ModelKind) -> &dyn CompletionProvider {
        match model {
            ModelKind::Nvidia => self.gemini.as_ref(),
            other => self.for_parsing(other),
        }
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

/// Removes fence markers anywhere in the text, `<think>`-style tags, and curly double quotes.
/// Tags are only stripped outside JSON string literals; values keep their `<` and `>`.
fn clean_model_output(text: &str) -> String {
    let unfenced = strip_json_fences(text)
        .replace("```json", "")
        .replace("```", "");

    let mut out = String::with_capacity(unfenced.len());
    let mut rest = unfenced.as_str();
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    while let Some(raw) = rest.chars().next() {
        let c = match raw {
            '\u{201C}' | '\u{201D}' => '"',
            other => other,
        };
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
        } else {
            if let Some(len) = markup_tag_len(rest) {
                rest = &rest[len..];
                continue;
            }
            match c {
                // Quotes in prose around the object do not open a string.
                '"' if depth > 0 => in_string = true,
                '{' => depth += 1,
                '}' => depth = depth.saturating_sub(1),
                _ => {}
            }
        }
        out.push(c);
        rest = &rest[raw.len_utf8()..];
    }
    out
}

/// Byte length of a markup tag such as `<think>` or `</b>` at the start of `text`.
fn markup_tag_len(text: &str) -> Option<usize> {
    let body = text.strip_prefix('<')?;
    let name = body.strip_prefix('/').unwrap_or(body);
    if !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return None;
    }
    let end = text.find('>')?;
    if text[1..end].contains(['<', '"', '{', '}']) {
        return None;
    }
    Some(end + 1)
}

/// Returns the first balanced top-level `{...}` object in the text, tolerating prose around it.
/// Braces inside JSON strings are ignored.
pub fn extract_json_object(text: &str) -> Option<String> {
    let cleaned = clean_model_output(text);
    let start = cleaned.find('{')?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in cleaned[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(cleaned[start..=start + offset].to_string());
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// Scripted provider for tests: pops one canned reply per call and records prompts.
    pub struct ScriptedProvider {
        replies: Mutex<VecDeque<Result<String, LlmError>>>,
        pub prompts: Mutex<Vec<String>>,
    }

    impl ScriptedProvider {
        pub fn new(replies: Vec<Result<String, LlmError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        pub fn always(reply: &str) -> Self {
            Self::new((0..64).map(|_| Ok(reply.to_string())).collect())
        }

        pub fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl CompletionProvider for ScriptedProvider {
        fn name(&self) -> &'static str {
            "scripted"
        }

        async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(LlmError::EmptyContent))
        }
    }

    pub fn registry_of(provider: Arc<dyn CompletionProvider>) -> ProviderRegistry {
        ProviderRegistry {
            gemini: provider.clone(),
            gpt4: provider.clone(),
            deepseek: provider.clone(),
            llama: provider.clone(),
            nvidia: provider.clone(),
            cover_letter: provider,
        }
    }
}
