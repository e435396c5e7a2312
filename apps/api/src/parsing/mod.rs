//! Model dispatch: sends extracted resume text to the selected provider and normalizes
//! whatever JSON comes back into a `ParsedResume`.
//!
//! Normalization is the same for every provider: missing strings become `""`, a missing
//! duration becomes `"N/A"`, missing lists become empty. Only an unusable reply (no JSON
//! object, invalid JSON, provider error) fails the file.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::llm_client::{call_json, prompts, LlmError, ModelKind, ProviderRegistry};

pub const MISSING_DURATION: &str = "N/A";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Education {
    pub degree: String,
    pub institution: String,
    pub year: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExperienceEntry {
    pub company: String,
    pub position: String,
    pub duration: String,
    pub responsibilities: Vec<String>,
}

/// Structured fields extracted from one resume. Never mutated after creation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedResume {
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub post_applied_for: String,
    pub education: Education,
    pub experience: Vec<ExperienceEntry>,
}

impl ParsedResume {
    /// Builds a record from loosely-shaped provider JSON, defaulting anything missing.
    pub fn from_value(value: &Value) -> Self {
        let education = value
            .get("education")
            .map(|e| {
                // Some models return a list even when asked for the single highest degree.
                let e = e.as_array().and_then(|arr| arr.first()).unwrap_or(e);
                Education {
                    degree: text_field(e, "degree"),
                    institution: text_field(e, "institution"),
                    year: text_field(e, "year"),
                }
            })
            .unwrap_or_default();

        let experience = value
            .get("experience")
            .and_then(Value::as_array)
            .map(|entries| {
                entries
                    .iter()
                    .filter(|e| e.is_object())
                    .map(|e| ExperienceEntry {
                        company: text_field(e, "company"),
                        position: text_field(e, "position"),
                        duration: match text_field(e, "duration") {
                            d if d.trim().is_empty() => MISSING_DURATION.to_string(),
                            d => d,
                        },
                        responsibilities: string_list(e.get("responsibilities")),
                    })
                    .collect()
            })
            .unwrap_or_default();

        ParsedResume {
            full_name: text_field(value, "fullName"),
            email: text_field(value, "email"),
            phone: text_field(value, "phone"),
            post_applied_for: text_field(value, "postAppliedFor"),
            education,
            experience,
        }
    }
}

/// Reads a scalar field as text. Numbers (phone numbers, years) are stringified.
fn text_field(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

pub(crate) fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| match item {
                    Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("{model} is temporarily overloaded. Please try again later.")]
    Overloaded { model: ModelKind },

    #[error("{model} timed out after multiple attempts")]
    TimedOut { model: ModelKind },

    #[error("Malformed JSON from {model}: {source}")]
    MalformedJson {
        model: ModelKind,
        #[source]
        source: LlmError,
    },

    #[error("Failed to parse resume with {model}: {source}")]
    Provider {
        model: ModelKind,
        #[source]
        source: LlmError,
    },
}

impl ParseError {
    fn from_llm(model: ModelKind, source: LlmError) -> Self {
        match source {
            LlmError::Overloaded(_) => ParseError::Overloaded { model },
            LlmError::Timeout(_) => ParseError::TimedOut { model },
            LlmError::NoJsonObject | LlmError::Parse(_) | LlmError::EmptyContent => {
                ParseError::MalformedJson { model, source }
            }
            source => ParseError::Provider { model, source },
        }
    }
}

/// Routes resume text to the provider chosen by `ModelKind`.
#[derive(Clone)]
pub struct ResumeParser {
    providers: ProviderRegistry,
}

impl ResumeParser {
    pub fn new(providers: ProviderRegistry) -> Self {
        Self { providers }
    }

    pub async fn parse(&self, resume_text: &str, model: ModelKind) -> Result<ParsedResume, ParseError> {
        let provider = self.providers.for_parsing(model);
        let prompt = prompts::resume_parse_prompt(resume_text);

        let raw: Value = call_json(provider, &prompt).await.map_err(|e| {
            warn!("Resume parsing with {model} failed: {e}");
            ParseError::from_llm(model, e)
        })?;

        Ok(ParsedResume::from_value(&raw))
    }
}
