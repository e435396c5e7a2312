//! Scoring: provider-judged resume/position fit, plus two local computations:
//! the position-match heuristic and the total-experience calculator.
//!
//! Unlike parsing, scoring does NOT default missing data: a reply without match and
//! mismatch reasons is a contract violation and fails the file.

pub mod experience;
pub mod position;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::warn;

use crate::llm_client::{call_json, prompts, LlmError, ModelKind, ProviderRegistry};
use crate::parsing::string_list;

pub use experience::{total_experience, TotalExperience};
pub use position::check_position_match;

/// Provider verdict on how well a resume fits a job description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreResult {
    /// 0–100
    pub ai_score: u32,
    pub position_match: bool,
    pub match_reasons: Vec<String>,
    pub mismatch_reasons: Vec<String>,
}

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("Failed to generate AI resume score with {model}: {source}")]
    Provider {
        model: ModelKind,
        #[source]
        source: LlmError,
    },

    #[error("{model} score response missing required {field}")]
    Contract {
        model: ModelKind,
        field: &'static str,
    },
}

impl ScoreResult {
    /// Validates a raw provider reply. Empty reason lists are rejected, not defaulted.
    pub fn from_value(model: ModelKind, value: &Value) -> Result<Self, ScoringError> {
        let match_reasons = string_list(value.get("matchReasons"));
        if match_reasons.is_empty() {
            return Err(ScoringError::Contract {
                model,
                field: "matchReasons",
            });
        }
        let mismatch_reasons = string_list(value.get("mismatchReasons"));
        if mismatch_reasons.is_empty() {
            return Err(ScoringError::Contract {
                model,
                field: "mismatchReasons",
            });
        }

        Ok(ScoreResult {
            ai_score: score_field(value.get("aiScore")),
            position_match: value
                .get("positionMatch")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            match_reasons,
            mismatch_reasons,
        })
    }
}

/// Accepts `85`, `85.4` or `"85"`; anything unreadable scores 0. Clamped to 0–100.
fn score_field(value: Option<&Value>) -> u32 {
    let raw = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().trim_end_matches('%').parse().unwrap_or(0.0),
        _ => 0.0,
    };
    raw.round().clamp(0.0, 100.0) as u32
}

/// Scores resumes against a job description through the provider registry.
#[derive(Clone)]
pub struct ResumeScorer {
    providers: ProviderRegistry,
}

impl ResumeScorer {
    pub fn new(providers: ProviderRegistry) -> Self {
        Self { providers }
    }

    pub async fn score(
        &self,
        resume_text: &str,
        job_description: &str,
        model: ModelKind,
    ) -> Result<ScoreResult, ScoringError> {
        let provider = self.providers.for_scoring(model);
        let prompt = prompts::resume_score_prompt(resume_text, job_description);

        let raw: Value = call_json(provider, &prompt).await.map_err(|source| {
            warn!("Scoring with {model} failed: {source}");
            ScoringError::Provider { model, source }
        })?;

        ScoreResult::from_value(model, &raw)
    }
}
