//! Result aggregation: the per-file unit of work driven by the batch scheduler.
//!
//! extract → parse → total experience → score → position match → persist.
//! The first failing stage fails the file; its siblings are unaffected.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use crate::batch::{FilePipeline, UploadedFile};
use crate::extraction::{ExtractionError, TextExtractor};
use crate::llm_client::ModelKind;
use crate::models::{AuditAction, NewAiScore, NewAuditLog, NewResumeHistory};
use crate::parsing::{ParseError, ParsedResume, ResumeParser};
use crate::scoring::{check_position_match, total_experience, ResumeScorer, ScoringError};
use crate::store::RecordStore;

/// One successfully processed resume, as returned to the caller.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeResult {
    pub file_name: String,
    #[serde(flatten)]
    pub resume: ParsedResume,
    pub total_experience: String,
    pub ai_score: u32,
    pub model_type: ModelKind,
    pub position_match: bool,
    pub match_reasons: Vec<String>,
    pub mismatch_reasons: Vec<String>,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Scoring(#[from] ScoringError),

    #[error("Failed to save results: {0}")]
    Persistence(#[from] sqlx::Error),
}

/// Who uploaded the batch and how it should be processed. Shared by every file.
#[derive(Debug, Clone)]
pub struct UploadContext {
    pub user_id: String,
    pub model: ModelKind,
    /// Empty when the caller gave none.
    pub job_description: String,
    pub ip: Option<String>,
}

pub struct ResumePipeline {
    extractor: Arc<dyn TextExtractor>,
    parser: ResumeParser,
    scorer: ResumeScorer,
    store: Arc<dyn RecordStore>,
    ctx: UploadContext,
}

impl ResumePipeline {
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        parser: ResumeParser,
        scorer: ResumeScorer,
        store: Arc<dyn RecordStore>,
        ctx: UploadContext,
    ) -> Self {
        Self {
            extractor,
            parser,
            scorer,
            store,
            ctx,
        }
    }

    async fn analyze(&self, file: &UploadedFile) -> Result<ResumeResult, PipelineError> {
        let ctx = &self.ctx;
        let text = self.extractor.extract_text(file.path()).await?;
        let resume = self.parser.parse(&text, ctx.model).await?;
        let experience = total_experience(&resume.experience, Utc::now().date_naive());
        let score = self
            .scorer
            .score(&text, &ctx.job_description, ctx.model)
            .await?;
        let heuristic = check_position_match(&resume.post_applied_for, &ctx.job_description);

        Ok(ResumeResult {
            file_name: file.file_name().to_string(),
            resume,
            total_experience: experience.formatted,
            ai_score: score.ai_score,
            model_type: ctx.model,
            position_match: heuristic || score.position_match,
            match_reasons: score.match_reasons,
            mismatch_reasons: score.mismatch_reasons,
        })
    }

    async fn persist(&self, result: &ResumeResult) -> Result<(), PipelineError> {
        let ctx = &self.ctx;
        let model_type = ctx.model.as_str().to_string();

        self.store
            .insert_history(NewResumeHistory {
                user_id: ctx.user_id.clone(),
                file_name: result.file_name.clone(),
                full_name: result.resume.full_name.clone(),
                email: result.resume.email.clone(),
                phone: result.resume.phone.clone(),
                post_applied_for: result.resume.post_applied_for.clone(),
                model_type: model_type.clone(),
                ai_score: result.ai_score as i32,
            })
            .await?;

        self.store
            .insert_ai_score(NewAiScore {
                user_id: ctx.user_id.clone(),
                file_name: result.file_name.clone(),
                post_applied_for: result.resume.post_applied_for.clone(),
                model_type: model_type.clone(),
                ai_score: result.ai_score as i32,
                position_match: result.position_match,
                match_reasons: result.match_reasons.clone(),
                mismatch_reasons: result.mismatch_reasons.clone(),
                job_description: ctx.job_description.clone(),
            })
            .await?;

        self.store
            .insert_audit(NewAuditLog {
                user_id: ctx.user_id.clone(),
                action: AuditAction::ResumeParsed,
                model_type,
                file_name: result.file_name.clone(),
                ip_address: ctx.ip.clone(),
            })
            .await?;

        Ok(())
    }
}

#[async_trait]
impl FilePipeline for ResumePipeline {
    type Output = ResumeResult;
    type Error = PipelineError;

    async fn process(&self, file: &UploadedFile) -> Result<ResumeResult, PipelineError> {
        let result = self.analyze(file).await?;
        self.persist(&result).await?;
        info!(
            "Parsed '{}' with {} (score {})",
            result.file_name, result.model_type, result.ai_score
        );
        Ok(result)
    }
}
