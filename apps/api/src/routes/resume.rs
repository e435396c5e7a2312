use std::path::Path;

use axum::{
    extract::{Multipart, State},
    Json,
};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::auth::{ClientIp, CurrentUser};
use crate::batch::UploadedFile;
use crate::errors::AppError;
use crate::extraction::ExtractionError;
use crate::llm_client::{prompts, LlmError, ModelKind};
use crate::models::{AuditAction, NewAuditLog};
use crate::pipeline::{ResumePipeline, ResumeResult, UploadContext};
use crate::state::AppState;

const OVERLOADED_MESSAGE: &str = "Model is currently overloaded. Please try again later.";
const DEFAULT_TONE: &str = "formal";

/// Fields of a resume upload form. Files are already on disk.
#[derive(Debug, Default)]
struct UploadForm {
    files: Vec<UploadedFile>,
    model_type: Option<String>,
    job_description: String,
    tone: Option<String>,
}

impl UploadForm {
    fn release(self) {
        self.files.into_iter().for_each(UploadedFile::release);
    }
}

/// Drains the multipart body, storing every part named `file_field` as a temp artifact.
async fn read_upload_form(
    multipart: &mut Multipart,
    file_field: &str,
    upload_dir: &Path,
) -> Result<UploadForm, AppError> {
    let mut form = UploadForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        if name == file_field {
            let file_name = field
                .file_name()
                .filter(|n| !n.is_empty())
                .unwrap_or("upload")
                .to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("Failed to read '{file_name}': {e}")))?;
            let file = UploadedFile::persist(upload_dir, &file_name, &bytes)
                .map_err(|e| AppError::Internal(anyhow::Error::new(e).context("Failed to store upload")))?;
            form.files.push(file);
            continue;
        }

        let text = field
            .text()
            .await
            .map_err(|e| AppError::Validation(format!("Invalid form field '{name}': {e}")))?;
        match name.as_str() {
            "modelType" => form.model_type = Some(text),
            "jobDescription" => form.job_description = text.trim().to_string(),
            "tone" => form.tone = Some(text),
            _ => {}
        }
    }

    Ok(form)
}

async fn run_batch(
    state: &AppState,
    user: CurrentUser,
    ip: Option<String>,
    form: UploadForm,
) -> Result<Vec<ResumeResult>, AppError> {
    let model = ModelKind::from_selector(form.model_type.as_deref());
    info!(
        "User {} uploaded {} resume(s) for {model}",
        user.id,
        form.files.len()
    );

    let pipeline = ResumePipeline::new(
        state.extractor.clone(),
        state.parser.clone(),
        state.scorer.clone(),
        state.store.clone(),
        UploadContext {
            user_id: user.id,
            model,
            job_description: form.job_description,
            ip,
        },
    );

    state
        .scheduler
        .run(&pipeline, form.files)
        .await
        .into_result()
}

/// POST /api/resume/batch-upload
pub async fn batch_upload(
    State(state): State<AppState>,
    user: CurrentUser,
    ClientIp(ip): ClientIp,
    mut multipart: Multipart,
) -> Result<Json<Value>, AppError> {
    let form = read_upload_form(&mut multipart, "resumes", &state.config.upload_dir).await?;
    if form.files.is_empty() {
        return Err(AppError::NoFiles);
    }

    let results = run_batch(&state, user, ip, form).await?;
    Ok(Json(json!({ "results": results })))
}

/// POST /api/resume/ai-score
pub async fn ai_score(
    State(state): State<AppState>,
    user: CurrentUser,
    ClientIp(ip): ClientIp,
    mut multipart: Multipart,
) -> Result<Json<Vec<ResumeResult>>, AppError> {
    let form = read_upload_form(&mut multipart, "resumes", &state.config.upload_dir).await?;
    if form.files.is_empty() {
        return Err(AppError::NoFiles);
    }
    if form.job_description.is_empty() {
        form.release();
        return Err(AppError::Validation(
            "Job description is required for AI scoring".to_string(),
        ));
    }

    let results = run_batch(&state, user, ip, form).await?;
    Ok(Json(results))
}

fn cover_letter_error(e: LlmError) -> AppError {
    let lowered = e.to_string().to_lowercase();
    if e.is_overloaded() || lowered.contains("quota") || lowered.contains("overloaded") {
        AppError::ServiceUnavailable(OVERLOADED_MESSAGE.to_string())
    } else {
        AppError::Llm(format!("Failed to generate cover letter: {e}"))
    }
}

fn extraction_error(e: ExtractionError) -> AppError {
    match e {
        ExtractionError::UnsupportedFormat(_) => AppError::Validation(e.to_string()),
        other => AppError::Internal(anyhow::Error::new(other)),
    }
}

/// POST /api/resume/generate-cover-letter
pub async fn generate_cover_letter(
    State(state): State<AppState>,
    user: CurrentUser,
    ClientIp(ip): ClientIp,
    mut multipart: Multipart,
) -> Result<Json<Value>, AppError> {
    let mut form = read_upload_form(&mut multipart, "file", &state.config.upload_dir).await?;
    if form.files.is_empty() || form.job_description.is_empty() {
        form.release();
        return Err(AppError::Validation(
            "Resume file and job description are required".to_string(),
        ));
    }

    // Only the first file is used; any extras are discarded.
    let file = form.files.remove(0);
    let tone = form
        .tone
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or(DEFAULT_TONE)
        .to_string();
    let job_description = std::mem::take(&mut form.job_description);
    form.release();

    let extracted = state.extractor.extract_text(file.path()).await;
    let file_name = file.file_name().to_string();
    file.release();
    let resume_text = extracted.map_err(extraction_error)?;

    let prompt = prompts::cover_letter_prompt(&resume_text, &job_description, &tone);
    let letter = state
        .providers
        .cover_letter
        .complete(&prompt)
        .await
        .map_err(|e| {
            warn!("Cover letter generation failed for '{file_name}': {e}");
            cover_letter_error(e)
        })?;

    state
        .store
        .insert_audit(NewAuditLog {
            user_id: user.id,
            action: AuditAction::CoverLetterGenerated,
            model_type: ModelKind::Gemini.as_str().to_string(),
            file_name,
            ip_address: ip,
        })
        .await?;

    Ok(Json(json!({ "coverLetter": letter.trim() })))
}
