use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ResumeHistoryRow {
    pub id: Uuid,
    pub user_id: String,
    pub file_name: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub post_applied_for: String,
    pub model_type: String,
    pub ai_score: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AiScoreRow {
    pub id: Uuid,
    pub user_id: String,
    pub file_name: String,
    pub post_applied_for: String,
    pub model_type: String,
    pub ai_score: i32,
    pub position_match: bool,
    pub match_reasons: Vec<String>,
    pub mismatch_reasons: Vec<String>,
    pub job_description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogRow {
    pub id: Uuid,
    pub user_id: String,
    pub action: String,
    pub model_type: String,
    pub file_name: String,
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Audit trail actions written by this service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    ResumeParsed,
    CoverLetterGenerated,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditAction::ResumeParsed => "resume_parsed",
            AuditAction::CoverLetterGenerated => "cover_letter_generated",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// Insert payloads. Ids and timestamps are assigned by the store.

#[derive(Debug, Clone)]
pub struct NewResumeHistory {
    pub user_id: String,
    pub file_name: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub post_applied_for: String,
    pub model_type: String,
    pub ai_score: i32,
}

#[derive(Debug, Clone)]
pub struct NewAiScore {
    pub user_id: String,
    pub file_name: String,
    pub post_applied_for: String,
    pub model_type: String,
    pub ai_score: i32,
    pub position_match: bool,
    pub match_reasons: Vec<String>,
    pub mismatch_reasons: Vec<String>,
    pub job_description: String,
}

#[derive(Debug, Clone)]
pub struct NewAuditLog {
    pub user_id: String,
    pub action: AuditAction,
    pub model_type: String,
    pub file_name: String,
    pub ip_address: Option<String>,
}
