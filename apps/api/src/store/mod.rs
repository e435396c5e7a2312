//! Persistence for parse history, AI scores and the audit trail.
//!
//! Records are append-only. The three writes for one resume are independent: there is
//! no transaction across them.

mod postgres;

#[cfg(test)]
pub(crate) mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{
    AiScoreRow, AuditLogRow, NewAiScore, NewAuditLog, NewResumeHistory, ResumeHistoryRow,
};

pub use postgres::PgRecordStore;

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Aggregate counters for the admin dashboard.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub resumes_parsed: i64,
    pub ai_scores_generated: i64,
    /// AI scores whose resume named a post.
    pub jobs_matched: i64,
    /// Distinct users with at least one parsed resume.
    pub active_users: i64,
}

/// Audit log query. All filters are optional and combined with AND.
#[derive(Debug, Clone, Default)]
pub struct AuditLogFilter {
    pub user_id: Option<String>,
    pub model_type: Option<String>,
    pub action: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    /// 1-based
    pub page: u32,
    pub limit: u32,
}

impl AuditLogFilter {
    pub fn page(&self) -> u32 {
        self.page.max(1)
    }

    pub fn limit(&self) -> u32 {
        match self.limit {
            0 => DEFAULT_PAGE_SIZE,
            n => n.min(MAX_PAGE_SIZE),
        }
    }

    pub fn offset(&self) -> i64 {
        (self.page() as i64 - 1) * self.limit() as i64
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AuditLogPage {
    pub logs: Vec<AuditLogRow>,
    pub total: i64,
    pub page: u32,
    pub limit: u32,
}

#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn insert_history(&self, record: NewResumeHistory) -> Result<(), sqlx::Error>;

    async fn insert_ai_score(&self, record: NewAiScore) -> Result<(), sqlx::Error>;

    async fn insert_audit(&self, record: NewAuditLog) -> Result<(), sqlx::Error>;

    /// Newest first.
    async fn list_history(&self, user_id: &str) -> Result<Vec<ResumeHistoryRow>, sqlx::Error>;

    async fn count_history(&self, user_id: &str) -> Result<i64, sqlx::Error>;

    /// Newest first.
    async fn list_ai_scores(&self, user_id: &str) -> Result<Vec<AiScoreRow>, sqlx::Error>;

    async fn count_ai_scores(&self, user_id: &str) -> Result<i64, sqlx::Error>;

    async fn dashboard_stats(&self) -> Result<DashboardStats, sqlx::Error>;

    async fn query_audit_logs(&self, filter: &AuditLogFilter) -> Result<AuditLogPage, sqlx::Error>;
}
